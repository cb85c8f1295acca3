//! Error types for plugforge-engine.
//!
//! Every variant is terminal for the calling request: nothing is retried
//! automatically and failed resolutions are never cached, so an identical
//! later request starts from scratch.

/// Errors produced by the artifact pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] plugforge_util::error::UtilError),

    /// A zip container could not be read or written.
    #[error("cannot process archive {path}: {message}")]
    Archive { path: String, message: String },

    /// No classpath root contains the requested package.
    #[error("package {package} does not exist on the classpath")]
    PackageNotFound { package: String },

    /// A single-package lookup expecting one root matched several.
    #[error("more than one classpath root found containing package {package}: {roots:?}")]
    AmbiguousClasspathRoot { package: String, roots: Vec<String> },

    /// A package scan that required building resolved to several project roots.
    #[error("package {package} resolves to multiple project roots: {roots:?}")]
    MultipleRootsForPackage { package: String, roots: Vec<String> },

    /// No directory above the given path carries the project build marker.
    #[error("no build.gradle found at or above {path}")]
    ProjectRootNotFound { path: String },

    /// No directory above the project root holds the build tool wrapper.
    #[error("no gradlew found at or above {path}")]
    BuildToolNotFound { path: String },

    /// The external build command exited with a non-zero status.
    #[error("unable to build artifact from local project in {project_root} (exit code {exit_code:?})")]
    BuildFailed {
        project_root: String,
        exit_code: Option<i32>,
    },

    /// The build succeeded but its output directory holds no fresh archive.
    #[error("build produced no fresh archive in {dir}")]
    BuildProducedNoArtifact { dir: String },

    /// The build produced more than one equally fresh archive.
    #[error("more than one fresh archive found in {dir}: {candidates:?}")]
    AmbiguousBuildOutput {
        dir: String,
        candidates: Vec<String>,
    },

    /// Synthesis was requested with no packages and no classes.
    #[error("at least one package or class must be specified")]
    EmptyDeclaration,

    /// The external signing step failed.
    #[error("cannot sign {path}: {message}")]
    SigningFailed { path: String, message: String },
}

impl EngineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn archive(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::Archive {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}
