//! The artifact cache and resolution pipeline.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use plugforge_config::descriptor::{simplify_packages, ArtifactSource, Descriptor};

use crate::build::ProjectBuilder;
use crate::classpath::{Classpath, ClasspathRoot, PackageLocator};
use crate::error::EngineError;
use crate::manifest::ManifestAttributes;
use crate::memo::Memo;
use crate::sign::Signer;
use crate::synthesize::ArchiveSynthesizer;

/// The content-relevant subset of a descriptor, as a composite SHA-256 key.
///
/// `config`, `sign`, and `key_store_path` affect post-processing or runtime
/// behavior, never archive content, so they are deliberately excluded:
/// structurally identical declarations must never rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the cache key for a descriptor.
    pub fn compute(descriptor: &Descriptor) -> Self {
        // Scans resolve to existing archives while the other variants
        // assemble fresh ones; the tag keeps those result spaces apart.
        let tag = match &descriptor.source {
            ArtifactSource::ScanPackage { .. } => "scan",
            ArtifactSource::Packages { .. } | ArtifactSource::Custom { .. } => "synth",
        };

        // Simplify before keying: a nested-equivalent declaration must land
        // on the same cache entry as its flattened form.
        let packages = simplify_packages(descriptor.source.packages());
        let classes = descriptor.source.classes();

        let mut parts: Vec<String> = vec![
            tag.to_owned(),
            descriptor.name.clone(),
            descriptor.version_id.to_string(),
            descriptor.target_platform_version.to_string(),
            packages.len().to_string(),
        ];
        parts.extend(packages);
        parts.push(classes.len().to_string());
        parts.extend(classes.iter().map(|class| class.name().to_owned()));

        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        Self(plugforge_util::hash::sha256_multi(&refs))
    }

    /// The hex string representation of this cache key.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves descriptors to artifact paths, memoizing every expensive step.
///
/// All caches are owned here and scoped to the pipeline (in practice, to the
/// process): repeated identical declarations are free, and concurrent
/// requests for the same key block behind the first. The output directory is
/// append-only; nothing resolved is ever rewritten or deleted.
#[derive(Debug)]
pub struct ArtifactPipeline {
    locator: PackageLocator,
    builder: ProjectBuilder,
    synthesizer: ArchiveSynthesizer,
    signer: Signer,
    output_dir: PathBuf,
    artifacts: Memo<CacheKey, PathBuf>,
}

impl ArtifactPipeline {
    /// Create a pipeline writing artifacts under `output_dir`.
    ///
    /// # Errors
    /// Returns an error if the output directory cannot be created.
    pub fn new(classpath: Classpath, output_dir: PathBuf) -> Result<Self, EngineError> {
        plugforge_util::fs::ensure_dir(&output_dir)?;
        Ok(Self {
            locator: PackageLocator::new(classpath.clone()),
            builder: ProjectBuilder::new(),
            synthesizer: ArchiveSynthesizer::new(classpath),
            signer: Signer::new(output_dir.clone()),
            output_dir,
            artifacts: Memo::new(),
        })
    }

    /// Override the external signing tool executables.
    pub fn with_sign_tools(mut self, keytool: PathBuf, jarsigner: PathBuf) -> Self {
        self.signer = Signer::new(self.output_dir.clone()).with_tools(keytool, jarsigner);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Resolve a descriptor to an artifact path.
    ///
    /// A cache hit returns the previously produced path without touching disk
    /// or subprocesses. On a miss the artifact is discovered, built, or
    /// synthesized, then recorded; if signing was requested the resolved
    /// archive is signed in place afterwards. A failed resolution is not
    /// cached, so an identical later request retries from scratch.
    ///
    /// # Errors
    /// Propagates any pipeline error; see [`EngineError`].
    pub fn resolve(&self, descriptor: &Descriptor) -> Result<PathBuf, EngineError> {
        let key = CacheKey::compute(descriptor);
        let path = self
            .artifacts
            .get_or_try_init(&key, || self.produce(descriptor))?;
        if descriptor.sign {
            self.signer
                .sign(&path, descriptor.key_store_path.as_deref())?;
        }
        Ok(path)
    }

    fn produce(&self, descriptor: &Descriptor) -> Result<PathBuf, EngineError> {
        match &descriptor.source {
            ArtifactSource::ScanPackage { package } => self.resolve_scan(package),
            ArtifactSource::Packages { packages } => {
                self.synthesize(descriptor, &simplify_packages(packages.clone()), &BTreeSet::new())
            }
            ArtifactSource::Custom { packages, classes } => {
                self.synthesize(descriptor, &simplify_packages(packages.clone()), classes)
            }
        }
    }

    /// Resolve "the one archive containing this package".
    fn resolve_scan(&self, package: &str) -> Result<PathBuf, EngineError> {
        let roots = self.locator.locate_roots(package)?;
        let (archives, projects): (Vec<_>, Vec<_>) = roots
            .iter()
            .partition(|root| matches!(root, ClasspathRoot::Archive(_)));

        let display = |roots: &[&ClasspathRoot]| -> Vec<String> {
            roots
                .iter()
                .map(|root| root.path().display().to_string())
                .collect()
        };

        match (archives.as_slice(), projects.as_slice()) {
            ([archive], []) => Ok(archive.path().to_path_buf()),
            ([], [project]) => self.builder.build_artifact(project.path()),
            ([], many) => {
                // Build each root anyway (memoized, so nothing is wasted if
                // the caller narrows the declaration and retries), then
                // report the ambiguity.
                for project in many {
                    self.builder.build_artifact(project.path())?;
                }
                Err(EngineError::MultipleRootsForPackage {
                    package: package.to_owned(),
                    roots: display(many),
                })
            }
            // Several pre-built archives, or a pre-built archive alongside an
            // unbuilt project: a scan expects exactly one root.
            (archive_roots, project_roots) => {
                let mut all = display(archive_roots);
                all.extend(display(project_roots));
                Err(EngineError::AmbiguousClasspathRoot {
                    package: package.to_owned(),
                    roots: all,
                })
            }
        }
    }

    fn synthesize(
        &self,
        descriptor: &Descriptor,
        packages: &BTreeSet<String>,
        classes: &BTreeSet<plugforge_config::descriptor::ClassRef>,
    ) -> Result<PathBuf, EngineError> {
        let attrs = ManifestAttributes {
            name: descriptor.name.clone(),
            version_id: descriptor.version_id,
            target_platform_version: descriptor.target_platform_version,
        };
        let out = self.output_dir.join(output_file_name(descriptor));
        self.synthesizer.synthesize(packages, classes, &attrs, &out)?;
        debug!(name = %descriptor.name, archive = %out.display(), "packaged descriptor");
        Ok(out)
    }
}

/// Unique output file name: sanitized name, version, platform version, and a
/// random disambiguator so separate processes sharing the output directory
/// never collide.
fn output_file_name(descriptor: &Descriptor) -> String {
    let sanitized: String = descriptor
        .name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    format!(
        "{sanitized}_{}_{}_{}.jar",
        descriptor.version_id,
        descriptor.target_platform_version,
        uuid::Uuid::new_v4()
    )
}
