//! Building local, unbuilt projects into archives via the external build tool.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};

use tracing::info;

use crate::error::EngineError;
use crate::memo::Memo;

const WRAPPER: &str = "gradlew";
const WRAPPER_BAT: &str = "gradlew.bat";
const ARCHIVE_GOAL: &str = "jar";
const OUTPUT_GLOB: &str = "build/libs/*.jar";

/// Invokes a project's external build command to produce exactly one archive,
/// memoized per project root: the build runs at most once per process per
/// root, even under concurrent callers.
#[derive(Debug, Default)]
pub struct ProjectBuilder {
    built: Memo<PathBuf, PathBuf>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self { built: Memo::new() }
    }

    /// Build the project rooted at `project_root` and return the produced archive.
    ///
    /// The build tool wrapper is located by walking upward from the project
    /// root; the build runs with the project root as working directory and
    /// stdio inherited, blocking until it exits. The conventional output
    /// directory is then scanned for archives at least as new as the build
    /// invocation time, and exactly one must be found.
    ///
    /// # Errors
    /// [`EngineError::BuildToolNotFound`] if no wrapper exists above the root;
    /// [`EngineError::BuildFailed`] on a non-zero exit; then
    /// [`EngineError::BuildProducedNoArtifact`] or
    /// [`EngineError::AmbiguousBuildOutput`] depending on how many fresh
    /// archives the output directory holds.
    pub fn build_artifact(&self, project_root: &Path) -> Result<PathBuf, EngineError> {
        self.built
            .get_or_try_init(&project_root.to_path_buf(), || self.run_build(project_root))
    }

    fn run_build(&self, project_root: &Path) -> Result<PathBuf, EngineError> {
        let wrapper_name = if cfg!(windows) { WRAPPER_BAT } else { WRAPPER };
        let wrapper = find_wrapper_dir(project_root)?.join(wrapper_name);

        info!(project = %project_root.display(), "generating plugin archive from local project");
        let cutoff = freshness_cutoff(SystemTime::now());
        let exit_code = plugforge_util::process::run_inherited(
            Command::new(&wrapper)
                .arg(ARCHIVE_GOAL)
                .current_dir(project_root),
        )?;
        if exit_code != Some(0) {
            return Err(EngineError::BuildFailed {
                project_root: project_root.display().to_string(),
                exit_code,
            });
        }

        let output_dir = project_root.join("build").join("libs");
        let mut fresh = Vec::new();
        for candidate in plugforge_util::fs::collect_matching(project_root, OUTPUT_GLOB)? {
            let modified = std::fs::metadata(&candidate)
                .and_then(|meta| meta.modified())
                .map_err(|source| EngineError::io(&candidate, source))?;
            if modified >= cutoff {
                fresh.push(candidate);
            }
        }

        match fresh.as_slice() {
            [] => Err(EngineError::BuildProducedNoArtifact {
                dir: output_dir.display().to_string(),
            }),
            [single] => Ok(single.clone()),
            many => Err(EngineError::AmbiguousBuildOutput {
                dir: output_dir.display().to_string(),
                candidates: many.iter().map(|p| p.display().to_string()).collect(),
            }),
        }
    }
}

/// The oldest mtime still counted as produced by a build invoked at `invoked_at`.
///
/// File mtimes come from the kernel's coarse clock and archive tools stamp
/// them at up to two-second resolution, so a fast build can mark its output
/// a moment before the recorded invocation time. The cutoff is the
/// invocation time floored to the whole second, with one more second of slack.
fn freshness_cutoff(invoked_at: SystemTime) -> SystemTime {
    let floored = invoked_at
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| SystemTime::UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()))
        .unwrap_or(invoked_at);
    floored
        .checked_sub(Duration::from_secs(1))
        .unwrap_or(floored)
}

/// Walk upward from `path` to the nearest directory holding both wrapper scripts.
fn find_wrapper_dir(path: &Path) -> Result<PathBuf, EngineError> {
    let mut current = Some(path);
    while let Some(dir) = current {
        if dir.join(WRAPPER).is_file() && dir.join(WRAPPER_BAT).is_file() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(EngineError::BuildToolNotFound {
        path: path.display().to_string(),
    })
}
