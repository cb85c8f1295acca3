//! Classpath scanning: which roots contain a given package, and what
//! resources live under it.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::memo::Memo;

/// Marker file identifying the root of a local, unbuilt project.
pub const BUILD_MARKER: &str = "build.gradle";

/// A location contributing classes/resources to a package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClasspathRoot {
    /// An already-built archive file.
    Archive(PathBuf),
    /// The root directory of a local project whose classes are not yet packaged.
    Project(PathBuf),
}

impl ClasspathRoot {
    pub fn path(&self) -> &Path {
        match self {
            Self::Archive(path) | Self::Project(path) => path,
        }
    }
}

/// The runtime search path: an ordered list of archive files and class
/// directories. Order matters — duplicate resources are resolved by first
/// match.
#[derive(Debug, Clone)]
pub struct Classpath {
    roots: Vec<PathBuf>,
}

impl Classpath {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Build a classpath from the `CLASSPATH` environment variable.
    ///
    /// Empty segments are skipped; an unset variable yields an empty classpath.
    pub fn from_env() -> Self {
        let raw = std::env::var("CLASSPATH").unwrap_or_default();
        Self::parse(&raw)
    }

    /// Parse a platform path-list string (`:` on Unix, `;` on Windows).
    pub fn parse(raw: &str) -> Self {
        let separator = if cfg!(windows) { ';' } else { ':' };
        let roots = raw
            .split(separator)
            .filter(|segment| !segment.is_empty())
            .map(PathBuf::from)
            .collect();
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether a search root is a packaged archive rather than a directory.
    pub fn is_archive(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
    }

    /// List the entry paths under `package` within a single search root,
    /// sorted for stable first-match semantics.
    ///
    /// The package prefix matches on a path-segment boundary: `com.foo` never
    /// matches entries under `com/foobar/`.
    ///
    /// # Errors
    /// Returns an error if the root cannot be read.
    pub fn list_resources(root: &Path, package: &str) -> Result<Vec<String>, EngineError> {
        let prefix = format!("{}/", package.replace('.', "/"));
        if Self::is_archive(root) {
            let mut entries: Vec<String> = archive_entries(root)?
                .into_iter()
                .filter(|name| name.starts_with(&prefix))
                .collect();
            entries.sort();
            Ok(entries)
        } else {
            let package_dir = root.join(package.replace('.', "/"));
            let files = plugforge_util::fs::relative_files(&package_dir)?;
            Ok(files
                .into_iter()
                .map(|relative| format!("{prefix}{relative}"))
                .collect())
        }
    }

    /// Read the bytes of `entry` from a single search root.
    ///
    /// # Errors
    /// Returns an error if the entry is absent or cannot be read.
    pub fn read_resource(root: &Path, entry: &str) -> Result<Vec<u8>, EngineError> {
        if Self::is_archive(root) {
            let file =
                std::fs::File::open(root).map_err(|source| EngineError::io(root, source))?;
            let mut archive = zip::ZipArchive::new(std::io::BufReader::new(file))
                .map_err(|e| EngineError::archive(root, e))?;
            let mut zipped = archive
                .by_name(entry)
                .map_err(|e| EngineError::archive(root, e))?;
            let mut bytes = Vec::new();
            zipped
                .read_to_end(&mut bytes)
                .map_err(|source| EngineError::io(root, source))?;
            Ok(bytes)
        } else {
            let path = root.join(entry);
            std::fs::read(&path).map_err(|source| EngineError::io(&path, source))
        }
    }

    /// Find the first search root (in classpath order) containing `entry`.
    pub fn find_root_for(&self, entry: &str) -> Option<&Path> {
        self.roots
            .iter()
            .find(|root| {
                if Self::is_archive(root) {
                    archive_entries(root)
                        .map(|names| names.iter().any(|name| name == entry))
                        .unwrap_or(false)
                } else {
                    root.join(entry).is_file()
                }
            })
            .map(PathBuf::as_path)
    }
}

fn archive_entries(path: &Path) -> Result<Vec<String>, EngineError> {
    let file = std::fs::File::open(path).map_err(|source| EngineError::io(path, source))?;
    let archive = zip::ZipArchive::new(std::io::BufReader::new(file))
        .map_err(|e| EngineError::archive(path, e))?;
    Ok(archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(ToOwned::to_owned)
        .collect())
}

/// Walk upward from `path` to the nearest directory carrying the build marker.
pub fn find_project_root(path: &Path) -> Result<PathBuf, EngineError> {
    let mut current = Some(path);
    while let Some(dir) = current {
        if dir.join(BUILD_MARKER).is_file() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(EngineError::ProjectRootNotFound {
        path: path.display().to_string(),
    })
}

/// Finds the classpath roots containing a package, memoized per package name:
/// the same package never triggers a rescan within a process.
#[derive(Debug)]
pub struct PackageLocator {
    classpath: Classpath,
    roots_by_package: Memo<String, BTreeSet<ClasspathRoot>>,
}

impl PackageLocator {
    pub fn new(classpath: Classpath) -> Self {
        Self {
            classpath,
            roots_by_package: Memo::new(),
        }
    }

    /// The set of classpath roots containing resources under `package`.
    ///
    /// A hit inside a directory root is attributed to the nearest ancestor
    /// directory carrying [`BUILD_MARKER`]. Nested declared packages are the
    /// caller's concern (`simplify_packages`); no simplification happens here.
    ///
    /// # Errors
    /// Returns [`EngineError::PackageNotFound`] if no root contains the
    /// package, or an I/O error if a root cannot be scanned.
    pub fn locate_roots(&self, package: &str) -> Result<BTreeSet<ClasspathRoot>, EngineError> {
        self.roots_by_package
            .get_or_try_init(&package.to_owned(), || self.scan(package))
    }

    fn scan(&self, package: &str) -> Result<BTreeSet<ClasspathRoot>, EngineError> {
        let mut roots = BTreeSet::new();
        for root in self.classpath.roots() {
            if Classpath::list_resources(root, package)?.is_empty() {
                continue;
            }
            if Classpath::is_archive(root) {
                roots.insert(ClasspathRoot::Archive(root.clone()));
            } else {
                roots.insert(ClasspathRoot::Project(find_project_root(root)?));
            }
        }
        if roots.is_empty() {
            return Err(EngineError::PackageNotFound {
                package: package.to_owned(),
            });
        }
        Ok(roots)
    }
}
