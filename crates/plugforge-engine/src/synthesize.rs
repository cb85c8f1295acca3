//! Deterministic archive assembly from scanned classpath resources.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use plugforge_config::descriptor::ClassRef;
use tracing::debug;

use crate::classpath::Classpath;
use crate::error::EngineError;
use crate::manifest::{ManifestAttributes, MANIFEST_PATH};

/// Assembles fresh archives from declared packages and classes.
#[derive(Debug)]
pub struct ArchiveSynthesizer {
    classpath: Classpath,
}

impl ArchiveSynthesizer {
    pub fn new(classpath: Classpath) -> Self {
        Self { classpath }
    }

    /// Scan the classpath for everything under `packages` plus the named
    /// `classes`, and write a new archive to `out`.
    ///
    /// The manifest is always the first entry. Duplicate resource paths
    /// (visible from several classpath roots, e.g. a source tree and its
    /// packaged output) resolve to the first match in classpath order. Entry
    /// timestamps are pinned to the container epoch so byte-identical inputs
    /// produce byte-identical archives.
    ///
    /// # Errors
    /// Returns [`EngineError::EmptyDeclaration`] (without creating a file) if
    /// both sets are empty, or an I/O/archive error if scanning or writing
    /// fails.
    pub fn synthesize(
        &self,
        packages: &BTreeSet<String>,
        classes: &BTreeSet<ClassRef>,
        attrs: &ManifestAttributes,
        out: &Path,
    ) -> Result<(), EngineError> {
        if packages.is_empty() && classes.is_empty() {
            return Err(EngineError::EmptyDeclaration);
        }

        let resolved = self.resolve_entries(packages, classes)?;

        let file = std::fs::File::create(out).map_err(|source| EngineError::io(out, source))?;
        let mut writer = zip::ZipWriter::new(file);
        // Pinned timestamp: the container's minimum representable time.
        let options = zip::write::SimpleFileOptions::default()
            .last_modified_time(zip::DateTime::default());

        writer
            .start_file(MANIFEST_PATH, options)
            .map_err(|e| EngineError::archive(out, e))?;
        writer
            .write_all(&attrs.render())
            .map_err(|source| EngineError::io(out, source))?;

        for (entry, root) in &resolved {
            let bytes = Classpath::read_resource(root, entry)?;
            writer
                .start_file(entry.as_str(), options)
                .map_err(|e| EngineError::archive(out, e))?;
            writer
                .write_all(&bytes)
                .map_err(|source| EngineError::io(out, source))?;
        }

        writer.finish().map_err(|e| EngineError::archive(out, e))?;
        debug!(archive = %out.display(), entries = resolved.len(), "synthesized archive");
        Ok(())
    }

    /// Map each resolved entry path to the root it will be read from.
    ///
    /// Scan order is stable: declared packages in sorted order, roots in
    /// classpath order, entries sorted within a root; the first root to
    /// provide an entry wins.
    fn resolve_entries(
        &self,
        packages: &BTreeSet<String>,
        classes: &BTreeSet<ClassRef>,
    ) -> Result<BTreeMap<String, std::path::PathBuf>, EngineError> {
        let mut resolved = BTreeMap::new();

        for package in packages {
            for root in self.classpath.roots() {
                for entry in Classpath::list_resources(root, package)? {
                    resolved.entry(entry).or_insert_with(|| root.clone());
                }
            }
        }

        for class in classes {
            let entry = class.entry_path();
            if resolved.contains_key(&entry) {
                continue;
            }
            match self.classpath.find_root_for(&entry) {
                Some(root) => {
                    resolved.insert(entry, root.to_path_buf());
                }
                // Matches the scanner contract: unknown names contribute nothing.
                None => debug!(class = %class, "declared class not found on classpath"),
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn attrs() -> ManifestAttributes {
        ManifestAttributes {
            name: "X".to_owned(),
            version_id: 7,
            target_platform_version: 42,
        }
    }

    fn class_dir(tmp: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let root = tmp.join(name);
        for (file, bytes) in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, bytes).unwrap();
        }
        root
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let file = fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_owned())
            .collect()
    }

    fn entry_bytes(path: &Path, entry: &str) -> Vec<u8> {
        let file = fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut zipped = archive.by_name(entry).unwrap();
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut zipped, &mut bytes).unwrap();
        bytes
    }

    fn packages(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn manifest_is_first_entry_with_attributes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = class_dir(tmp.path(), "classes", &[("com/foo/A.class", b"a")]);
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![root]));

        let out = tmp.path().join("out.jar");
        synthesizer
            .synthesize(&packages(&["com.foo"]), &BTreeSet::new(), &attrs(), &out)
            .unwrap();

        let names = entry_names(&out);
        assert_eq!(names.first().map(String::as_str), Some(MANIFEST_PATH));

        let pairs = ManifestAttributes::parse_attributes(&entry_bytes(&out, MANIFEST_PATH));
        assert!(pairs.contains(&("Cordapp-Contract-Name".to_owned(), "X".to_owned())));
        assert!(pairs.contains(&("Cordapp-Contract-Version".to_owned(), "7".to_owned())));
        assert!(pairs.contains(&("Cordapp-Workflow-Name".to_owned(), "X".to_owned())));
        assert!(pairs.contains(&("Cordapp-Workflow-Version".to_owned(), "7".to_owned())));
        assert!(pairs.contains(&("Target-Platform-Version".to_owned(), "42".to_owned())));
    }

    #[test]
    fn includes_sub_packages_and_resources() {
        let tmp = tempfile::tempdir().unwrap();
        let root = class_dir(
            tmp.path(),
            "classes",
            &[
                ("com/foo/A.class", b"a"),
                ("com/foo/sub/B.class", b"b"),
                ("com/foo/resource.txt", b"r"),
                ("com/other/C.class", b"c"),
            ],
        );
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![root]));

        let out = tmp.path().join("out.jar");
        synthesizer
            .synthesize(&packages(&["com.foo"]), &BTreeSet::new(), &attrs(), &out)
            .unwrap();

        let names = entry_names(&out);
        assert!(names.contains(&"com/foo/A.class".to_owned()));
        assert!(names.contains(&"com/foo/sub/B.class".to_owned()));
        assert!(names.contains(&"com/foo/resource.txt".to_owned()));
        assert!(!names.contains(&"com/other/C.class".to_owned()));
    }

    #[test]
    fn single_class_leaks_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = class_dir(
            tmp.path(),
            "classes",
            &[("com/foo/A.class", b"a"), ("com/foo/B.class", b"b")],
        );
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![root]));

        let out = tmp.path().join("out.jar");
        let classes = BTreeSet::from([ClassRef::new("com.foo.A")]);
        synthesizer
            .synthesize(&BTreeSet::new(), &classes, &attrs(), &out)
            .unwrap();

        assert_eq!(
            entry_names(&out),
            vec![MANIFEST_PATH.to_owned(), "com/foo/A.class".to_owned()]
        );
    }

    #[test]
    fn empty_declaration_creates_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![]));

        let out = tmp.path().join("out.jar");
        let result = synthesizer.synthesize(&BTreeSet::new(), &BTreeSet::new(), &attrs(), &out);
        assert!(matches!(result, Err(EngineError::EmptyDeclaration)));
        assert!(!out.exists());
    }

    #[test]
    fn duplicate_resource_takes_first_classpath_match() {
        let tmp = tempfile::tempdir().unwrap();
        let first = class_dir(tmp.path(), "first", &[("com/foo/A.class", b"from first")]);
        let second = class_dir(tmp.path(), "second", &[("com/foo/A.class", b"from second")]);
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![first, second]));

        let out = tmp.path().join("out.jar");
        synthesizer
            .synthesize(&packages(&["com.foo"]), &BTreeSet::new(), &attrs(), &out)
            .unwrap();

        assert_eq!(entry_bytes(&out, "com/foo/A.class"), b"from first");
    }

    #[test]
    fn synthesis_is_byte_identical_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = class_dir(
            tmp.path(),
            "classes",
            &[("com/foo/A.class", b"a"), ("com/foo/resource.txt", b"r")],
        );
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![root]));

        let first = tmp.path().join("first.jar");
        let second = tmp.path().join("second.jar");
        synthesizer
            .synthesize(&packages(&["com.foo"]), &BTreeSet::new(), &attrs(), &first)
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(30));
        synthesizer
            .synthesize(&packages(&["com.foo"]), &BTreeSet::new(), &attrs(), &second)
            .unwrap();

        assert_eq!(
            plugforge_util::hash::sha256_file(&first).unwrap(),
            plugforge_util::hash::sha256_file(&second).unwrap()
        );
    }

    #[test]
    fn missing_declared_class_is_omitted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = class_dir(tmp.path(), "classes", &[("com/foo/A.class", b"a")]);
        let synthesizer = ArchiveSynthesizer::new(Classpath::new(vec![root]));

        let out = tmp.path().join("out.jar");
        let classes = BTreeSet::from([
            ClassRef::new("com.foo.A"),
            ClassRef::new("com.foo.DoesNotExist"),
        ]);
        synthesizer
            .synthesize(&BTreeSet::new(), &classes, &attrs(), &out)
            .unwrap();

        assert_eq!(
            entry_names(&out),
            vec![MANIFEST_PATH.to_owned(), "com/foo/A.class".to_owned()]
        );
    }
}
