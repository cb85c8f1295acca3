//! The artifact descriptor: an immutable declaration of a desired test
//! plugin's identity and content sources.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Platform version stamped into artifacts when the caller does not override it.
pub const PLATFORM_VERSION: u32 = 4;

const DEFAULT_NAME: &str = "custom-artifact";

/// A fully qualified, dot-separated class name (e.g. `com.example.Foo`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassRef(String);

impl ClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The dot-separated class name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The package this class belongs to (empty for the default package).
    pub fn package(&self) -> &str {
        self.0.rsplit_once('.').map_or("", |(pkg, _)| pkg)
    }

    /// The archive entry path for this class (`com/example/Foo.class`).
    pub fn entry_path(&self) -> String {
        format!("{}.class", self.0.replace('.', "/"))
    }
}

impl std::fmt::Display for ClassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an artifact's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactSource {
    /// Assemble a fresh archive from everything under the declared packages.
    Packages { packages: BTreeSet<String> },
    /// Find the single classpath root (pre-built archive or local project)
    /// containing this package; nothing is assembled.
    ScanPackage { package: String },
    /// Ad-hoc assembly from packages plus explicitly named classes.
    Custom {
        packages: BTreeSet<String>,
        classes: BTreeSet<ClassRef>,
    },
}

impl ArtifactSource {
    /// The declared packages, if any.
    pub fn packages(&self) -> BTreeSet<String> {
        match self {
            Self::Packages { packages } | Self::Custom { packages, .. } => packages.clone(),
            Self::ScanPackage { package } => BTreeSet::from([package.clone()]),
        }
    }

    /// The explicitly declared classes, if any.
    pub fn classes(&self) -> BTreeSet<ClassRef> {
        match self {
            Self::Custom { classes, .. } => classes.clone(),
            Self::Packages { .. } | Self::ScanPackage { .. } => BTreeSet::new(),
        }
    }
}

/// Immutable declaration of a desired test artifact.
///
/// Created fresh per test call and never mutated; the `with_*` methods return
/// modified copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub name: String,
    pub version_id: u32,
    pub target_platform_version: u32,
    /// Free-form configuration consumed by the host at runtime. Never part of
    /// the artifact's content identity.
    pub config: BTreeMap<String, serde_json::Value>,
    pub source: ArtifactSource,
    pub sign: bool,
    /// Directory holding the key store to sign with; `None` means a shared
    /// store is generated on demand.
    pub key_store_path: Option<PathBuf>,
}

impl Descriptor {
    fn with_source(source: ArtifactSource) -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            version_id: 1,
            target_platform_version: PLATFORM_VERSION,
            config: BTreeMap::new(),
            source,
            sign: false,
            key_store_path: None,
        }
    }

    /// Declare an artifact assembled from everything under the given packages.
    pub fn from_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_source(ArtifactSource::Packages {
            packages: packages.into_iter().map(Into::into).collect(),
        })
    }

    /// Declare "the one archive on the classpath containing this package".
    pub fn from_scan_package(package: impl Into<String>) -> Self {
        Self::with_source(ArtifactSource::ScanPackage {
            package: package.into(),
        })
    }

    /// Declare an artifact assembled from explicitly named classes.
    pub fn from_classes<I>(classes: I) -> Self
    where
        I: IntoIterator<Item = ClassRef>,
    {
        Self::with_source(ArtifactSource::Custom {
            packages: BTreeSet::new(),
            classes: classes.into_iter().collect(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version_id(mut self, version_id: u32) -> Self {
        self.version_id = version_id;
        self
    }

    pub fn with_target_platform_version(mut self, version: u32) -> Self {
        self.target_platform_version = version;
        self
    }

    pub fn with_config(mut self, config: BTreeMap<String, serde_json::Value>) -> Self {
        self.config = config;
        self
    }

    /// Add explicitly named classes, dropping any already covered by a
    /// declared package.
    pub fn with_classes<I>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = ClassRef>,
    {
        let packages = self.source.packages();
        let mut merged = self.source.classes();
        merged.extend(classes.into_iter().filter(|class| {
            !packages
                .iter()
                .any(|pkg| class.name().starts_with(&format!("{pkg}.")))
        }));
        let kept_packages = match self.source {
            ArtifactSource::Packages { packages: p }
            | ArtifactSource::Custom { packages: p, .. } => p,
            ArtifactSource::ScanPackage { package } => BTreeSet::from([package]),
        };
        self.source = ArtifactSource::Custom {
            packages: kept_packages,
            classes: merged,
        };
        self
    }

    /// Request signing, optionally with an explicit key store directory.
    pub fn signed(mut self, key_store_path: Option<PathBuf>) -> Self {
        self.sign = true;
        self.key_store_path = key_store_path;
        self
    }
}

/// Squash child packages when a parent is present.
///
/// `["com.foo", "com.foo.bar"]` becomes `["com.foo"]`: scanning the parent
/// already covers the child. Prefix matches only count on a dot boundary, so
/// `com.foobar` is not a descendant of `com.foo`.
pub fn simplify_packages<I, S>(packages: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sorted: Vec<String> = packages.into_iter().map(Into::into).collect();
    sorted.sort();
    sorted.dedup();

    let mut kept: Vec<String> = Vec::new();
    for package in sorted {
        let descendant = kept
            .last()
            .is_some_and(|last| package.starts_with(&format!("{last}.")));
        if !descendant {
            kept.push(package);
        }
    }
    kept.into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn simplify_empty() {
        assert!(simplify_packages(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn simplify_single() {
        assert_eq!(simplify_packages(["com.foo.bar"]), set(&["com.foo.bar"]));
    }

    #[test]
    fn simplify_duplicates() {
        assert_eq!(simplify_packages(["com.foo", "com.foo"]), set(&["com.foo"]));
    }

    #[test]
    fn simplify_unrelated() {
        assert_eq!(
            simplify_packages(["com.foo", "com.bar"]),
            set(&["com.bar", "com.foo"])
        );
    }

    #[test]
    fn simplify_drops_child() {
        assert_eq!(
            simplify_packages(["com.foo", "com.foo.bar"]),
            set(&["com.foo"])
        );
        assert_eq!(
            simplify_packages(["com.foo.bar", "com.foo"]),
            set(&["com.foo"])
        );
    }

    #[test]
    fn simplify_keeps_non_dot_boundary_prefix() {
        assert_eq!(
            simplify_packages(["com.foobar", "com.foo.bar"]),
            set(&["com.foo.bar", "com.foobar"])
        );
        assert_eq!(
            simplify_packages(["com.foobar", "com.foo"]),
            set(&["com.foo", "com.foobar"])
        );
    }

    #[test]
    fn class_ref_entry_path() {
        let class = ClassRef::new("com.example.Foo");
        assert_eq!(class.entry_path(), "com/example/Foo.class");
        assert_eq!(class.package(), "com.example");
    }

    #[test]
    fn class_ref_default_package() {
        let class = ClassRef::new("TopLevel");
        assert_eq!(class.package(), "");
        assert_eq!(class.entry_path(), "TopLevel.class");
    }

    #[test]
    fn descriptor_defaults() {
        let descriptor = Descriptor::from_packages(["com.foo"]);
        assert_eq!(descriptor.name, "custom-artifact");
        assert_eq!(descriptor.version_id, 1);
        assert_eq!(descriptor.target_platform_version, PLATFORM_VERSION);
        assert!(!descriptor.sign);
        assert!(descriptor.key_store_path.is_none());
    }

    #[test]
    fn with_methods_return_copies() {
        let base = Descriptor::from_packages(["com.foo"]);
        let renamed = base.clone().with_name("other").with_version_id(7);
        assert_eq!(base.name, "custom-artifact");
        assert_eq!(renamed.name, "other");
        assert_eq!(renamed.version_id, 7);
    }

    #[test]
    fn with_classes_drops_covered_classes() {
        let descriptor = Descriptor::from_packages(["com.foo"]).with_classes([
            ClassRef::new("com.foo.Inside"),
            ClassRef::new("com.bar.Outside"),
        ]);
        let classes = descriptor.source.classes();
        assert_eq!(classes.len(), 1);
        assert!(classes.contains(&ClassRef::new("com.bar.Outside")));
    }

    #[test]
    fn signed_sets_flag_and_store() {
        let descriptor =
            Descriptor::from_packages(["com.foo"]).signed(Some(PathBuf::from("/keys")));
        assert!(descriptor.sign);
        assert_eq!(descriptor.key_store_path, Some(PathBuf::from("/keys")));
    }

    proptest! {
        #[test]
        fn simplify_is_idempotent(packages in proptest::collection::vec("[a-c]{1,3}(\\.[a-c]{1,3}){0,3}", 0..8)) {
            let once = simplify_packages(packages);
            let twice = simplify_packages(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn simplify_result_has_no_nested_pair(packages in proptest::collection::vec("[a-c]{1,3}(\\.[a-c]{1,3}){0,3}", 0..8)) {
            let simplified = simplify_packages(packages);
            for a in &simplified {
                for b in &simplified {
                    if a != b {
                        let prefix = format!("{a}.");
                        prop_assert!(!b.starts_with(&prefix));
                    }
                }
            }
        }
    }
}
