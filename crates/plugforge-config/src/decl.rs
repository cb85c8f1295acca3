//! TOML declaration files describing a desired artifact.
//!
//! A declaration file is the on-disk form of a [`Descriptor`], used by the
//! CLI and by harnesses that keep their plugin declarations next to the
//! test data:
//!
//! ```toml
//! [artifact]
//! name = "trade-workflows"
//! version-id = 2
//! packages = ["com.example.trade"]
//! sign = true
//!
//! [config]
//! minimumPlatformVersion = 1
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::descriptor::{ArtifactSource, ClassRef, Descriptor, PLATFORM_VERSION};

/// A parsed declaration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    pub artifact: ArtifactDecl,
    #[serde(default)]
    pub config: BTreeMap<String, toml::Value>,
}

/// The `[artifact]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ArtifactDecl {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version_id")]
    pub version_id: u32,
    #[serde(default = "default_target_platform_version")]
    pub target_platform_version: u32,
    #[serde(default)]
    pub packages: Vec<String>,
    pub scan_package: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub sign: bool,
    pub key_store_path: Option<PathBuf>,
}

fn default_name() -> String {
    "custom-artifact".to_owned()
}

fn default_version_id() -> u32 {
    1
}

fn default_target_platform_version() -> u32 {
    PLATFORM_VERSION
}

impl Declaration {
    /// Read and parse a declaration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// mixes `scan-package` with `packages`/`classes`.
    pub fn from_path(path: &Path) -> Result<Self, DeclError> {
        let content = std::fs::read_to_string(path).map_err(|e| DeclError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let declaration: Declaration =
            toml::from_str(&content).map_err(|e| DeclError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        declaration.validate(path)?;
        Ok(declaration)
    }

    fn validate(&self, path: &Path) -> Result<(), DeclError> {
        if self.artifact.scan_package.is_some()
            && (!self.artifact.packages.is_empty() || !self.artifact.classes.is_empty())
        {
            return Err(DeclError::MixedSource {
                path: path.display().to_string(),
            });
        }
        Ok(())
    }

    /// Convert into the in-memory descriptor.
    ///
    /// # Errors
    /// Returns an error if a config value cannot be represented as JSON.
    pub fn into_descriptor(self) -> Result<Descriptor, DeclError> {
        let source = match self.artifact.scan_package {
            Some(package) => ArtifactSource::ScanPackage { package },
            None if self.artifact.classes.is_empty() => ArtifactSource::Packages {
                packages: self.artifact.packages.into_iter().collect(),
            },
            None => ArtifactSource::Custom {
                packages: self.artifact.packages.into_iter().collect(),
                classes: self
                    .artifact
                    .classes
                    .into_iter()
                    .map(ClassRef::new)
                    .collect(),
            },
        };

        let mut config = BTreeMap::new();
        for (key, value) in self.config {
            let json = serde_json::to_value(value).map_err(|e| DeclError::Config {
                key: key.clone(),
                message: e.to_string(),
            })?;
            config.insert(key, json);
        }

        Ok(Descriptor {
            name: self.artifact.name,
            version_id: self.artifact.version_id,
            target_platform_version: self.artifact.target_platform_version,
            config,
            source,
            sign: self.artifact.sign,
            key_store_path: self.artifact.key_store_path,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeclError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid declaration at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{path}: scan-package cannot be combined with packages or classes")]
    MixedSource { path: String },
    #[error("invalid config value for `{key}`: {message}")]
    Config { key: String, message: String },
}
