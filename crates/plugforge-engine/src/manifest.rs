//! The canonical manifest entry written into every synthesized archive.

/// Archive entry path of the manifest. The host loader requires this to be
/// the FIRST entry; if it is absent or misplaced, every other entry is
/// silently ignored.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub const CONTRACT_NAME: &str = "Cordapp-Contract-Name";
pub const CONTRACT_VERSION: &str = "Cordapp-Contract-Version";
pub const WORKFLOW_NAME: &str = "Cordapp-Workflow-Name";
pub const WORKFLOW_VERSION: &str = "Cordapp-Workflow-Version";
pub const TARGET_PLATFORM_VERSION: &str = "Target-Platform-Version";

/// The attribute values stamped into a synthesized archive's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestAttributes {
    pub name: String,
    pub version_id: u32,
    pub target_platform_version: u32,
}

impl ManifestAttributes {
    /// Render the manifest entry bytes.
    ///
    /// `Manifest-Version` must come first; without it the host loader skips
    /// all other attributes. Lines use CRLF and the record ends with a blank
    /// line, per the container format.
    pub fn render(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("Manifest-Version: 1.0\r\n");
        for (key, value) in [
            (CONTRACT_NAME, self.name.clone()),
            (CONTRACT_VERSION, self.version_id.to_string()),
            (WORKFLOW_NAME, self.name.clone()),
            (WORKFLOW_VERSION, self.version_id.to_string()),
            (TARGET_PLATFORM_VERSION, self.target_platform_version.to_string()),
        ] {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    /// Parse attribute key/value pairs from rendered manifest bytes.
    ///
    /// Used by tests and the CLI inspector; tolerant of LF-only endings.
    pub fn parse_attributes(bytes: &[u8]) -> Vec<(String, String)> {
        String::from_utf8_lossy(bytes)
            .lines()
            .filter_map(|line| {
                line.split_once(": ")
                    .map(|(k, v)| (k.to_owned(), v.trim_end().to_owned()))
            })
            .collect()
    }
}
