//! Signing produced archives with a test key store.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::EngineError;

/// File name of the shared test key store inside the output directory.
pub const KEY_STORE_FILE: &str = "_teststore";

const ALIAS: &str = "Test";
const PASSWORD: &str = "secret!";
const DNAME: &str = "O=Test Company Ltd,OU=Test,L=London,C=GB";

/// Signs archives in place using an explicit key store, or a self-signed one
/// generated lazily under the output directory.
///
/// Re-signing an already-signed archive with the same store is safe but not
/// deduplicated; callers are expected not to sign the same artifact twice
/// within one resolve.
#[derive(Debug)]
pub struct Signer {
    output_dir: PathBuf,
    keytool: PathBuf,
    jarsigner: PathBuf,
    // Held across key-pair generation so concurrent callers cannot race it.
    generation: Mutex<()>,
}

impl Signer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            keytool: PathBuf::from("keytool"),
            jarsigner: PathBuf::from("jarsigner"),
            generation: Mutex::new(()),
        }
    }

    /// Override the external tool executables (custom JDK installs, tests).
    pub fn with_tools(mut self, keytool: PathBuf, jarsigner: PathBuf) -> Self {
        self.keytool = keytool;
        self.jarsigner = jarsigner;
        self
    }

    /// Sign `jar` in place.
    ///
    /// The key store comes from `key_store_path` (a directory holding
    /// [`KEY_STORE_FILE`]) or, when absent, from the shared store under the
    /// output directory, generated on first use. The chosen store is copied
    /// next to the target archive before the external signing step runs.
    ///
    /// # Errors
    /// Returns [`EngineError::SigningFailed`] if the external step exits
    /// non-zero, or an error if the key store cannot be prepared.
    pub fn sign(&self, jar: &Path, key_store_path: Option<&Path>) -> Result<(), EngineError> {
        let store_dir = match key_store_path {
            Some(dir) => dir.to_path_buf(),
            None => {
                self.ensure_key_store()?;
                self.output_dir.clone()
            }
        };

        let jar_dir = jar.parent().unwrap_or_else(|| Path::new("."));
        let local_store = jar_dir.join(KEY_STORE_FILE);
        let source_store = store_dir.join(KEY_STORE_FILE);
        if source_store != local_store {
            plugforge_util::fs::copy_file(&source_store, &local_store)?;
        }

        let output = plugforge_util::process::run_command(
            Command::new(&self.jarsigner)
                .arg("-keystore")
                .arg(&local_store)
                .args(["-storepass", PASSWORD, "-keypass", PASSWORD])
                .arg(jar)
                .arg(ALIAS),
        )?;
        if !output.success {
            return Err(EngineError::SigningFailed {
                path: jar.display().to_string(),
                message: if output.stderr.trim().is_empty() {
                    format!("exit code {:?}", output.exit_code)
                } else {
                    output.stderr.trim().to_owned()
                },
            });
        }

        debug!(archive = %jar.display(), "signed archive");
        Ok(())
    }

    /// Generate the shared self-signed key pair if it does not exist yet.
    ///
    /// At most one caller generates; others block until the store exists.
    ///
    /// # Errors
    /// Returns [`EngineError::SigningFailed`] if key generation fails.
    pub fn ensure_key_store(&self) -> Result<PathBuf, EngineError> {
        let _guard = self
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let store = self.output_dir.join(KEY_STORE_FILE);
        if store.is_file() {
            return Ok(store);
        }

        let output = plugforge_util::process::run_command(
            Command::new(&self.keytool)
                .arg("-genkeypair")
                .arg("-keystore")
                .arg(&store)
                .args(["-storepass", PASSWORD, "-keypass", PASSWORD])
                .args(["-keyalg", "RSA", "-alias", ALIAS, "-dname", DNAME]),
        )?;
        if !output.success || !store.is_file() {
            return Err(EngineError::SigningFailed {
                path: store.display().to_string(),
                message: if output.stderr.trim().is_empty() {
                    format!("key generation failed (exit code {:?})", output.exit_code)
                } else {
                    output.stderr.trim().to_owned()
                },
            });
        }

        debug!(store = %store.display(), "generated test key store");
        Ok(store)
    }
}
