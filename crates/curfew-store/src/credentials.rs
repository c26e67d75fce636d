//! Stored unlock password
//!
//! Only the SHA-256 digest of the password is kept, hex-encoded, in a single
//! file. Without that file no password is required.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{StoreResult, write_atomic};

/// File name of the password digest inside the data directory
pub const PASSWORD_FILE_NAME: &str = "password.txt";

#[derive(Debug, Clone)]
pub struct PasswordFile {
    path: PathBuf,
}

impl PasswordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Password file at its default location inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(PASSWORD_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored digest, if a password has been set
    fn stored_digest(&self) -> StoreResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let digest = content.trim();
                if digest.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(digest.to_ascii_lowercase()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn has_password(&self) -> bool {
        match self.stored_digest() {
            Ok(digest) => digest.is_some(),
            // An unreadable file still means a password was set
            Err(_) => true,
        }
    }

    /// Check `password` against the stored digest.
    ///
    /// With no stored password every input is accepted. With one, an empty
    /// input is always rejected. An unreadable password file rejects.
    pub fn verify(&self, password: &str) -> bool {
        match self.stored_digest() {
            Ok(None) => true,
            Ok(Some(_)) if password.is_empty() => false,
            Ok(Some(stored)) => digest_hex(password) == stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read password file");
                false
            }
        }
    }

    pub fn set_password(&self, password: &str) -> StoreResult<()> {
        let mut content = digest_hex(password);
        content.push('\n');
        write_atomic(&self.path, content.as_bytes())?;
        info!(path = %self.path.display(), "Password updated");
        Ok(())
    }

    /// Remove the stored password. Removing an absent one is not an error.
    pub fn clear_password(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Password cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn digest_hex(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
