//! Unblock authentication

use curfew_store::PasswordFile;
use curfew_util::{CurfewError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Rejected,
}

/// Verifies the credential required before an unblock attempt is counted
pub trait Authenticator: Send + Sync {
    /// With no credential configured every input authenticates
    fn authenticate(&self, password: &str) -> AuthOutcome;

    fn has_credential(&self) -> bool;

    /// Replace the credential, or remove it with `None`
    fn update_credential(&self, password: Option<&str>) -> Result<()>;
}

impl Authenticator for PasswordFile {
    fn authenticate(&self, password: &str) -> AuthOutcome {
        if self.verify(password) {
            AuthOutcome::Authenticated
        } else {
            AuthOutcome::Rejected
        }
    }

    fn has_credential(&self) -> bool {
        self.has_password()
    }

    fn update_credential(&self, password: Option<&str>) -> Result<()> {
        let result = match password {
            Some(p) => self.set_password(p),
            None => self.clear_password(),
        };
        result.map_err(|e| CurfewError::store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_file_authenticator() {
        let dir = tempfile::tempdir().unwrap();
        let file = PasswordFile::in_dir(dir.path());

        assert!(!file.has_credential());
        assert_eq!(file.authenticate("anything"), AuthOutcome::Authenticated);

        file.update_credential(Some("hunter2")).unwrap();
        assert!(file.has_credential());
        assert_eq!(file.authenticate("hunter2"), AuthOutcome::Authenticated);
        assert_eq!(file.authenticate("hunter3"), AuthOutcome::Rejected);
        assert_eq!(file.authenticate(""), AuthOutcome::Rejected);

        file.update_credential(None).unwrap();
        assert_eq!(file.authenticate(""), AuthOutcome::Authenticated);
    }
}
