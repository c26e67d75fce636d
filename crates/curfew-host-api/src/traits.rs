//! Host adapter traits

use thiserror::Error;

use crate::{HostCapabilities, ProcessInfo};

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    /// The process exited before it could be signalled
    #[error("Process {0} no longer exists")]
    ProcessGone(u32),

    #[error("Terminate failed: {0}")]
    TerminateFailed(String),

    #[error("Process enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not supported by this host")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Host adapter trait - implemented by platform-specific adapters
///
/// All calls are synchronous and expected to return promptly; callers on an
/// async runtime run them on the blocking pool.
pub trait HostAdapter: Send + Sync {
    /// Get the capabilities of this host adapter
    fn capabilities(&self) -> &HostCapabilities;

    /// Snapshot of the running processes
    fn list_processes(&self) -> HostResult<Vec<ProcessInfo>>;

    /// Forcefully terminate a process without waiting for it to exit
    fn terminate(&self, process: &ProcessInfo) -> HostResult<()>;

    /// Whether this process may modify system resources such as the hosts file
    fn is_elevated(&self) -> bool;

    /// Replace this process with an elevated copy of itself.
    ///
    /// Only returns on failure.
    fn relaunch_elevated(&self) -> HostResult<()> {
        Err(HostError::Unsupported)
    }

    /// Ask the OS to drop cached name lookups after the hosts file changed
    fn flush_resolver_cache(&self) -> HostResult<()> {
        Ok(())
    }
}
