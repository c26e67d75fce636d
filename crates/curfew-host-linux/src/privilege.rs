//! Privilege detection and elevation

use nix::unistd::geteuid;
use std::os::unix::process::CommandExt;
use std::process::Command;
use tracing::info;

use curfew_host_api::HostError;

/// Whether the effective uid is root
pub fn is_root() -> bool {
    geteuid().is_root()
}

/// Build the command that re-runs this executable, with the same
/// arguments, through `helper` (e.g. `sudo` or `pkexec`)
pub fn elevation_command(helper: &str) -> std::io::Result<Command> {
    let exe = std::env::current_exe()?;
    let mut cmd = Command::new(helper);
    cmd.arg(exe).args(std::env::args_os().skip(1));
    Ok(cmd)
}

/// Replace the current process with an elevated copy of itself.
///
/// Only returns if the exec failed.
pub fn relaunch_with(helper: &str) -> HostError {
    let mut cmd = match elevation_command(helper) {
        Ok(cmd) => cmd,
        Err(e) => return HostError::Io(e),
    };

    info!(helper = %helper, "Relaunching with elevated privileges");
    let err = cmd.exec();
    HostError::CommandFailed(format!("failed to exec {}: {}", helper, err))
}
