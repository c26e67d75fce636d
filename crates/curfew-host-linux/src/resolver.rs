//! Name-resolution cache flushing

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use curfew_host_api::{HostError, HostResult};

/// Longest a flush command may run before it is killed
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Run the configured flush command, waiting at most `timeout`.
///
/// An empty command means flushing is disabled and succeeds immediately.
/// A command that overruns is killed and reported as failed.
pub fn flush_resolver(command: &[String], timeout: Duration) -> HostResult<()> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| HostError::CommandFailed(format!("{}: {}", program, e)))?;

    let status = wait_with_deadline(child, program, timeout)?;

    if status.success() {
        debug!(program = %program, "Resolver cache flushed");
        Ok(())
    } else {
        Err(HostError::CommandFailed(format!(
            "{} exited with {}",
            program, status
        )))
    }
}

fn wait_with_deadline(
    mut child: Child,
    program: &str,
    timeout: Duration,
) -> HostResult<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                warn!(program = %program, ?timeout, "Flush command timed out, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(HostError::CommandFailed(format!(
                    "{} did not finish within {:?}",
                    program, timeout
                )));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(HostError::CommandFailed(format!("waiting for {}: {}", program, e)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_command_is_a_no_op() {
        assert!(flush_resolver(&[], FLUSH_TIMEOUT).is_ok());
    }

    #[test]
    fn exit_status_is_checked() {
        assert!(flush_resolver(&cmd(&["true"]), FLUSH_TIMEOUT).is_ok());
        assert!(matches!(
            flush_resolver(&cmd(&["false"]), FLUSH_TIMEOUT),
            Err(HostError::CommandFailed(_))
        ));
    }

    #[test]
    fn missing_program_is_reported() {
        let result = flush_resolver(
            &cmd(&["/nonexistent/resolvectl", "flush-caches"]),
            FLUSH_TIMEOUT,
        );
        assert!(matches!(result, Err(HostError::CommandFailed(msg)) if msg.contains("resolvectl")));
    }

    #[test]
    fn hung_command_is_killed_at_deadline() {
        let started = Instant::now();
        let result = flush_resolver(&cmd(&["sleep", "30"]), Duration::from_millis(200));

        assert!(matches!(
            result,
            Err(HostError::CommandFailed(msg)) if msg.contains("did not finish")
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
