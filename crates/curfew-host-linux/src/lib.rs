//! Linux host adapter for curfew
//!
//! Provides:
//! - Process enumeration through sysinfo
//! - Forceful (SIGKILL) termination
//! - Effective-uid elevation check and relaunch through `sudo`/`pkexec`
//! - Resolver cache flushing through an external command

mod adapter;
mod privilege;
mod process;
mod resolver;

pub use adapter::*;
pub use privilege::*;
pub use process::*;
pub use resolver::*;
