//! Host adapter trait interfaces for curfew
//!
//! This crate defines the capability-based interface between the enforcement
//! core and platform-specific implementations: the process table, process
//! termination, privilege elevation, and the name-resolution cache. It
//! contains no platform code itself.

mod capabilities;
mod mock;
mod process;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use process::*;
pub use traits::*;
