//! Shared utilities for curfew
//!
//! This crate provides:
//! - Blocklist name types (ListKind, BlockedName)
//! - Time utilities (mock-aware wall clock, daily schedule windows)
//! - Error types
//! - Hourly attempt limiting for unblock requests
//! - Default paths for config, data, and the hosts file

mod error;
mod names;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use names::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
