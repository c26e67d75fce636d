//! Enforcement engine for curfew
//!
//! This crate is the heart of curfew, containing:
//! - The schedule oracle (is the blocking period active right now?)
//! - Hosts file synchronization for blocked websites
//! - Process sweeps for blocked apps
//! - The unblock gate (hourly attempt limit plus a challenge)
//! - The engine tying them together with the persisted blocklists

mod auth;
mod challenge;
mod enforcer;
mod engine;
mod events;
mod gate;
mod hosts;
mod mock;
mod schedule;

pub use auth::*;
pub use challenge::*;
pub use enforcer::*;
pub use engine::*;
pub use events::*;
pub use gate::*;
pub use hosts::*;
pub use mock::*;
pub use schedule::*;
