//! Test infrastructure for the L2 gateway service
//!
//! Provides:
//! - A recording southbound driver with fault injection
//! - Request fixtures and OVSDB mirror seeding
//! - Journal verification helpers (call order, counts, transaction depth)

pub mod fixtures;
mod recording;
mod verification;

pub use fixtures::*;
pub use recording::{DriverCall, RecordingDriver};
pub use verification::*;
