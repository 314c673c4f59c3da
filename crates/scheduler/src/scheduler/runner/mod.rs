//! Frame scheduler runner -- admission, per-tick draining and lifecycle.
//!
//! Split into focused submodules:
//! - `core`: FrameScheduler struct, constructors, statistics and lifecycle
//! - `admission`: capacity-checked task submission
//! - `drain`: the per-frame drain loop

mod admission;
mod core;
mod drain;

pub use self::core::FrameScheduler;
