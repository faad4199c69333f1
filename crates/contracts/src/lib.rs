//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Host wall clock in microseconds since the Unix epoch (`i64`) is the primary clock
//! - The device only exposes a 2-bit phase counter; `TimeCorrelator` maps it to host time

mod blueprint;
mod engine_config;
mod error;
mod frame;
mod record;
mod sink;
mod source;
mod time;

pub use blueprint::*;
pub use engine_config::*;
pub use error::*;
pub use frame::*;
pub use record::*;
pub use sink::*;
pub use source::ByteSource;
pub use time::*;
