//! Read/write lease locks
//!
//! - Lock data model and its persisted shape
//! - Lease expiration policy
//! - Acquire/release state transitions
//! - Requests, replicated commands and the shard lock core

pub mod expiration;
pub mod metrics;
pub mod model;
pub mod request;
pub mod service;
pub mod state_machine;

pub use model::*;
pub use request::*;
pub use service::LocksCore;
pub use state_machine::{AcquireOutcome, AcquireParams};
