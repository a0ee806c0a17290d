//! `bedboard` - Hospital bed occupancy tracking
//!
//! This library tracks beds across a tower → floor → sector hierarchy, runs
//! the bed status transition workflow (including patient transfers) with a
//! full audit trail, and computes occupancy statistics. The [`api`] module
//! exposes all of it over HTTP.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod seed;
pub mod server;
pub mod stats;
pub mod storage;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use stats::{Dashboard, Statistics};
pub use storage::Storage;
pub use workflow::TransitionOutcome;
