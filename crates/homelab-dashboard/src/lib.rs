pub mod commands;
pub mod config;
pub mod context;
pub mod grid;
pub mod metrics;
pub mod task;
pub mod telemetry;

mod error;

pub use error::{Error, Result};
