//! PowBench Core: errors, configuration, batch types, work item generation.

pub mod batch;
pub mod config;
pub mod error;
pub mod seeds;

pub use batch::{BatchRequest, HashAlgorithm, WorkItem, ITERATIONS_PER_CYCLE};
pub use config::PowBenchConfig;
pub use error::{Error, Result};
pub use seeds::SeedSource;
