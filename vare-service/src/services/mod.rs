//! Services module for vare-service.

pub mod database;
pub mod generation;
pub mod metrics;
pub mod providers;

pub use database::Database;
pub use generation::{GenerationAdapter, GenerationError};
pub use metrics::{get_metrics, init_metrics};
