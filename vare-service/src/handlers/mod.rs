//! HTTP handlers for vare-service.

pub mod generate;
pub mod health;
pub mod records;

pub use generate::generate;
pub use health::{health_check, metrics_handler, readiness_check, root};
pub use records::{
    create_record, delete_record, get_record, latest_records, list_records, update_todo,
};
