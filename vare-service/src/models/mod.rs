//! Domain models for vare-service.

mod action;
mod reason;
mod record;
mod todo;

pub use action::{Action, NewAction};
pub use reason::{NewReason, Reason};
pub use record::{NewRecord, Record, RecordDetail};
pub use todo::{NewTodo, Todo};
