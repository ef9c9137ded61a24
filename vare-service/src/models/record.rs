//! Root analysis record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Action, NewAction, NewReason, NewTodo, Reason, Todo};

/// One fear/goal analysis (`vare` table).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Record {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub succ_description: String,
    pub fail_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record together with its child collections, each ordered by `order_seq`.
#[derive(Debug, Clone)]
pub struct RecordDetail {
    pub record: Record,
    pub todos: Vec<Todo>,
    pub reasons: Vec<Reason>,
    pub actions: Vec<Action>,
}

/// Input for creating a record and all of its children in one transaction.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub category: String,
    pub title: String,
    pub succ_description: String,
    pub fail_description: String,
    pub todos: Vec<NewTodo>,
    pub reasons: Vec<NewReason>,
    pub actions: Vec<NewAction>,
}
