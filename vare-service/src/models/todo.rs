//! Daily to-do items attached to a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: i64,
    pub vare_id: i64,
    pub todo_text: String,
    pub todo_category: String,
    pub order_seq: i16,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub todo_text: String,
    pub todo_category: String,
    pub order_seq: i16,
}
