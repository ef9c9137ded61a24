//! Counter-actions suggested against the fear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Action {
    pub id: i64,
    pub vare_id: i64,
    pub action_title: String,
    pub action_desc: String,
    pub order_seq: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub action_title: String,
    pub action_desc: String,
    pub order_seq: i16,
}
