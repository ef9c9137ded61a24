//! Weighted causes of the fear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reason {
    pub id: i64,
    pub vare_id: i64,
    pub reason_text: String,
    pub percent: i16,
    pub order_seq: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReason {
    pub reason_text: String,
    pub percent: i16,
    pub order_seq: i16,
}
