//! Request and response bodies for the HTTP API.
//!
//! `RecordCreate` doubles as the shape the generation adapter expects back
//! from the model, so a generated analysis can be posted to `/db/` unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{
    Action, NewAction, NewReason, NewRecord, NewTodo, Reason, RecordDetail, Todo,
};

pub const DEFAULT_LIST_LIMIT: i64 = 10;
pub const MAX_LIST_LIMIT: i64 = 100;

// ----------------------------------------------------------------------------
// Generation
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateRequest {
    pub ideal: String,
    pub afraid: String,
    pub current: String,
}

// ----------------------------------------------------------------------------
// Submission
// ----------------------------------------------------------------------------

// Each list is capped at 100 entries so `order_seq` stays well inside SMALLINT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SuccData {
    pub description: String,
    #[validate(
        length(max = 100, message = "Too many to-do items"),
        custom(function = "validate_todo_texts")
    )]
    pub todo: Vec<String>,
    #[validate(
        length(max = 100, message = "Too many to-do categories"),
        custom(function = "validate_short_labels")
    )]
    pub todo_cata: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FailData {
    pub description: String,
    #[validate(length(max = 100, message = "Too many reasons"))]
    pub reason: Vec<String>,
    #[validate(
        length(max = 100, message = "Too many percentages"),
        custom(function = "validate_percents")
    )]
    pub percent: Vec<i32>,
    #[validate(
        length(max = 100, message = "Too many action titles"),
        custom(function = "validate_action_titles")
    )]
    pub action_title: Vec<String>,
    #[validate(length(max = 100, message = "Too many action descriptions"))]
    pub action_desc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RecordCreate {
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: String,
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: String,
    #[validate(nested)]
    pub succ: SuccData,
    #[validate(nested)]
    pub fail: FailData,
}

fn validate_each(
    items: &[String],
    max_chars: usize,
    code: &'static str,
) -> Result<(), ValidationError> {
    if items.iter().any(|s| s.chars().count() > max_chars) {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("Each entry must be at most {} characters", max_chars).into());
        return Err(err);
    }
    Ok(())
}

fn validate_todo_texts(items: &[String]) -> Result<(), ValidationError> {
    validate_each(items, 500, "todo_too_long")
}

fn validate_short_labels(items: &[String]) -> Result<(), ValidationError> {
    validate_each(items, 100, "label_too_long")
}

fn validate_action_titles(items: &[String]) -> Result<(), ValidationError> {
    validate_each(items, 255, "action_title_too_long")
}

fn validate_percents(items: &[i32]) -> Result<(), ValidationError> {
    if items.iter().any(|p| !(0..=100).contains(p)) {
        let mut err = ValidationError::new("percent_out_of_range");
        err.message = Some("Percentages must be between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}

/// 1-based sequence index for the item at `index`.
fn order_seq(index: usize) -> i16 {
    i16::try_from(index + 1).unwrap_or(i16::MAX)
}

fn warn_on_truncation(field: &str, left: usize, right: usize) {
    if left != right {
        tracing::warn!(
            field = field,
            left_len = left,
            right_len = right,
            kept = left.min(right),
            "Paired list lengths differ; truncating to the shorter list"
        );
    }
}

impl RecordCreate {
    /// Pair the parallel lists into child rows.
    ///
    /// Pairs are zipped, so mismatched lengths keep only as many children as
    /// the shorter list. Sequence indices run `1..=n` in submission order.
    pub fn to_new_record(&self) -> NewRecord {
        warn_on_truncation("todo/todo_cata", self.succ.todo.len(), self.succ.todo_cata.len());
        warn_on_truncation("reason/percent", self.fail.reason.len(), self.fail.percent.len());
        warn_on_truncation(
            "action_title/action_desc",
            self.fail.action_title.len(),
            self.fail.action_desc.len(),
        );

        let todos = self
            .succ
            .todo
            .iter()
            .zip(&self.succ.todo_cata)
            .enumerate()
            .map(|(i, (text, category))| NewTodo {
                todo_text: text.clone(),
                todo_category: category.clone(),
                order_seq: order_seq(i),
            })
            .collect();

        let reasons = self
            .fail
            .reason
            .iter()
            .zip(&self.fail.percent)
            .enumerate()
            .map(|(i, (text, percent))| NewReason {
                reason_text: text.clone(),
                // validated to 0..=100
                percent: (*percent).clamp(0, 100) as i16,
                order_seq: order_seq(i),
            })
            .collect();

        let actions = self
            .fail
            .action_title
            .iter()
            .zip(&self.fail.action_desc)
            .enumerate()
            .map(|(i, (title, desc))| NewAction {
                action_title: title.clone(),
                action_desc: desc.clone(),
                order_seq: order_seq(i),
            })
            .collect();

        NewRecord {
            category: self.category.clone(),
            title: self.title.clone(),
            succ_description: self.succ.description.clone(),
            fail_description: self.fail.description.clone(),
            todos,
            reasons,
            actions,
        }
    }
}

// ----------------------------------------------------------------------------
// Queries and updates
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

impl ListRecordsQuery {
    /// Offset and page size actually used for the query.
    pub fn normalized(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, MAX_LIST_LIMIT))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TodoUpdate {
    pub is_completed: bool,
}

// ----------------------------------------------------------------------------
// Responses
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoResponse {
    pub id: i64,
    pub todo_text: String,
    pub todo_category: String,
    pub order_seq: i16,
    pub is_completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReasonResponse {
    pub id: i64,
    pub reason_text: String,
    pub percent: i16,
    pub order_seq: i16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub id: i64,
    pub action_title: String,
    pub action_desc: String,
    pub order_seq: i16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub succ_description: String,
    pub fail_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub todos: Vec<TodoResponse>,
    pub reasons: Vec<ReasonResponse>,
    pub actions: Vec<ActionResponse>,
}

impl From<Todo> for TodoResponse {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            todo_text: t.todo_text,
            todo_category: t.todo_category,
            order_seq: t.order_seq,
            is_completed: t.is_completed,
        }
    }
}

impl From<Reason> for ReasonResponse {
    fn from(r: Reason) -> Self {
        Self {
            id: r.id,
            reason_text: r.reason_text,
            percent: r.percent,
            order_seq: r.order_seq,
        }
    }
}

impl From<Action> for ActionResponse {
    fn from(a: Action) -> Self {
        Self {
            id: a.id,
            action_title: a.action_title,
            action_desc: a.action_desc,
            order_seq: a.order_seq,
        }
    }
}

impl From<RecordDetail> for RecordResponse {
    fn from(detail: RecordDetail) -> Self {
        let RecordDetail {
            record,
            todos,
            reasons,
            actions,
        } = detail;

        Self {
            id: record.id,
            category: record.category,
            title: record.title,
            succ_description: record.succ_description,
            fail_description: record.fail_description,
            created_at: record.created_at,
            updated_at: record.updated_at,
            todos: todos.into_iter().map(Into::into).collect(),
            reasons: reasons.into_iter().map(Into::into).collect(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }
}
