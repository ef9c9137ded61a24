//! Database service for vare-service.
//!
//! One root table (`vare`) and three child tables keyed by `vare_id`. Children
//! are loaded with one query per child table for a whole page of records.

use crate::models::{Action, NewRecord, Reason, Record, RecordDetail, Todo};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};

const RECORD_COLUMNS: &str =
    "id, category, title, succ_description, fail_description, created_at, updated_at";
const TODO_COLUMNS: &str =
    "id, vare_id, todo_text, todo_category, order_seq, is_completed, created_at";
const REASON_COLUMNS: &str = "id, vare_id, reason_text, percent, order_seq, created_at";
const ACTION_COLUMNS: &str = "id, vare_id, action_title, action_desc, order_seq, created_at";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "vare-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Create a pool that opens connections on first use.
    ///
    /// Only the URL is checked here; nothing touches the network until a
    /// query runs.
    pub fn connect_lazy(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Invalid database URL: {}", e))
            })?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }

    // -------------------------------------------------------------------------
    // Record Operations
    // -------------------------------------------------------------------------

    /// Insert a record and all of its children in one transaction.
    #[instrument(skip(self, input), fields(category = %input.category))]
    pub async fn create_record(&self, input: &NewRecord) -> Result<RecordDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_record"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let record = sqlx::query_as::<_, Record>(&format!(
            r#"
            INSERT INTO vare (category, title, succ_description, fail_description)
            VALUES ($1, $2, $3, $4)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(&input.category)
        .bind(&input.title)
        .bind(&input.succ_description)
        .bind(&input.fail_description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create record: {}", e)))?;

        let mut todos = Vec::with_capacity(input.todos.len());
        for todo in &input.todos {
            let inserted = sqlx::query_as::<_, Todo>(&format!(
                r#"
                INSERT INTO vare_todos (vare_id, todo_text, todo_category, order_seq)
                VALUES ($1, $2, $3, $4)
                RETURNING {TODO_COLUMNS}
                "#
            ))
            .bind(record.id)
            .bind(&todo.todo_text)
            .bind(&todo.todo_category)
            .bind(todo.order_seq)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert todo: {}", e)))?;
            todos.push(inserted);
        }

        let mut reasons = Vec::with_capacity(input.reasons.len());
        for reason in &input.reasons {
            let inserted = sqlx::query_as::<_, Reason>(&format!(
                r#"
                INSERT INTO vare_reasons (vare_id, reason_text, percent, order_seq)
                VALUES ($1, $2, $3, $4)
                RETURNING {REASON_COLUMNS}
                "#
            ))
            .bind(record.id)
            .bind(&reason.reason_text)
            .bind(reason.percent)
            .bind(reason.order_seq)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert reason: {}", e))
            })?;
            reasons.push(inserted);
        }

        let mut actions = Vec::with_capacity(input.actions.len());
        for action in &input.actions {
            let inserted = sqlx::query_as::<_, Action>(&format!(
                r#"
                INSERT INTO vare_actions (vare_id, action_title, action_desc, order_seq)
                VALUES ($1, $2, $3, $4)
                RETURNING {ACTION_COLUMNS}
                "#
            ))
            .bind(record.id)
            .bind(&action.action_title)
            .bind(&action.action_desc)
            .bind(action.order_seq)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert action: {}", e))
            })?;
            actions.push(inserted);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit record: {}", e))
        })?;

        timer.observe_duration();

        info!(
            record_id = record.id,
            todos = todos.len(),
            reasons = reasons.len(),
            actions = actions.len(),
            "Record created"
        );

        Ok(RecordDetail {
            record,
            todos,
            reasons,
            actions,
        })
    }

    /// Get a record with its children by ID.
    #[instrument(skip(self))]
    pub async fn get_record(&self, id: i64) -> Result<Option<RecordDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_record"])
            .start_timer();

        let record = sqlx::query_as::<_, Record>(&format!(
            "SELECT {RECORD_COLUMNS} FROM vare WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get record: {}", e)))?;

        timer.observe_duration();

        match record {
            Some(record) => Ok(self.attach_children(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Most recently created records, newest first.
    #[instrument(skip(self))]
    pub async fn list_records(&self, skip: i64, limit: i64) -> Result<Vec<RecordDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_records"])
            .start_timer();

        let records = sqlx::query_as::<_, Record>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM vare
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list records: {}", e)))?;

        timer.observe_duration();

        self.attach_children(records).await
    }

    /// Delete a record; the foreign keys cascade to its children.
    ///
    /// Returns false when no record had this ID.
    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_record"])
            .start_timer();

        let result = sqlx::query("DELETE FROM vare WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete record: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(record_id = id, "Record deleted");
        }
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Child Operations
    // -------------------------------------------------------------------------

    /// Set a to-do's completion flag and touch the parent's `updated_at`.
    #[instrument(skip(self))]
    pub async fn set_todo_completed(
        &self,
        todo_id: i64,
        is_completed: bool,
    ) -> Result<Option<Todo>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_todo_completed"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let todo = sqlx::query_as::<_, Todo>(&format!(
            r#"
            UPDATE vare_todos
            SET is_completed = $2
            WHERE id = $1
            RETURNING {TODO_COLUMNS}
            "#
        ))
        .bind(todo_id)
        .bind(is_completed)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update todo: {}", e)))?;

        let Some(todo) = todo else {
            return Ok(None);
        };

        sqlx::query("UPDATE vare SET updated_at = NOW() WHERE id = $1")
            .bind(todo.vare_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to touch record: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit todo update: {}", e))
        })?;

        timer.observe_duration();

        Ok(Some(todo))
    }

    /// To-dos of the given records, ordered by record then sequence.
    #[instrument(skip(self, record_ids), fields(records = record_ids.len()))]
    pub async fn todos_for(&self, record_ids: &[i64]) -> Result<Vec<Todo>, AppError> {
        sqlx::query_as::<_, Todo>(&format!(
            r#"
            SELECT {TODO_COLUMNS}
            FROM vare_todos
            WHERE vare_id = ANY($1)
            ORDER BY vare_id, order_seq, id
            "#
        ))
        .bind(record_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load todos: {}", e)))
    }

    /// Reasons of the given records, ordered by record then sequence.
    #[instrument(skip(self, record_ids), fields(records = record_ids.len()))]
    pub async fn reasons_for(&self, record_ids: &[i64]) -> Result<Vec<Reason>, AppError> {
        sqlx::query_as::<_, Reason>(&format!(
            r#"
            SELECT {REASON_COLUMNS}
            FROM vare_reasons
            WHERE vare_id = ANY($1)
            ORDER BY vare_id, order_seq, id
            "#
        ))
        .bind(record_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load reasons: {}", e)))
    }

    /// Actions of the given records, ordered by record then sequence.
    #[instrument(skip(self, record_ids), fields(records = record_ids.len()))]
    pub async fn actions_for(&self, record_ids: &[i64]) -> Result<Vec<Action>, AppError> {
        sqlx::query_as::<_, Action>(&format!(
            r#"
            SELECT {ACTION_COLUMNS}
            FROM vare_actions
            WHERE vare_id = ANY($1)
            ORDER BY vare_id, order_seq, id
            "#
        ))
        .bind(record_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load actions: {}", e)))
    }

    /// Load the children of `records`, preserving the order of `records`.
    async fn attach_children(&self, records: Vec<Record>) -> Result<Vec<RecordDetail>, AppError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_children"])
            .start_timer();

        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut todos = group_by_record(self.todos_for(&ids).await?, |t| t.vare_id);
        let mut reasons = group_by_record(self.reasons_for(&ids).await?, |r| r.vare_id);
        let mut actions = group_by_record(self.actions_for(&ids).await?, |a| a.vare_id);

        timer.observe_duration();

        Ok(records
            .into_iter()
            .map(|record| RecordDetail {
                todos: todos.remove(&record.id).unwrap_or_default(),
                reasons: reasons.remove(&record.id).unwrap_or_default(),
                actions: actions.remove(&record.id).unwrap_or_default(),
                record,
            })
            .collect())
    }
}

/// Bucket rows by parent ID, keeping their relative order.
fn group_by_record<T>(items: Vec<T>, key: impl Fn(&T) -> i64) -> HashMap<i64, Vec<T>> {
    let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
    for item in items {
        grouped.entry(key(&item)).or_default().push(item);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_record_keeps_relative_order() {
        let rows = vec![(1, "a"), (2, "x"), (1, "b"), (1, "c"), (2, "y")];

        let grouped = group_by_record(rows, |(id, _)| *id);

        let first: Vec<&str> = grouped[&1].iter().map(|(_, s)| *s).collect();
        let second: Vec<&str> = grouped[&2].iter().map(|(_, s)| *s).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(second, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn connect_lazy_rejects_malformed_url() {
        assert!(Database::connect_lazy("not a url").is_err());
    }

    #[tokio::test]
    async fn connect_lazy_does_not_touch_the_network() {
        let db = Database::connect_lazy("postgres://user:pw@127.0.0.1:1/vare_db").unwrap();
        assert_eq!(db.pool().size(), 0);
    }
}
