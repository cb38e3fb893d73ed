use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::{
    db_types::{OutboxTask, SideEffect},
    traits::StoreError,
};

#[derive(FromRow)]
struct OutboxRow {
    id: i64,
    effect: Json<SideEffect>,
    attempts: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for OutboxTask {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.id,
            effect: row.effect.0,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            delivered_at: row.delivered_at,
        }
    }
}

/// Queues side effects. Run inside the transaction of the state change that caused them.
pub async fn enqueue(effects: &[SideEffect], conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let now = Utc::now();
    for effect in effects {
        sqlx::query("INSERT INTO outbox (effect, created_at) VALUES ($1, $2)")
            .bind(Json(effect))
            .bind(now)
            .execute(&mut *conn)
            .await?;
        trace!("📬️ Queued {} side effect", effect.name());
    }
    Ok(())
}

pub async fn fetch_pending(
    limit: i64,
    max_attempts: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OutboxTask>, StoreError> {
    let rows: Vec<OutboxRow> = sqlx::query_as(
        "SELECT * FROM outbox WHERE delivered_at IS NULL AND attempts < $1 ORDER BY id LIMIT $2",
    )
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(OutboxTask::from).collect())
}

pub async fn fetch_task(id: i64, conn: &mut SqliteConnection) -> Result<Option<OutboxTask>, StoreError> {
    let row: Option<OutboxRow> =
        sqlx::query_as("SELECT * FROM outbox WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row.map(OutboxTask::from))
}

pub async fn mark_delivered(id: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query("UPDATE outbox SET delivered_at = $1, attempts = attempts + 1, last_error = NULL WHERE id = $2")
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    trace!("📬️ Outbox task {id} delivered");
    Ok(())
}

pub async fn record_failure(id: i64, error: &str, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query("UPDATE outbox SET attempts = attempts + 1, last_error = $1 WHERE id = $2")
        .bind(error)
        .bind(id)
        .execute(conn)
        .await?;
    debug!("📬️ Outbox task {id} failed: {error}");
    Ok(())
}
