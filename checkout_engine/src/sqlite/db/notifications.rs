use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewNotification, Notification, UserId},
    traits::StoreError,
};

pub async fn insert_notification(notification: &NewNotification, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO notifications (user_id, kind, title, message, data, created_at) VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(&notification.user_id)
    .bind(notification.kind)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(Json(&notification.data))
    .bind(chrono::Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Notification {id} ({}) stored for {}", notification.kind, notification.user_id);
    Ok(id)
}

pub async fn fetch_notifications(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<Notification>, StoreError> {
    let notifications = sqlx::query_as("SELECT * FROM notifications WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(notifications)
}
