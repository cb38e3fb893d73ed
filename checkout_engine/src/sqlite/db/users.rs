use campus_common::Money;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::{
    db_types::{DeliverySettings, NewUser, Role, UserId, UserProfile},
    traits::StoreError,
};

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    username: Option<String>,
    display_name: String,
    email: Option<String>,
    phone: Option<String>,
    role: Role,
    delivery_settings: Json<DeliverySettings>,
    deliverable_campuses: Json<Vec<String>>,
    total_revenue: Money,
    total_sales: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            email: row.email,
            phone: row.phone,
            role: row.role,
            delivery_settings: row.delivery_settings.0,
            deliverable_campuses: row.deliverable_campuses.0,
            total_revenue: row.total_revenue,
            total_sales: row.total_sales,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn fetch_user(id: &UserId, conn: &mut SqliteConnection) -> Result<Option<UserProfile>, StoreError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row.map(UserProfile::from))
}

pub async fn upsert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<UserProfile, StoreError> {
    let now = Utc::now();
    let row: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, display_name, email, phone, role, delivery_settings, deliverable_campuses,
                           created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        ON CONFLICT (id) DO UPDATE SET
            username = excluded.username,
            display_name = excluded.display_name,
            email = excluded.email,
            phone = excluded.phone,
            role = excluded.role,
            delivery_settings = excluded.delivery_settings,
            deliverable_campuses = excluded.deliverable_campuses,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(user.role)
    .bind(Json(&user.delivery_settings))
    .bind(Json(&user.deliverable_campuses))
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User [{}] saved", row.id);
    Ok(row.into())
}

/// Adds a completed sale to the seller's aggregate metrics.
pub async fn record_sale(seller_id: &UserId, amount: Money, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE users SET total_revenue = total_revenue + $1, total_sales = total_sales + 1, updated_at = $2 WHERE id \
         = $3",
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(seller_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        debug!("🗃️ Seller {seller_id} has no profile. Sales metrics were not updated");
    }
    Ok(())
}
