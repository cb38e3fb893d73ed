use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::{
    db_types::{
        CheckoutSession,
        DeliveryAddress,
        DeliveryMethod,
        NewCheckoutSession,
        OrderId,
        PaymentMethod,
        SellerGroup,
        SessionId,
        SessionItem,
        SessionPricing,
        SessionStatus,
        SessionType,
        StockReservation,
        UserId,
    },
    traits::StoreError,
};

const OPEN_STATUSES: &str = "('pending', 'payment_intent_created', 'processing')";
/// Open statuses that a new checkout may replace. A `processing` session is mid-confirmation and is never replaced.
const REPLACEABLE_STATUSES: &str = "('pending', 'payment_intent_created')";

#[derive(FromRow)]
struct SessionRow {
    id: SessionId,
    buyer_id: UserId,
    session_type: SessionType,
    items: Json<Vec<SessionItem>>,
    seller_groups: Json<Vec<SellerGroup>>,
    pricing: Json<SessionPricing>,
    delivery_method: Option<DeliveryMethod>,
    delivery_address: Option<Json<DeliveryAddress>>,
    payment_method: Option<PaymentMethod>,
    payment_intent_id: Option<String>,
    reservations: Json<Vec<StockReservation>>,
    status: SessionStatus,
    order_ids: Json<Vec<OrderId>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for CheckoutSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            buyer_id: row.buyer_id,
            session_type: row.session_type,
            items: row.items.0,
            seller_groups: row.seller_groups.0,
            pricing: row.pricing.0,
            delivery_method: row.delivery_method,
            delivery_address: row.delivery_address.map(|a| a.0),
            payment_method: row.payment_method,
            payment_intent_id: row.payment_intent_id,
            reservations: row.reservations.0,
            status: row.status,
            order_ids: row.order_ids.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
        }
    }
}

pub async fn fetch_session(id: &SessionId, conn: &mut SqliteConnection) -> Result<Option<CheckoutSession>, StoreError> {
    let row: Option<SessionRow> =
        sqlx::query_as("SELECT * FROM checkout_sessions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row.map(CheckoutSession::from))
}

pub async fn fetch_open_sessions_for_buyer(
    buyer_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CheckoutSession>, StoreError> {
    let rows: Vec<SessionRow> = sqlx::query_as(&format!(
        "SELECT * FROM checkout_sessions WHERE buyer_id = $1 AND status IN {OPEN_STATUSES} ORDER BY created_at"
    ))
    .bind(buyer_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(CheckoutSession::from).collect())
}

pub async fn fetch_open_sessions(conn: &mut SqliteConnection) -> Result<Vec<CheckoutSession>, StoreError> {
    let rows: Vec<SessionRow> =
        sqlx::query_as(&format!("SELECT * FROM checkout_sessions WHERE status IN {OPEN_STATUSES} ORDER BY created_at"))
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(CheckoutSession::from).collect())
}

/// Cancels every open session of the buyer. Call inside the same transaction as [`insert_session`].
///
/// If the buyer has a session that is being confirmed, nothing is cancelled and
/// [`StoreError::ActiveSessionExists`] is returned.
pub async fn cancel_open_sessions_for_buyer(
    buyer_id: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CheckoutSession>, StoreError> {
    let processing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM checkout_sessions WHERE buyer_id = $1 AND status = 'processing'")
            .bind(buyer_id)
            .fetch_one(&mut *conn)
            .await?;
    if processing > 0 {
        debug!("🗃️ {buyer_id} has a checkout in progress. Not replacing it");
        return Err(StoreError::ActiveSessionExists(buyer_id.clone()));
    }
    let rows: Vec<SessionRow> = sqlx::query_as(&format!(
        "UPDATE checkout_sessions SET status = 'cancelled', version = version + 1, updated_at = $1 WHERE buyer_id = $2 \
         AND status IN {REPLACEABLE_STATUSES} RETURNING *"
    ))
    .bind(Utc::now())
    .bind(buyer_id)
    .fetch_all(conn)
    .await?;
    if !rows.is_empty() {
        debug!("🗃️ Cancelled {} open checkout sessions of {buyer_id}", rows.len());
    }
    Ok(rows.into_iter().map(CheckoutSession::from).collect())
}

pub async fn insert_session(
    session: NewCheckoutSession,
    conn: &mut SqliteConnection,
) -> Result<CheckoutSession, StoreError> {
    let buyer_id = session.buyer_id.clone();
    let row: SessionRow = sqlx::query_as(
        r#"
        INSERT INTO checkout_sessions (
            id, buyer_id, session_type, items, seller_groups, pricing, payment_method, reservations, status, version,
            created_at, updated_at, expires_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 0, $9, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&session.id)
    .bind(&session.buyer_id)
    .bind(session.session_type)
    .bind(Json(&session.items))
    .bind(Json(&session.seller_groups))
    .bind(Json(&session.pricing))
    .bind(session.payment_method)
    .bind(Json(&session.reservations))
    .bind(session.created_at)
    .bind(session.expires_at)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::ActiveSessionExists(buyer_id),
        e => StoreError::from(e),
    })?;
    debug!("🗃️ Checkout session [{}] stored for {}", row.id, row.buyer_id);
    Ok(row.into())
}

/// Writes the session back if the stored version still matches, bumping the version.
pub async fn update_session(
    session: &CheckoutSession,
    conn: &mut SqliteConnection,
) -> Result<CheckoutSession, StoreError> {
    let row: Option<SessionRow> = sqlx::query_as(
        r#"
        UPDATE checkout_sessions SET
            items = $1,
            seller_groups = $2,
            pricing = $3,
            delivery_method = $4,
            delivery_address = $5,
            payment_method = $6,
            payment_intent_id = $7,
            reservations = $8,
            status = $9,
            order_ids = $10,
            version = version + 1,
            updated_at = $11
        WHERE id = $12 AND version = $13
        RETURNING *
        "#,
    )
    .bind(Json(&session.items))
    .bind(Json(&session.seller_groups))
    .bind(Json(&session.pricing))
    .bind(session.delivery_method)
    .bind(session.delivery_address.as_ref().map(Json))
    .bind(session.payment_method)
    .bind(&session.payment_intent_id)
    .bind(Json(&session.reservations))
    .bind(session.status)
    .bind(Json(&session.order_ids))
    .bind(Utc::now())
    .bind(&session.id)
    .bind(session.version)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => {
            trace!("🗃️ Checkout session [{}] is now at version {}", row.id, row.version);
            Ok(row.into())
        },
        None => match fetch_session(&session.id, conn).await? {
            Some(_) => Err(StoreError::VersionConflict(session.id.clone())),
            None => Err(StoreError::SessionNotFound(session.id.clone())),
        },
    }
}
