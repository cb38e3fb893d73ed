use campus_common::Money;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        DeliveryAddress,
        DeliveryMethod,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        PartySnapshot,
        PaymentDetails,
        PaymentMethod,
        PaymentStatus,
        SessionId,
        StatusChange,
        UserId,
    },
    traits::StoreError,
};

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    session_id: Option<SessionId>,
    buyer: Json<PartySnapshot>,
    seller: Json<PartySnapshot>,
    items: Json<Vec<OrderItem>>,
    subtotal: Money,
    shipping_fee: Money,
    total: Money,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_details: Option<Json<PaymentDetails>>,
    delivery_method: DeliveryMethod,
    delivery_address: Json<DeliveryAddress>,
    status: OrderStatus,
    history: Json<Vec<StatusChange>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            buyer: row.buyer.0,
            seller: row.seller.0,
            items: row.items.0,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            total: row.total,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            payment_details: row.payment_details.map(|d| d.0),
            delivery_method: row.delivery_method,
            delivery_address: row.delivery_address.0,
            status: row.status,
            history: row.history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Inserts a new order in `pending`. This is not atomic on its own; callers run it inside a transaction together with
/// the stock decrements and pass `&mut *tx` as the connection.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let history = order.initial_history();
    let row: OrderRow = sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, session_id, buyer_id, seller_id, buyer, seller, items, subtotal, shipping_fee, total,
            payment_method, payment_status, payment_details, delivery_method, delivery_address, status, history,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 'pending', $16, $17, $17)
        RETURNING *
        "#,
    )
    .bind(&order.id)
    .bind(&order.session_id)
    .bind(&order.buyer.id)
    .bind(&order.seller.id)
    .bind(Json(&order.buyer))
    .bind(Json(&order.seller))
    .bind(Json(&order.items))
    .bind(order.subtotal)
    .bind(order.shipping_fee)
    .bind(order.total)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.payment_details.as_ref().map(Json))
    .bind(order.delivery_method)
    .bind(Json(&order.delivery_address))
    .bind(Json(&history))
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order [{}] inserted for buyer {} and seller {}", row.id, order.buyer.id, order.seller.id);
    Ok(row.into())
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let row: Option<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row.map(Order::from))
}

/// Which side of the order a query is filtering on.
#[derive(Debug, Clone, Copy)]
pub enum Party {
    Buyer,
    Seller,
}

pub async fn fetch_orders_for_party(
    party: Party,
    user_id: &UserId,
    status: Option<OrderStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StoreError> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders WHERE ");
    match party {
        Party::Buyer => builder.push("buyer_id = "),
        Party::Seller => builder.push("seller_id = "),
    };
    builder.push_bind(user_id.as_str());
    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY created_at DESC, id");
    let rows: Vec<OrderRow> = builder.build_query_as().fetch_all(conn).await?;
    trace!("🗃️ {} orders found for {party:?} {user_id}", rows.len());
    Ok(rows.into_iter().map(Order::from).collect())
}

/// Moves the order from `from` to `to` and appends `change` to its history, but only if it is still in `from`.
///
/// Returns `None` if the order was not in `from` (or does not exist), in which case nothing was changed.
pub async fn conditional_status_update(
    order_id: &OrderId,
    from: OrderStatus,
    to: OrderStatus,
    change: StatusChange,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let Some(current) = fetch_order(order_id, &mut *conn).await? else {
        return Ok(None);
    };
    if current.status != from {
        return Ok(None);
    }
    let mut history = current.history;
    history.push(change);
    let row: Option<OrderRow> = sqlx::query_as(
        "UPDATE orders SET status = $1, history = $2, updated_at = $3 WHERE id = $4 AND status = $5 RETURNING *",
    )
    .bind(to)
    .bind(Json(&history))
    .bind(Utc::now())
    .bind(order_id)
    .bind(from)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Order::from))
}
