use chrono::{DateTime, Duration, Utc};
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderNumber, OrderStatusType},
    rpe_api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
};

/// Inserts a new order. The caller wraps this in a transaction together with the payment record insert.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let now = Utc::now();
    let id = OrderId::random();
    let number = OrderNumber::generate(now);
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                order_number,
                seller_id,
                title,
                description,
                product_price,
                platform_fee,
                total_amount,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'awaiting_payment', $9, $9)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(number)
    .bind(order.seller_id)
    .bind(order.title)
    .bind(order.description)
    .bind(order.product_price)
    .bind(order.platform_fee)
    .bind(order.total_amount)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(number.as_str()).fetch_optional(conn).await
}

/// Orders in which the user participates as seller or buyer, newest first.
pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE seller_id = $1 OR buyer_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

pub async fn last_order_created_at(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar("SELECT created_at FROM orders WHERE seller_id = $1 ORDER BY created_at DESC LIMIT 1")
        .bind(seller_id)
        .fetch_optional(conn)
        .await
}

/// Fetches orders matching the `OrderQueryFilter`, newest first.
pub async fn search_orders(
    mut query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    // An empty status list is no constraint at all; drop it so no WHERE clause is emitted for it.
    if query.status.as_ref().is_some_and(|s| s.is_empty()) {
        query.status = None;
    }
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("id = ");
        where_clause.push_bind_unseparated(order_id.to_string());
    }
    if let Some(number) = query.order_number {
        where_clause.push("order_number = ");
        where_clause.push_bind_unseparated(number.to_string());
    }
    if let Some(seller_id) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    if let Some(buyer_id) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(status) = query.status {
        let statuses = status.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Order>().fetch_all(conn).await
}

/// Moves the order to `new_status`, enforcing the lifecycle transition table. The status check and the write use
/// the same connection, so inside a transaction this is atomic.
pub async fn transition_order(
    order: &Order,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    if !OrderStatusType::can_transition(order.status, new_status) {
        return Err(OrderFlowError::InvalidTransition { from: order.status, to: new_status });
    }
    let updated = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *",
    )
    .bind(new_status)
    .bind(Utc::now())
    .bind(order.id.as_str())
    .bind(order.status)
    .fetch_optional(conn)
    .await?
    .ok_or(OrderFlowError::InvalidTransition { from: order.status, to: new_status })?;
    Ok(updated)
}

/// Cancels the order, recording who did it and why.
pub async fn cancel_order(
    order: &Order,
    cancelled_by: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    if !OrderStatusType::can_transition(order.status, OrderStatusType::Cancelled) {
        return Err(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Cancelled });
    }
    let now = Utc::now();
    let updated = sqlx::query_as(
        r#"
            UPDATE orders
            SET status = 'cancelled', cancelled_at = $1, cancellation_reason = $2, cancelled_by = $3, updated_at = $1
            WHERE id = $4 AND status = $5
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(reason)
    .bind(cancelled_by)
    .bind(order.id.as_str())
    .bind(order.status)
    .fetch_optional(conn)
    .await?
    .ok_or(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Cancelled })?;
    Ok(updated)
}

/// Marks the order delivered, stamping `delivered_at`.
pub async fn deliver_order(order: &Order, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    if !OrderStatusType::can_transition(order.status, OrderStatusType::Delivered) {
        return Err(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Delivered });
    }
    let now = Utc::now();
    let updated = sqlx::query_as(
        "UPDATE orders SET status = 'delivered', delivered_at = $1, updated_at = $1 WHERE id = $2 AND status = $3 \
         RETURNING *",
    )
    .bind(now)
    .bind(order.id.as_str())
    .bind(order.status)
    .fetch_optional(conn)
    .await?
    .ok_or(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Delivered })?;
    Ok(updated)
}

/// Records the buyer against the order the first time they submit a proof.
pub async fn claim_order_for_buyer(
    order: &Order,
    buyer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    match &order.buyer_id {
        Some(existing) if existing == buyer_id => Ok(order.clone()),
        Some(_) => Err(OrderFlowError::Forbidden("Another buyer is already paying for this order".into())),
        None => {
            let updated = sqlx::query_as(
                "UPDATE orders SET buyer_id = $1, updated_at = $2 WHERE id = $3 AND buyer_id IS NULL RETURNING *",
            )
            .bind(buyer_id)
            .bind(Utc::now())
            .bind(order.id.as_str())
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| OrderFlowError::Forbidden("Another buyer is already paying for this order".into()))?;
            Ok(updated)
        },
    }
}

/// Orders that have sat in `awaiting_payment` beyond the deadline and have never had a proof submitted.
pub async fn fetch_expired_orders(
    deadline: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let cutoff = Utc::now() - deadline;
    sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = 'awaiting_payment'
              AND created_at < $1
              AND NOT EXISTS (SELECT 1 FROM payment_proofs WHERE payment_proofs.order_id = orders.id)
            ORDER BY created_at ASC;
        "#,
    )
    .bind(cutoff)
    .fetch_all(conn)
    .await
}
