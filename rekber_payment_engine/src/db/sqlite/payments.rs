use chrono::Utc;
use rpg_common::Rupiah;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{OrderId, Payment, PaymentStatusType},
    rpe_api::errors::OrderFlowError,
};

/// Creates the pending payment record that accompanies every new order.
pub async fn insert_payment(
    order_id: &OrderId,
    amount: Rupiah,
    conn: &mut SqliteConnection,
) -> Result<Payment, OrderFlowError> {
    let now = Utc::now();
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (id, order_id, amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', $4, $4)
            RETURNING *;
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(order_id.as_str())
    .bind(amount)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

pub async fn set_payment_status(
    payment_id: &str,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Payment, OrderFlowError> {
    let payment = sqlx::query_as("UPDATE payments SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(payment_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| OrderFlowError::DatabaseError(format!("Payment {payment_id} vanished mid-update")))?;
    Ok(payment)
}
