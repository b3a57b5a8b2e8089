use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{FundRelease, Order, OrderId},
    rpe_api::errors::OrderFlowError,
};

/// Makes sure a pending payout exists for the order's seller. Creating one is idempotent; the unique index on
/// `order_id` guarantees a second call returns the existing row.
pub async fn ensure_release(order: &Order, conn: &mut SqliteConnection) -> Result<FundRelease, OrderFlowError> {
    sqlx::query(
        r#"
            INSERT OR IGNORE INTO fund_releases (id, order_id, seller_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', $5);
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(order.id.as_str())
    .bind(order.seller_id.as_str())
    .bind(order.total_amount)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    let release = fetch_release_for_order(&order.id, conn)
        .await?
        .ok_or_else(|| OrderFlowError::FundReleaseNotFound(order.id.clone()))?;
    Ok(release)
}

pub async fn fetch_release_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<FundRelease>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM fund_releases WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_pending_releases(conn: &mut SqliteConnection) -> Result<Vec<FundRelease>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM fund_releases WHERE status = 'pending' ORDER BY created_at ASC")
        .fetch_all(conn)
        .await
}

/// Marks the payout transferred. The conditional update is the double-payment guard: a release that is not pending
/// any more cannot be completed again.
pub async fn complete_release(
    release: &FundRelease,
    transferred_by: &str,
    transfer_proof: Option<String>,
    transfer_note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<FundRelease, OrderFlowError> {
    let updated = sqlx::query_as(
        r#"
            UPDATE fund_releases
            SET status = 'completed', transferred_at = $1, transferred_by = $2, transfer_proof = $3, transfer_note = $4
            WHERE id = $5 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(transferred_by)
    .bind(transfer_proof)
    .bind(transfer_note)
    .bind(release.id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or(OrderFlowError::ReleaseAlreadyCompleted)?;
    Ok(updated)
}
