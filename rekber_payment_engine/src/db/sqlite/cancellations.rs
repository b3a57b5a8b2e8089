use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{CancellationRequest, CancellationStatusType, OrderId},
    rpe_api::errors::OrderFlowError,
};

pub async fn insert_request(
    order_id: &OrderId,
    requested_by: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<CancellationRequest, OrderFlowError> {
    let request = sqlx::query_as(
        r#"
            INSERT INTO cancellation_requests (id, order_id, requested_by, reason, status, requested_at)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *;
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(order_id.as_str())
    .bind(requested_by)
    .bind(reason)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(request)
}

pub async fn fetch_request(id: &str, conn: &mut SqliteConnection) -> Result<Option<CancellationRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM cancellation_requests WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// The most recent request filed against the order.
pub async fn fetch_request_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<CancellationRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM cancellation_requests WHERE order_id = $1 ORDER BY requested_at DESC LIMIT 1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_requests(
    status: Option<CancellationStatusType>,
    conn: &mut SqliteConnection,
) -> Result<Vec<CancellationRequest>, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_as("SELECT * FROM cancellation_requests WHERE status = $1 ORDER BY requested_at ASC")
                .bind(status)
                .fetch_all(conn)
                .await
        },
        None => {
            sqlx::query_as("SELECT * FROM cancellation_requests ORDER BY requested_at ASC").fetch_all(conn).await
        },
    }
}

pub async fn pending_request_exists(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM cancellation_requests WHERE order_id = $1 AND status = 'pending'")
            .bind(order_id.as_str())
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

/// Closes a pending request with the admin's verdict. Requests are reviewed exactly once.
pub async fn close_request(
    request: &CancellationRequest,
    status: CancellationStatusType,
    reviewed_by: &str,
    admin_notes: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<CancellationRequest, OrderFlowError> {
    if request.status != CancellationStatusType::Pending {
        return Err(OrderFlowError::RequestAlreadyProcessed);
    }
    let updated = sqlx::query_as(
        r#"
            UPDATE cancellation_requests
            SET status = $1, reviewed_by = $2, reviewed_at = $3, admin_notes = $4
            WHERE id = $5 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(reviewed_by)
    .bind(Utc::now())
    .bind(admin_notes)
    .bind(request.id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or(OrderFlowError::RequestAlreadyProcessed)?;
    Ok(updated)
}
