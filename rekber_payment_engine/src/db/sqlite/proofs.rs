use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{NewPaymentProof, OrderId, PaymentProof, ProofStatusType},
    rpe_api::errors::OrderFlowError,
};

pub async fn insert_proof(
    proof: NewPaymentProof,
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentProof, OrderFlowError> {
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO payment_proofs (id, payment_id, order_id, amount, proof_url, note, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING *;
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(payment_id)
    .bind(proof.order_id)
    .bind(proof.amount)
    .bind(proof.proof_url)
    .bind(proof.note)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(inserted)
}

pub async fn fetch_proof(id: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentProof>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_proofs WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_proofs_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentProof>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_proofs WHERE order_id = $1 ORDER BY created_at DESC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

pub async fn fetch_pending_proofs(conn: &mut SqliteConnection) -> Result<Vec<PaymentProof>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_proofs WHERE status = 'pending' ORDER BY created_at ASC")
        .fetch_all(conn)
        .await
}

/// Whether any proof, in any state, was ever submitted for the order. This is what decides between an immediate
/// cancellation and a reviewed cancellation request.
pub async fn order_has_proofs(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_proofs WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Closes a pending proof with the admin's verdict. A proof that is no longer pending cannot be re-reviewed.
pub async fn close_proof(
    proof: &PaymentProof,
    status: ProofStatusType,
    rejection_reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<PaymentProof, OrderFlowError> {
    if proof.status != ProofStatusType::Pending {
        return Err(OrderFlowError::ProofAlreadyReviewed);
    }
    let updated = sqlx::query_as(
        "UPDATE payment_proofs SET status = $1, rejection_reason = $2 WHERE id = $3 AND status = 'pending' \
         RETURNING *",
    )
    .bind(status)
    .bind(rejection_reason)
    .bind(proof.id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or(OrderFlowError::ProofAlreadyReviewed)?;
    Ok(updated)
}

/// Rejects every proof still pending against the order. Called when an order is cancelled, so the verification
/// queue never holds proofs that can no longer be actioned.
pub async fn reject_pending_for_order(
    order_id: &OrderId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payment_proofs SET status = 'rejected', rejection_reason = $1 WHERE order_id = $2 AND status = 'pending'",
    )
    .bind(reason)
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
