//! `SqliteDatabase` is the concrete SQLite implementation of the payment engine backend traits.

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{cancellations, db_url, fund_releases, new_pool, orders, payments, proofs, qris};
use crate::{
    db::traits::{CancelOutcome, EscrowDatabase, OrderManagement, QrisManagement},
    db_types::{
        CancellationRequest,
        CancellationStatusType,
        FundRelease,
        NewOrder,
        NewPaymentProof,
        NewQrisSettings,
        NewQrisTransaction,
        Order,
        OrderId,
        OrderNumber,
        OrderStatusType,
        Payment,
        PaymentProof,
        PaymentStatusType,
        ProofStatusType,
        QrisSettings,
        QrisTransaction,
        ReviewDecision,
    },
    rpe_api::{
        errors::{OrderFlowError, QrisApiError},
        order_objects::OrderQueryFilter,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl EscrowDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        payments::insert_payment(&order.id, order.total_amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] and its payment record stored", order.order_number);
        Ok(order)
    }

    async fn last_order_created_at(&self, seller_id: &str) -> Result<Option<DateTime<Utc>>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let last = orders::last_order_created_at(seller_id, &mut conn).await?;
        Ok(last)
    }

    async fn submit_payment_proof(
        &self,
        proof: NewPaymentProof,
        submitted_by: &str,
    ) -> Result<(PaymentProof, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(&proof.order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(proof.order_id.clone()))?;
        if !matches!(order.status, OrderStatusType::AwaitingPayment | OrderStatusType::Verification) {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Verification });
        }
        let order = orders::claim_order_for_buyer(&order, submitted_by, &mut tx).await?;
        let payment = payments::fetch_payment_for_order(&order.id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentNotFound(order.id.clone()))?;
        let stored = proofs::insert_proof(proof, &payment.id, &mut tx).await?;
        payments::set_payment_status(&payment.id, PaymentStatusType::AwaitingVerification, &mut tx).await?;
        let order = if order.status == OrderStatusType::AwaitingPayment {
            orders::transition_order(&order, OrderStatusType::Verification, &mut tx).await?
        } else {
            // A resubmission while an earlier proof is still under review. The order stays in verification.
            order
        };
        tx.commit().await?;
        Ok((stored, order))
    }

    async fn review_payment_proof(
        &self,
        proof_id: &str,
        decision: ReviewDecision,
        reviewed_by: &str,
        rejection_reason: Option<String>,
    ) -> Result<(PaymentProof, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let proof = proofs::fetch_proof(proof_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::ProofNotFound(proof_id.to_string()))?;
        let order = orders::fetch_order(&proof.order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(proof.order_id.clone()))?;
        let (proof, order) = match decision {
            ReviewDecision::Approve => {
                let proof = proofs::close_proof(&proof, ProofStatusType::Approved, None, &mut tx).await?;
                payments::set_payment_status(&proof.payment_id, PaymentStatusType::Paid, &mut tx).await?;
                let order = orders::transition_order(&order, OrderStatusType::Paid, &mut tx).await?;
                (proof, order)
            },
            ReviewDecision::Reject => {
                let proof =
                    proofs::close_proof(&proof, ProofStatusType::Rejected, rejection_reason.as_deref(), &mut tx)
                        .await?;
                payments::set_payment_status(&proof.payment_id, PaymentStatusType::Rejected, &mut tx).await?;
                // The buyer gets another shot at paying.
                let order = orders::transition_order(&order, OrderStatusType::AwaitingPayment, &mut tx).await?;
                (proof, order)
            },
        };
        tx.commit().await?;
        debug!("🗃️ Proof [{}] reviewed by {reviewed_by}", proof.id);
        Ok((proof, order))
    }

    async fn mark_delivered(
        &self,
        order_id: &OrderId,
        _marked_by: &str,
    ) -> Result<(Order, FundRelease), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let order = orders::deliver_order(&order, &mut tx).await?;
        let release = fund_releases::ensure_release(&order, &mut tx).await?;
        tx.commit().await?;
        Ok((order, release))
    }

    async fn confirm_received(
        &self,
        order_id: &OrderId,
        buyer_id: &str,
    ) -> Result<(Order, FundRelease), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if order.buyer_id.as_deref() != Some(buyer_id) {
            return Err(OrderFlowError::Forbidden("Only the buyer can confirm receipt of this order".into()));
        }
        let release = fund_releases::ensure_release(&order, &mut tx).await?;
        let order = if order.status == OrderStatusType::Completed {
            // The buyer confirming twice changes nothing.
            order
        } else {
            orders::transition_order(&order, OrderStatusType::Completed, &mut tx).await?
        };
        tx.commit().await?;
        Ok((order, release))
    }

    async fn cancel_or_request(
        &self,
        order_id: &OrderId,
        requested_by: &str,
        reason: &str,
    ) -> Result<CancelOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if !OrderStatusType::can_transition(order.status, OrderStatusType::Cancelled) {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: OrderStatusType::Cancelled });
        }
        let outcome = if proofs::order_has_proofs(&order.id, &mut tx).await? {
            // Money may already be moving; an admin has to look at this one.
            if cancellations::pending_request_exists(&order.id, &mut tx).await? {
                return Err(OrderFlowError::PendingRequestExists);
            }
            let request = cancellations::insert_request(&order.id, requested_by, reason, &mut tx).await?;
            CancelOutcome { order, request: Some(request) }
        } else {
            let order = orders::cancel_order(&order, requested_by, reason, &mut tx).await?;
            CancelOutcome { order, request: None }
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn review_cancellation_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
        reviewed_by: &str,
        admin_notes: Option<String>,
    ) -> Result<(CancellationRequest, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let request = cancellations::fetch_request(request_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::CancellationRequestNotFound(request_id.to_string()))?;
        let order = orders::fetch_order(&request.order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(request.order_id.clone()))?;
        let (request, order) = match decision {
            ReviewDecision::Approve => {
                let request =
                    cancellations::close_request(&request, CancellationStatusType::Approved, reviewed_by, admin_notes, &mut tx)
                        .await?;
                let order = orders::cancel_order(&order, &request.requested_by, &request.reason, &mut tx).await?;
                // A cancelled order can never be moved to paid, so any proof still in the queue is unreviewable.
                proofs::reject_pending_for_order(&order.id, "Order cancelled", &mut tx).await?;
                (request, order)
            },
            ReviewDecision::Reject => {
                let request =
                    cancellations::close_request(&request, CancellationStatusType::Rejected, reviewed_by, admin_notes, &mut tx)
                        .await?;
                (request, order)
            },
        };
        tx.commit().await?;
        Ok((request, order))
    }

    async fn complete_fund_release(
        &self,
        order_id: &OrderId,
        transferred_by: &str,
        transfer_proof: Option<String>,
        transfer_note: Option<String>,
    ) -> Result<(FundRelease, Order), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let release = fund_releases::fetch_release_for_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::FundReleaseNotFound(order_id.clone()))?;
        let release = fund_releases::complete_release(&release, transferred_by, transfer_proof, transfer_note, &mut tx).await?;
        let order = if order.status == OrderStatusType::Completed {
            order
        } else {
            orders::transition_order(&order, OrderStatusType::Completed, &mut tx).await?
        };
        tx.commit().await?;
        Ok((release, order))
    }

    async fn set_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        changed_by: &str,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let order = match status {
            OrderStatusType::Cancelled => {
                let order = orders::cancel_order(&order, changed_by, "Status changed by admin", &mut tx).await?;
                proofs::reject_pending_for_order(&order.id, "Order cancelled", &mut tx).await?;
                order
            },
            OrderStatusType::Delivered => {
                let order = orders::deliver_order(&order, &mut tx).await?;
                fund_releases::ensure_release(&order, &mut tx).await?;
                order
            },
            OrderStatusType::Paid => {
                let order = orders::transition_order(&order, OrderStatusType::Paid, &mut tx).await?;
                if let Some(payment) = payments::fetch_payment_for_order(&order.id, &mut tx).await? {
                    payments::set_payment_status(&payment.id, PaymentStatusType::Paid, &mut tx).await?;
                }
                order
            },
            other => orders::transition_order(&order, other, &mut tx).await?,
        };
        tx.commit().await?;
        Ok(order)
    }

    async fn cancel_expired_orders(&self, deadline: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let expired = orders::fetch_expired_orders(deadline, &mut tx).await?;
        let mut cancelled = Vec::with_capacity(expired.len());
        for order in &expired {
            let order = orders::cancel_order(
                order,
                "system",
                "Auto-cancelled: payment deadline exceeded",
                &mut tx,
            )
            .await?;
            cancelled.push(order);
        }
        tx.commit().await?;
        if !cancelled.is_empty() {
            info!("🗃️ Auto-cancelled {} expired orders", cancelled.len());
        }
        Ok(cancelled)
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_proofs_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentProof>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(proofs::fetch_proofs_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_pending_proofs(&self) -> Result<Vec<PaymentProof>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(proofs::fetch_pending_proofs(&mut conn).await?)
    }

    async fn fetch_cancellation_requests(
        &self,
        status: Option<CancellationStatusType>,
    ) -> Result<Vec<CancellationRequest>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(cancellations::fetch_requests(status, &mut conn).await?)
    }

    async fn fetch_cancellation_request_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<CancellationRequest>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(cancellations::fetch_request_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_fund_release_for_order(&self, order_id: &OrderId) -> Result<Option<FundRelease>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fund_releases::fetch_release_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_pending_fund_releases(&self) -> Result<Vec<FundRelease>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fund_releases::fetch_pending_releases(&mut conn).await?)
    }
}

impl QrisManagement for SqliteDatabase {
    async fn activate_qris_settings(&self, settings: NewQrisSettings) -> Result<QrisSettings, QrisApiError> {
        let mut tx = self.pool.begin().await?;
        let settings = qris::activate_settings(settings, &mut tx).await?;
        tx.commit().await?;
        Ok(settings)
    }

    async fn fetch_active_qris_settings(&self) -> Result<Option<QrisSettings>, QrisApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(qris::fetch_active_settings(&mut conn).await?)
    }

    async fn delete_qris_settings(&self, id: &str) -> Result<(), QrisApiError> {
        let mut conn = self.pool.acquire().await?;
        qris::delete_settings(id, &mut conn).await
    }

    async fn insert_qris_transaction(&self, tx: NewQrisTransaction) -> Result<QrisTransaction, QrisApiError> {
        let mut dbtx = self.pool.begin().await?;
        let tx = qris::insert_transaction(tx, &mut dbtx).await?;
        dbtx.commit().await?;
        Ok(tx)
    }

    async fn fetch_qris_transaction(&self, id: &str) -> Result<Option<QrisTransaction>, QrisApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(qris::fetch_transaction(id, &mut conn).await?)
    }
}
