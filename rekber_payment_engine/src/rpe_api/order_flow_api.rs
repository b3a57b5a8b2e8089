use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db::traits::{CancelOutcome, EscrowDatabase, OrderManagement},
    db_types::{
        CancellationRequest,
        FundRelease,
        NewOrder,
        NewPaymentProof,
        Order,
        OrderId,
        OrderStatusType,
        PaymentProof,
        ReviewDecision,
    },
    events::{EventProducers, OrderCancelledEvent, OrderCompletedEvent, OrderPaidEvent, ProofSubmittedEvent},
    helpers,
    rpe_api::errors::OrderFlowError,
};

/// `OrderFlowApi` drives orders through the escrow lifecycle: creation, payment proof submission and review,
/// delivery, cancellation, and the final fund release to the seller.
///
/// Authorization is split in two. Facts that never change once written (who the seller is, who the buyer is) are
/// checked here. Anything that depends on the order's current status is checked inside the backend transaction, so
/// the guard and the write cannot be separated by a concurrent update.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: EscrowDatabase + OrderManagement
{
    /// Creates a new escrow order for `order.seller_id`.
    ///
    /// The order must pass validation (non-empty title, minimum price, consistent totals), and the seller must not
    /// have created another order within the cooldown window.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        helpers::validate_new_order(&order)?;
        if let Some(last) = self.db.last_order_created_at(&order.seller_id).await? {
            let elapsed = Utc::now() - last;
            if elapsed < Duration::seconds(helpers::ORDER_COOLDOWN_SECONDS) {
                let retry_after_secs = helpers::ORDER_COOLDOWN_SECONDS - elapsed.num_seconds();
                debug!("🔄️📦️ Seller {} hit the order creation cooldown", order.seller_id);
                return Err(OrderFlowError::OrderCooldown { retry_after_secs });
            }
        }
        let order = self.db.create_order(order).await?;
        info!("🔄️📦️ Order [{}] created for seller {} ({})", order.order_number, order.seller_id, order.total_amount);
        Ok(order)
    }

    /// Records a buyer's payment proof and moves the order into verification.
    pub async fn submit_payment_proof(
        &self,
        proof: NewPaymentProof,
        submitted_by: &str,
    ) -> Result<(PaymentProof, Order), OrderFlowError> {
        let (proof, order) = self.db.submit_payment_proof(proof, submitted_by).await?;
        debug!("🔄️🧾️ Proof [{}] submitted for order [{}] by {submitted_by}", proof.id, order.order_number);
        self.call_proof_submitted_hook(&order, &proof).await;
        Ok((proof, order))
    }

    /// Applies an admin verdict to a payment proof. Approval puts the buyer's money in escrow; rejection records
    /// the reason on the proof for the buyer.
    pub async fn review_payment_proof(
        &self,
        proof_id: &str,
        decision: ReviewDecision,
        reviewed_by: &str,
        rejection_reason: Option<String>,
    ) -> Result<(PaymentProof, Order), OrderFlowError> {
        let (proof, order) = self.db.review_payment_proof(proof_id, decision, reviewed_by, rejection_reason).await?;
        info!("🔄️🧾️ Proof [{}] {decision}d by {reviewed_by}. Order [{}] is now {}", proof.id, order.order_number, order.status);
        if decision == ReviewDecision::Approve {
            self.call_order_paid_hook(&order).await;
        }
        Ok((proof, order))
    }

    /// Admin confirmation that the goods reached the buyer.
    pub async fn mark_delivered(
        &self,
        order_id: &OrderId,
        marked_by: &str,
    ) -> Result<(Order, FundRelease), OrderFlowError> {
        let (order, release) = self.db.mark_delivered(order_id, marked_by).await?;
        info!("🔄️🚚️ Order [{}] marked delivered by {marked_by}", order.order_number);
        Ok((order, release))
    }

    /// Buyer confirmation of receipt. Only the order's buyer may confirm.
    pub async fn confirm_received(
        &self,
        order_id: &OrderId,
        buyer_id: &str,
    ) -> Result<(Order, FundRelease), OrderFlowError> {
        let (order, release) = self.db.confirm_received(order_id, buyer_id).await?;
        info!("🔄️🚚️ Buyer confirmed receipt of order [{}]", order.order_number);
        Ok((order, release))
    }

    /// Cancels an order, or files a cancellation request when a payment proof already exists.
    ///
    /// Only the order's seller may cancel, unless `is_admin` is set. The reason must carry enough detail to be
    /// useful to the counterparty.
    pub async fn cancel_or_request(
        &self,
        order_id: &OrderId,
        actor: &str,
        is_admin: bool,
        reason: &str,
    ) -> Result<CancelOutcome, OrderFlowError> {
        helpers::validate_cancellation_reason(reason)?;
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if !is_admin && order.seller_id != actor {
            return Err(OrderFlowError::Forbidden("Only the seller can cancel this order".into()));
        }
        let outcome = self.db.cancel_or_request(order_id, actor, reason.trim()).await?;
        if outcome.cancelled_immediately() {
            info!("🔄️🚫️ Order [{}] cancelled by {actor}", outcome.order.order_number);
            self.call_order_cancelled_hook(&outcome.order, None).await;
        } else {
            info!("🔄️🚫️ Cancellation request filed for order [{}] by {actor}", outcome.order.order_number);
        }
        Ok(outcome)
    }

    /// Applies an admin verdict to a pending cancellation request.
    pub async fn review_cancellation_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
        reviewed_by: &str,
        admin_notes: Option<String>,
    ) -> Result<(CancellationRequest, Order), OrderFlowError> {
        let (request, order) = self.db.review_cancellation_request(request_id, decision, reviewed_by, admin_notes).await?;
        info!("🔄️🚫️ Cancellation request [{}] {decision}d by {reviewed_by}", request.id);
        if decision == ReviewDecision::Approve {
            self.call_order_cancelled_hook(&order, Some(&request)).await;
        }
        Ok((request, order))
    }

    /// Marks the seller's payout transferred and completes the order. Funds are never released twice.
    pub async fn complete_fund_release(
        &self,
        order_id: &OrderId,
        transferred_by: &str,
        transfer_proof: Option<String>,
        transfer_note: Option<String>,
    ) -> Result<(FundRelease, Order), OrderFlowError> {
        let (release, order) =
            self.db.complete_fund_release(order_id, transferred_by, transfer_proof, transfer_note).await?;
        info!(
            "🔄️💸️ Released {} to seller {} for order [{}]",
            release.amount, release.seller_id, order.order_number
        );
        self.call_order_completed_hook(&order, &release).await;
        Ok((release, order))
    }

    /// Admin override: moves an order directly to `status`, subject to the lifecycle transition table.
    pub async fn set_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        changed_by: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.set_order_status(order_id, status, changed_by).await?;
        info!("🔄️📦️ Order [{}] moved to {status} by {changed_by}", order.order_number);
        if status == OrderStatusType::Cancelled {
            self.call_order_cancelled_hook(&order, None).await;
        }
        if status == OrderStatusType::Paid {
            self.call_order_paid_hook(&order).await;
        }
        Ok(order)
    }

    /// Cancels every order that blew through the payment deadline without a proof. Returns the cancelled orders.
    pub async fn cancel_expired_orders(&self, deadline: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let cancelled = self.db.cancel_expired_orders(deadline).await?;
        for order in &cancelled {
            debug!("🔄️🚫️ Order [{}] auto-cancelled after missing the payment deadline", order.order_number);
            self.call_order_cancelled_hook(order, None).await;
        }
        Ok(cancelled)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_cancelled_hook(&self, order: &Order, request: Option<&CancellationRequest>) {
        for emitter in &self.producers.order_cancelled_producer {
            emitter.publish_event(OrderCancelledEvent::new(order.clone(), request.cloned())).await;
        }
    }

    async fn call_order_completed_hook(&self, order: &Order, release: &FundRelease) {
        for emitter in &self.producers.order_completed_producer {
            emitter.publish_event(OrderCompletedEvent::new(order.clone(), release.clone())).await;
        }
    }

    async fn call_proof_submitted_hook(&self, order: &Order, proof: &PaymentProof) {
        for emitter in &self.producers.proof_submitted_producer {
            emitter.publish_event(ProofSubmittedEvent::new(order.clone(), proof.clone())).await;
        }
    }
}
