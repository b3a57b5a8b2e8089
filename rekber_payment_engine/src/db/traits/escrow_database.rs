use chrono::{DateTime, Duration, Utc};

use crate::{
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
    db::traits::CancelOutcome,
    rpe_api::errors::OrderFlowError,
};

/// The state-changing half of a payment engine backend.
///
/// Every method that touches an order's status performs its guard and its write inside a single database
/// transaction. Callers therefore never need to "check then act"; they issue the operation and either get the
/// updated records back or a specific error explaining which guard failed.
#[allow(async_fn_in_trait)]
pub trait EscrowDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order along with its pending payment record, and returns the full order as stored.
    async fn create_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// When the given seller last created an order. Used to rate-limit order creation.
    async fn last_order_created_at(&self, seller_id: &str) -> Result<Option<DateTime<Utc>>, OrderFlowError>;

    /// Records a payment proof submitted by `submitted_by` and moves the order into verification.
    ///
    /// * The order must currently be awaiting payment, or back in verification after a resubmission.
    /// * The first submitter becomes the order's buyer. Any later submission from a different user is rejected.
    /// * The payment record moves to `awaiting_verification`.
    async fn submit_payment_proof(
        &self,
        proof: NewPaymentProof,
        submitted_by: &str,
    ) -> Result<(PaymentProof, Order), OrderFlowError>;

    /// Applies an admin's verdict to a pending payment proof.
    ///
    /// Approval marks the payment paid and moves the order to `paid`. Rejection reopens the order for payment so
    /// the buyer can try again, and records `rejection_reason` on the proof so the buyer can see what was wrong.
    /// A proof that has already been reviewed cannot be reviewed twice.
    async fn review_payment_proof(
        &self,
        proof_id: &str,
        decision: ReviewDecision,
        reviewed_by: &str,
        rejection_reason: Option<String>,
    ) -> Result<(PaymentProof, Order), OrderFlowError>;

    /// Admin confirmation that the goods reached the buyer. The order must be paid or shipped. Sets `delivered_at`
    /// and makes sure a pending fund release record exists for the seller's payout.
    async fn mark_delivered(&self, order_id: &OrderId, marked_by: &str) -> Result<(Order, FundRelease), OrderFlowError>;

    /// Buyer confirmation of receipt. Only the order's buyer may call it, and the order must be paid, shipped or
    /// delivered. Completes the order and makes sure a pending fund release record exists for the seller's payout.
    /// A repeat confirmation is a no-op.
    async fn confirm_received(&self, order_id: &OrderId, buyer_id: &str)
        -> Result<(Order, FundRelease), OrderFlowError>;

    /// Cancels an order, or files a cancellation request if money may already be in flight.
    ///
    /// * Completed, delivered and cancelled orders cannot be cancelled.
    /// * If no payment proof was ever submitted, the order is cancelled immediately.
    /// * Otherwise a pending [`CancellationRequest`] is created for admin review. Only one may be pending at a time.
    async fn cancel_or_request(
        &self,
        order_id: &OrderId,
        requested_by: &str,
        reason: &str,
    ) -> Result<CancelOutcome, OrderFlowError>;

    /// Applies an admin's verdict to a pending cancellation request. Approval cancels the order; rejection leaves
    /// it untouched. Either way the request is closed and cannot be reviewed again.
    async fn review_cancellation_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
        reviewed_by: &str,
        admin_notes: Option<String>,
    ) -> Result<(CancellationRequest, Order), OrderFlowError>;

    /// Marks the seller's payout as transferred and completes the order. A release that was already completed is
    /// reported as [`OrderFlowError::ReleaseAlreadyCompleted`]; funds are never paid out twice.
    async fn complete_fund_release(
        &self,
        order_id: &OrderId,
        transferred_by: &str,
        transfer_proof: Option<String>,
        transfer_note: Option<String>,
    ) -> Result<(FundRelease, Order), OrderFlowError>;

    /// Moves an order directly to `status`, validating the move against the lifecycle transition table. This backs
    /// the admin's status override endpoint and takes the same path as every other transition.
    async fn set_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        changed_by: &str,
    ) -> Result<Order, OrderFlowError>;

    /// Cancels every order that has been awaiting payment for longer than `deadline` with no proof ever submitted.
    /// Returns the orders that were cancelled. Safe to run repeatedly.
    async fn cancel_expired_orders(&self, deadline: Duration) -> Result<Vec<Order>, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}
