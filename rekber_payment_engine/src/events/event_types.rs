use serde::{Deserialize, Serialize};

use crate::db_types::{CancellationRequest, FundRelease, Order, PaymentProof};

/// Fired when a payment proof is approved and the order moves into escrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired when a buyer submits (or resubmits) a payment proof for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofSubmittedEvent {
    pub order: Order,
    pub proof: PaymentProof,
}

impl ProofSubmittedEvent {
    pub fn new(order: Order, proof: PaymentProof) -> Self {
        Self { order, proof }
    }
}

/// Fired whenever an order reaches the cancelled state, whatever the trigger: a seller cancellation, an approved
/// cancellation request, an admin override, or the payment-deadline sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
    /// A pending request, if cancellation went through the review flow rather than happening immediately.
    pub request: Option<CancellationRequest>,
}

impl OrderCancelledEvent {
    pub fn new(order: Order, request: Option<CancellationRequest>) -> Self {
        Self { order, request }
    }
}

/// Fired when an admin marks the fund release transferred and the order completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
    pub release: FundRelease,
}

impl OrderCompletedEvent {
    pub fn new(order: Order, release: FundRelease) -> Self {
        Self { order, release }
    }
}
