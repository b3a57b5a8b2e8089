use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    qris::QrisError,
};

//--------------------------------------   OrderFlowError   ----------------------------------------------------------
/// Everything that can go wrong while driving an order through its lifecycle. Backends and the order-flow API share
/// this type, so a guard that fails inside a database transaction surfaces to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
    #[error("No payment record exists for order {0}")]
    PaymentNotFound(OrderId),
    #[error("Payment proof not found: {0}")]
    ProofNotFound(String),
    #[error("Cancellation request not found: {0}")]
    CancellationRequestNotFound(String),
    #[error("No fund release record exists for order {0}")]
    FundReleaseNotFound(OrderId),
    #[error("Order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("This cancellation request has already been reviewed")]
    RequestAlreadyProcessed,
    #[error("A cancellation request for this order is already awaiting review")]
    PendingRequestExists,
    #[error("Funds for this order have already been released")]
    ReleaseAlreadyCompleted,
    #[error("This payment proof has already been reviewed")]
    ProofAlreadyReviewed,
    #[error("Too many orders created recently. Try again in {retry_after_secs}s")]
    OrderCooldown { retry_after_secs: i64 },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

//--------------------------------------    QrisApiError    ----------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum QrisApiError {
    #[error("No active QRIS configuration. Ask an administrator to upload one.")]
    NoActiveQris,
    #[error("QRIS settings not found: {0}")]
    SettingsNotFound(String),
    #[error("QRIS transaction not found: {0}")]
    TransactionNotFound(String),
    #[error(transparent)]
    Codec(#[from] QrisError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for QrisApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
