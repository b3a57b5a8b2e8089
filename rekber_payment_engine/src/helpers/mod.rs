//! Business rules that sit above the storage layer but below the HTTP surface.

use rpg_common::Rupiah;

use crate::{db_types::NewOrder, rpe_api::errors::OrderFlowError};

/// A seller may create at most one order every two minutes.
pub const ORDER_COOLDOWN_SECONDS: i64 = 120;

/// Orders that sit in `awaiting_payment` for longer than this are swept up by the auto-cancel job.
pub const PAYMENT_DEADLINE_HOURS: i64 = 24;

/// Cancellation reasons shorter than this are rejected; "test" and "asdf" tell the counterparty nothing.
pub const MIN_CANCELLATION_REASON_LEN: usize = 10;

/// The smallest product price the platform accepts.
pub fn min_product_price() -> Rupiah {
    Rupiah::from(10_000)
}

/// Validates a new order before it reaches the database.
pub fn validate_new_order(order: &NewOrder) -> Result<(), OrderFlowError> {
    if order.seller_id.trim().is_empty() {
        return Err(OrderFlowError::ValidationError("Seller id is required".into()));
    }
    if order.title.trim().is_empty() {
        return Err(OrderFlowError::ValidationError("Order title is required".into()));
    }
    if order.product_price < min_product_price() {
        return Err(OrderFlowError::ValidationError(format!(
            "Product price must be at least {}",
            min_product_price()
        )));
    }
    if order.product_price + order.platform_fee != order.total_amount {
        return Err(OrderFlowError::ValidationError(
            "Total amount must equal product price plus platform fee".into(),
        ));
    }
    Ok(())
}

/// Validates the reason given when cancelling an order or filing a cancellation request.
pub fn validate_cancellation_reason(reason: &str) -> Result<(), OrderFlowError> {
    if reason.trim().len() < MIN_CANCELLATION_REASON_LEN {
        return Err(OrderFlowError::ValidationError(format!(
            "Cancellation reason must be at least {MIN_CANCELLATION_REASON_LEN} characters"
        )));
    }
    Ok(())
}
