use std::fmt::Display;

use chrono::{DateTime, Utc};
use rekber_payment_engine::db_types::{
    CancellationRequest,
    CancellationStatusType,
    NewOrder,
    Order,
    OrderId,
    OrderNumber,
    OrderStatusType,
    QrisSettings,
    QrisTransaction,
    ReviewDecision,
};
use rpg_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------------   Orders   -----------------------------------------------------------
/// Order creation payload. Clients either send `product_price` + `platform_fee`, or just `total_amount`, in which
/// case the fee is carved out at the legacy 2.5% rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderParams {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub product_price: Option<Rupiah>,
    pub platform_fee: Option<Rupiah>,
    pub total_amount: Option<Rupiah>,
}

impl NewOrderParams {
    pub fn into_new_order(self, seller_id: String) -> Result<NewOrder, ServerError> {
        let mut order = match (self.product_price, self.platform_fee, self.total_amount) {
            (Some(price), Some(fee), _) => NewOrder::new(seller_id, self.title, price, fee),
            (None, None, Some(total)) => NewOrder::from_total(seller_id, self.title, total),
            _ => {
                return Err(ServerError::OrderFlow(rekber_payment_engine::OrderFlowError::ValidationError(
                    "Provide either product_price and platform_fee, or total_amount".to_string(),
                )))
            },
        };
        order.description = self.description;
        Ok(order)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderParams {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusParams {
    pub status: OrderStatusType,
}

/// Admin order search. Mirrors [`OrderQueryFilter`], flattened for the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchQuery {
    pub order_id: Option<OrderId>,
    pub order_number: Option<OrderNumber>,
    pub seller_id: Option<String>,
    pub buyer_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<OrderStatusType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    pub status: Option<CancellationStatusType>,
}

//----------------------------------------------   Proofs   -----------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitProofParams {
    pub order_id: OrderId,
    pub amount: Option<Rupiah>,
    pub proof_url: Option<String>,
    #[serde(default)]
    pub note: String,
    /// Identifies the buyer on anonymous submissions from the public payment page. Ignored when the request carries
    /// an access token.
    pub buyer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofReviewParams {
    pub action: ReviewDecision,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationReviewParams {
    pub action: ReviewDecision,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundReleaseParams {
    pub transfer_proof: Option<String>,
    pub transfer_note: Option<String>,
}

//----------------------------------------------   Cancellation   -----------------------------------------------------
/// Result of a cancellation attempt: either the order was cancelled on the spot, or a request now awaits review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationResult {
    pub cancelled_immediately: bool,
    pub order: Order,
    pub request: Option<CancellationRequest>,
}

//----------------------------------------------   QRIS   -------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrisUploadParams {
    pub qris_data: String,
    pub merchant_name: Option<String>,
    pub merchant_city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrisGenerateParams {
    pub amount: Rupiah,
    pub order_id: Option<OrderId>,
}

/// What the payment page needs to render a dynamic QRIS code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrisPaymentResult {
    pub transaction_id: String,
    pub qris_string: String,
    pub amount: Rupiah,
    pub merchant_name: String,
    pub merchant_city: String,
    pub expires_at: DateTime<Utc>,
}

impl QrisPaymentResult {
    pub fn new(tx: QrisTransaction, settings: &QrisSettings) -> Self {
        Self {
            transaction_id: tx.id,
            qris_string: tx.generated_qris,
            amount: tx.amount,
            merchant_name: settings.merchant_name.clone(),
            merchant_city: settings.merchant_city.clone(),
            expires_at: tx.expires_at,
        }
    }
}
