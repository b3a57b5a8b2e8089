//! Database types for the Rekber payment engine.
//!
//! These types are shared between the storage backends and the public APIs. Statuses are stored as snake_case text
//! in the database and serialized the same way over the wire, so the enum definitions here are the single source of
//! truth for every state machine in the system.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rand::Rng;
use rpg_common::Rupiah;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// A lightweight wrapper around the order's opaque id (a UUID rendered as a string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------      OrderNumber      -------------------------------------------------------
/// The human-readable order reference, in the format `ORD-YYYYMMDD-NNNNN`. This is what sellers share with buyers,
/// so it appears on the public payment page and in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    /// Generates a new order number for today's date with a random 5-digit suffix.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = rand::thread_rng().gen_range(0..100_000);
        Self(format!("ORD-{}-{suffix:05}", now.format("%Y%m%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been created and no payment proof has been submitted yet.
    AwaitingPayment,
    /// A payment proof has been submitted and is waiting for admin review.
    Verification,
    /// The proof was approved; the buyer's money is in escrow.
    Paid,
    /// The seller is preparing the goods.
    Processing,
    /// The goods are on their way to the buyer.
    Shipped,
    /// An admin confirmed delivery. Fund release to the seller is pending.
    Delivered,
    /// Terminal: the funds have been (or are being) released to the seller.
    Completed,
    /// Terminal: the order was cancelled by the seller, an admin, or the payment-deadline sweep.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    /// The order state machine's transition table. Every status write in the system, including the admin's direct
    /// status endpoint, is validated against this table.
    ///
    /// | From \ To        | Verification | Paid | Processing | Shipped | Delivered | Completed | Cancelled |
    /// |------------------|--------------|------|------------|---------|-----------|-----------|-----------|
    /// | AwaitingPayment  | ✓            |      |            |         |           |           | ✓         |
    /// | Verification     |              | ✓    |            |         |           |           | ✓ (+ ←AwaitingPayment on reject) |
    /// | Paid             |              |      | ✓          | ✓       | ✓         | ✓         | ✓         |
    /// | Processing       |              |      |            | ✓       | ✓         | ✓         | ✓         |
    /// | Shipped          |              |      |            |         | ✓         | ✓         | ✓         |
    /// | Delivered        |              |      |            |         |           | ✓         |           |
    /// | Completed        |              |      |            |         |           |           |           |
    /// | Cancelled        |              |      |            |         |           |           |           |
    pub fn can_transition(from: OrderStatusType, to: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (from, to) {
            (AwaitingPayment, Verification) => true,
            // A rejected proof reopens the order for payment.
            (Verification, AwaitingPayment) => true,
            (Verification, Paid) => true,
            (Paid, Processing | Shipped | Delivered | Completed) => true,
            (Processing, Shipped | Delivered | Completed) => true,
            (Shipped, Delivered | Completed) => true,
            (Delivered, Completed) => true,
            // Delivered orders can only complete; everything else non-terminal can still be cancelled.
            (AwaitingPayment | Verification | Paid | Processing | Shipped, Cancelled) => true,
            (_, _) => false,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::AwaitingPayment => "awaiting_payment",
            OrderStatusType::Verification => "verification",
            OrderStatusType::Paid => "paid",
            OrderStatusType::Processing => "processing",
            OrderStatusType::Shipped => "shipped",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Completed => "completed",
            OrderStatusType::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(Self::AwaitingPayment),
            "verification" => Ok(Self::Verification),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------  PaymentStatusType    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatusType {
    Pending,
    AwaitingVerification,
    Paid,
    Rejected,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatusType::Pending => "pending",
            PaymentStatusType::AwaitingVerification => "awaiting_verification",
            PaymentStatusType::Paid => "paid",
            PaymentStatusType::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------   ProofStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProofStatusType {
    Pending,
    Approved,
    Rejected,
}

impl Display for ProofStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProofStatusType::Pending => "pending",
            ProofStatusType::Approved => "approved",
            ProofStatusType::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

//-------------------------------------- CancellationStatusType ------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatusType {
    Pending,
    Approved,
    Rejected,
}

impl Display for CancellationStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CancellationStatusType::Pending => "pending",
            CancellationStatusType::Approved => "approved",
            CancellationStatusType::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

//-------------------------------------- FundReleaseStatusType -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FundReleaseStatusType {
    Pending,
    Completed,
}

impl Display for FundReleaseStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FundReleaseStatusType::Pending => "pending",
            FundReleaseStatusType::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub seller_id: String,
    pub buyer_id: Option<String>,
    pub title: String,
    pub description: String,
    pub product_price: Rupiah,
    pub platform_fee: Rupiah,
    pub total_amount: Rupiah,
    pub status: OrderStatusType,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub seller_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub product_price: Rupiah,
    pub platform_fee: Rupiah,
    pub total_amount: Rupiah,
}

impl NewOrder {
    pub fn new(seller_id: String, title: String, product_price: Rupiah, platform_fee: Rupiah) -> Self {
        Self {
            seller_id,
            title,
            description: String::default(),
            product_price,
            platform_fee,
            total_amount: product_price + platform_fee,
        }
    }

    /// The legacy client only sends a total; the fee is carved out of it at 2.5%, rounded up.
    pub fn from_total(seller_id: String, title: String, total_amount: Rupiah) -> Self {
        let platform_fee = Rupiah::legacy_platform_fee(total_amount);
        Self {
            seller_id,
            title,
            description: String::default(),
            product_price: total_amount - platform_fee,
            platform_fee,
            total_amount,
        }
    }
}

//--------------------------------------        Payment        -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: OrderId,
    pub amount: Rupiah,
    pub status: PaymentStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     PaymentProof      -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentProof {
    pub id: String,
    pub payment_id: String,
    pub order_id: OrderId,
    pub amount: Option<Rupiah>,
    pub proof_url: Option<String>,
    pub note: String,
    pub status: ProofStatusType,
    /// Why the proof was rejected, where an admin gave a reason. Surfaced to the buyer on resubmission.
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A proof submission. The payment record it attaches to is resolved from the order inside the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentProof {
    pub order_id: OrderId,
    pub amount: Option<Rupiah>,
    pub proof_url: Option<String>,
    #[serde(default)]
    pub note: String,
}

//-------------------------------------- CancellationRequest   -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub id: String,
    pub order_id: OrderId,
    pub requested_by: String,
    pub reason: String,
    pub status: CancellationStatusType,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
}

//--------------------------------------      FundRelease      -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FundRelease {
    pub id: String,
    pub order_id: OrderId,
    pub seller_id: String,
    pub amount: Rupiah,
    pub status: FundReleaseStatusType,
    pub transferred_at: Option<DateTime<Utc>>,
    pub transferred_by: Option<String>,
    pub transfer_proof: Option<String>,
    pub transfer_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     QrisSettings      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QrisSettings {
    pub id: String,
    pub qris_data: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub created_by: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQrisSettings {
    pub qris_data: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub created_by: String,
}

//--------------------------------------    QrisTransaction    -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QrisTransaction {
    pub id: String,
    pub user_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Rupiah,
    pub generated_qris: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQrisTransaction {
    pub user_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Rupiah,
    pub generated_qris: String,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------    ReviewDecision     -------------------------------------------------------
/// The admin's verdict on a payment proof or a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl FromStr for ReviewDecision {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            s => Err(ConversionError(format!("Invalid action: {s}. Use 'approve' or 'reject'"))),
        }
    }
}

impl Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewDecision::Approve => write!(f, "approve"),
            ReviewDecision::Reject => write!(f, "reject"),
        }
    }
}
