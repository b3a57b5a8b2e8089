use chrono::{DateTime, Duration, Utc};
use mockall::mock;
use rekber_payment_engine::{
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
        ProofStatusType,
        QrisSettings,
        QrisTransaction,
        ReviewDecision,
    },
    order_objects::OrderQueryFilter,
    CancelOutcome,
    EscrowDatabase,
    OrderFlowError,
    OrderManagement,
    QrisApiError,
    QrisManagement,
};
use rpg_common::Rupiah;

mock! {
    pub EscrowDb {}

    impl Clone for EscrowDb {
        fn clone(&self) -> Self;
    }

    impl EscrowDatabase for EscrowDb {
        fn url(&self) -> &str;
        async fn create_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;
        async fn last_order_created_at(&self, seller_id: &str) -> Result<Option<DateTime<Utc>>, OrderFlowError>;
        async fn submit_payment_proof(&self, proof: NewPaymentProof, submitted_by: &str) -> Result<(PaymentProof, Order), OrderFlowError>;
        async fn review_payment_proof(&self, proof_id: &str, decision: ReviewDecision, reviewed_by: &str, rejection_reason: Option<String>) -> Result<(PaymentProof, Order), OrderFlowError>;
        async fn mark_delivered(&self, order_id: &OrderId, marked_by: &str) -> Result<(Order, FundRelease), OrderFlowError>;
        async fn confirm_received(&self, order_id: &OrderId, buyer_id: &str) -> Result<(Order, FundRelease), OrderFlowError>;
        async fn cancel_or_request(&self, order_id: &OrderId, requested_by: &str, reason: &str) -> Result<CancelOutcome, OrderFlowError>;
        async fn review_cancellation_request(&self, request_id: &str, decision: ReviewDecision, reviewed_by: &str, admin_notes: Option<String>) -> Result<(CancellationRequest, Order), OrderFlowError>;
        async fn complete_fund_release(&self, order_id: &OrderId, transferred_by: &str, transfer_proof: Option<String>, transfer_note: Option<String>) -> Result<(FundRelease, Order), OrderFlowError>;
        async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType, changed_by: &str) -> Result<Order, OrderFlowError>;
        async fn cancel_expired_orders(&self, deadline: Duration) -> Result<Vec<Order>, OrderFlowError>;
    }

    impl OrderManagement for EscrowDb {
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderFlowError>;
        async fn fetch_proofs_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentProof>, OrderFlowError>;
        async fn fetch_pending_proofs(&self) -> Result<Vec<PaymentProof>, OrderFlowError>;
        async fn fetch_cancellation_requests(&self, status: Option<CancellationStatusType>) -> Result<Vec<CancellationRequest>, OrderFlowError>;
        async fn fetch_cancellation_request_for_order(&self, order_id: &OrderId) -> Result<Option<CancellationRequest>, OrderFlowError>;
        async fn fetch_fund_release_for_order(&self, order_id: &OrderId) -> Result<Option<FundRelease>, OrderFlowError>;
        async fn fetch_pending_fund_releases(&self) -> Result<Vec<FundRelease>, OrderFlowError>;
    }
}

mock! {
    pub QrisDb {}

    impl QrisManagement for QrisDb {
        async fn activate_qris_settings(&self, settings: NewQrisSettings) -> Result<QrisSettings, QrisApiError>;
        async fn fetch_active_qris_settings(&self) -> Result<Option<QrisSettings>, QrisApiError>;
        async fn delete_qris_settings(&self, id: &str) -> Result<(), QrisApiError>;
        async fn insert_qris_transaction(&self, tx: NewQrisTransaction) -> Result<QrisTransaction, QrisApiError>;
        async fn fetch_qris_transaction(&self, id: &str) -> Result<Option<QrisTransaction>, QrisApiError>;
    }
}

//----------------------------------------------   Sample data  -------------------------------------------------------

pub fn sample_order(seller_id: &str, buyer_id: Option<&str>) -> Order {
    let created_at = Utc::now() - Duration::hours(1);
    Order {
        id: OrderId("order-1".to_string()),
        order_number: OrderNumber("ORD-20260801-00042".to_string()),
        seller_id: seller_id.to_string(),
        buyer_id: buyer_id.map(String::from),
        title: "PlayStation 5".to_string(),
        description: String::default(),
        product_price: Rupiah::from(5_000_000),
        platform_fee: Rupiah::from(125_000),
        total_amount: Rupiah::from(5_125_000),
        status: OrderStatusType::AwaitingPayment,
        cancelled_at: None,
        cancellation_reason: None,
        cancelled_by: None,
        delivered_at: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn sample_proof(order_id: &OrderId) -> PaymentProof {
    PaymentProof {
        id: "proof-1".to_string(),
        payment_id: "payment-1".to_string(),
        order_id: order_id.clone(),
        amount: Some(Rupiah::from(5_125_000)),
        proof_url: Some("https://files.example.com/transfer.png".to_string()),
        note: String::default(),
        status: ProofStatusType::Pending,
        rejection_reason: None,
        created_at: Utc::now(),
    }
}

pub fn sample_settings(qris_data: &str) -> QrisSettings {
    QrisSettings {
        id: "qris-1".to_string(),
        qris_data: qris_data.to_string(),
        merchant_name: "Toko Sejahtera".to_string(),
        merchant_city: "Jakarta".to_string(),
        created_by: "admin-1".to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}
