use crate::{
    db_types::{
        CancellationRequest,
        CancellationStatusType,
        FundRelease,
        Order,
        OrderId,
        OrderNumber,
        Payment,
        PaymentProof,
    },
    rpe_api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
};

/// Read-side queries over orders and their satellite records.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderFlowError>;

    /// Looks an order up by its public `ORD-...` reference. This is the lookup the payment page uses.
    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;

    /// Every order in which the user participates, as seller or buyer, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError>;

    /// Admin search across all orders.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderFlowError>;

    /// All proofs lodged against the order, newest first.
    async fn fetch_proofs_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentProof>, OrderFlowError>;

    /// Proofs still waiting for an admin verdict, oldest first.
    async fn fetch_pending_proofs(&self) -> Result<Vec<PaymentProof>, OrderFlowError>;

    async fn fetch_cancellation_requests(
        &self,
        status: Option<CancellationStatusType>,
    ) -> Result<Vec<CancellationRequest>, OrderFlowError>;

    /// The most recent cancellation request for the order, if any.
    async fn fetch_cancellation_request_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<CancellationRequest>, OrderFlowError>;

    async fn fetch_fund_release_for_order(&self, order_id: &OrderId) -> Result<Option<FundRelease>, OrderFlowError>;

    /// Payouts that still need to be transferred to sellers, oldest first.
    async fn fetch_pending_fund_releases(&self) -> Result<Vec<FundRelease>, OrderFlowError>;
}
