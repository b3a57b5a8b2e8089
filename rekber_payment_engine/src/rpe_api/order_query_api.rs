use std::fmt::Debug;

use crate::{
    db::traits::OrderManagement,
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

/// Read-only access to orders and their satellite records. Visibility rules (who may see which order) live at the
/// HTTP layer; this API hands back whatever the backend has.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(id).await
    }

    pub async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order_by_number(number).await
    }

    pub async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        self.db.search_orders(query).await
    }

    pub async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderFlowError> {
        self.db.fetch_payment_for_order(order_id).await
    }

    pub async fn fetch_proofs_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentProof>, OrderFlowError> {
        self.db.fetch_proofs_for_order(order_id).await
    }

    pub async fn fetch_pending_proofs(&self) -> Result<Vec<PaymentProof>, OrderFlowError> {
        self.db.fetch_pending_proofs().await
    }

    pub async fn fetch_cancellation_requests(
        &self,
        status: Option<CancellationStatusType>,
    ) -> Result<Vec<CancellationRequest>, OrderFlowError> {
        self.db.fetch_cancellation_requests(status).await
    }

    pub async fn fetch_cancellation_request_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<CancellationRequest>, OrderFlowError> {
        self.db.fetch_cancellation_request_for_order(order_id).await
    }

    pub async fn fetch_fund_release_for_order(&self, order_id: &OrderId) -> Result<Option<FundRelease>, OrderFlowError> {
        self.db.fetch_fund_release_for_order(order_id).await
    }

    pub async fn fetch_pending_fund_releases(&self) -> Result<Vec<FundRelease>, OrderFlowError> {
        self.db.fetch_pending_fund_releases().await
    }
}
