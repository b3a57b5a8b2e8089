use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, OrderNumber, OrderStatusType};

/// Admin search filter over orders. Empty fields are not constrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub order_number: Option<OrderNumber>,
    pub seller_id: Option<String>,
    pub buyer_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_order_number(mut self, number: OrderNumber) -> Self {
        self.order_number = Some(number);
        self
    }

    pub fn with_seller_id(mut self, seller_id: String) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn with_buyer_id(mut self, buyer_id: String) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.order_number.is_none() &&
            self.seller_id.is_none() &&
            self.buyer_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(number) = &self.order_number {
            write!(f, "order_number: {number}. ")?;
        }
        if let Some(seller_id) = &self.seller_id {
            write!(f, "seller: {seller_id}. ")?;
        }
        if let Some(buyer_id) = &self.buyer_id {
            write!(f, "buyer: {buyer_id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "status in [{statuses}]. ")?;
        }
        Ok(())
    }
}
