use serde::{Deserialize, Serialize};

use crate::db_types::{CancellationRequest, Order};

/// The result of a cancellation attempt. If no payment proof was ever submitted the order is cancelled on the spot
/// and `request` is `None`. Once a buyer has lodged a proof, cancellation needs admin review and `request` holds
/// the pending [`CancellationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub order: Order,
    pub request: Option<CancellationRequest>,
}

impl CancelOutcome {
    pub fn cancelled_immediately(&self) -> bool {
        self.request.is_none()
    }
}
