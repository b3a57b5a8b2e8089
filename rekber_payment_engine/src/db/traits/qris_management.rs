use crate::{
    db_types::{NewQrisSettings, NewQrisTransaction, QrisSettings, QrisTransaction},
    rpe_api::errors::QrisApiError,
};

/// Storage for the merchant's QRIS configuration and generated dynamic payloads.
#[allow(async_fn_in_trait)]
pub trait QrisManagement {
    /// Stores a new QRIS configuration and makes it the active one. At most one configuration is active at a time;
    /// any previously active row is deactivated in the same transaction.
    async fn activate_qris_settings(&self, settings: NewQrisSettings) -> Result<QrisSettings, QrisApiError>;

    async fn fetch_active_qris_settings(&self) -> Result<Option<QrisSettings>, QrisApiError>;

    async fn delete_qris_settings(&self, id: &str) -> Result<(), QrisApiError>;

    /// Records a generated dynamic payload, for audit and for re-display while it is still valid.
    async fn insert_qris_transaction(&self, tx: NewQrisTransaction) -> Result<QrisTransaction, QrisApiError>;

    async fn fetch_qris_transaction(&self, id: &str) -> Result<Option<QrisTransaction>, QrisApiError>;
}
