use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db::traits::QrisManagement,
    db_types::{NewQrisSettings, NewQrisTransaction, OrderId, QrisSettings, QrisTransaction},
    qris::{extract_merchant_info, generate_dynamic_qris, validate_qris_format},
    rpe_api::errors::QrisApiError,
};
use rpg_common::Rupiah;

/// How long a generated dynamic payload stays valid.
pub const QRIS_VALIDITY_MINUTES: i64 = 30;

/// Manages the merchant's QRIS configuration and generates per-payment dynamic payloads from it.
pub struct QrisApi<B> {
    db: B,
}

impl<B> Debug for QrisApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QrisApi")
    }
}

impl<B> QrisApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> QrisApi<B>
where B: QrisManagement
{
    /// Validates and activates a new static QRIS payload. When the merchant name or city is not supplied, it is
    /// pulled out of the payload itself (tags 59 and 60).
    pub async fn upload_settings(
        &self,
        qris_data: String,
        merchant_name: Option<String>,
        merchant_city: Option<String>,
        created_by: &str,
    ) -> Result<QrisSettings, QrisApiError> {
        validate_qris_format(&qris_data)?;
        let extracted = extract_merchant_info(&qris_data);
        let merchant_name = merchant_name.or(extracted.merchant_name).unwrap_or_else(|| "Rekber".to_string());
        let merchant_city = merchant_city.or(extracted.merchant_city).unwrap_or_else(|| "Jakarta".to_string());
        let settings = self
            .db
            .activate_qris_settings(NewQrisSettings {
                qris_data,
                merchant_name,
                merchant_city,
                created_by: created_by.to_string(),
            })
            .await?;
        info!("🔳️ QRIS configuration [{}] for {} activated by {created_by}", settings.id, settings.merchant_name);
        Ok(settings)
    }

    pub async fn active_settings(&self) -> Result<Option<QrisSettings>, QrisApiError> {
        self.db.fetch_active_qris_settings().await
    }

    pub async fn delete_settings(&self, id: &str) -> Result<(), QrisApiError> {
        self.db.delete_qris_settings(id).await?;
        info!("🔳️ QRIS configuration [{id}] deleted");
        Ok(())
    }

    /// Generates a dynamic QRIS payload for `amount` from the active configuration and records the transaction.
    pub async fn generate_payment(
        &self,
        user_id: &str,
        amount: Rupiah,
        order_id: Option<OrderId>,
    ) -> Result<(QrisTransaction, QrisSettings), QrisApiError> {
        let settings = self.db.fetch_active_qris_settings().await?.ok_or(QrisApiError::NoActiveQris)?;
        let generated_qris = generate_dynamic_qris(&settings.qris_data, amount)?;
        let expires_at = Utc::now() + Duration::minutes(QRIS_VALIDITY_MINUTES);
        let tx = self
            .db
            .insert_qris_transaction(NewQrisTransaction {
                user_id: user_id.to_string(),
                order_id,
                amount,
                generated_qris,
                expires_at,
            })
            .await?;
        debug!("🔳️ Generated dynamic QRIS [{}] for {amount} (user {user_id})", tx.id);
        Ok((tx, settings))
    }

    /// Fetches a previously generated transaction. Users only ever see their own transactions; anyone else gets the
    /// same answer as for a transaction that does not exist.
    pub async fn fetch_transaction(&self, id: &str, user_id: &str) -> Result<QrisTransaction, QrisApiError> {
        match self.db.fetch_qris_transaction(id).await? {
            Some(tx) if tx.user_id == user_id => Ok(tx),
            _ => Err(QrisApiError::TransactionNotFound(id.to_string())),
        }
    }
}
