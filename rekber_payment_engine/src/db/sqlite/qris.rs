use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db_types::{NewQrisSettings, NewQrisTransaction, QrisSettings, QrisTransaction},
    rpe_api::errors::QrisApiError,
};

/// Inserts a new configuration as the active one, deactivating whatever was active before. Run inside a
/// transaction so there is never a moment with two active rows.
pub async fn activate_settings(
    settings: NewQrisSettings,
    conn: &mut SqliteConnection,
) -> Result<QrisSettings, QrisApiError> {
    sqlx::query("UPDATE qris_settings SET is_active = 0 WHERE is_active = 1").execute(&mut *conn).await?;
    let settings = sqlx::query_as(
        r#"
            INSERT INTO qris_settings (id, qris_data, merchant_name, merchant_city, created_by, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, 1, $6)
            RETURNING *;
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(settings.qris_data)
    .bind(settings.merchant_name)
    .bind(settings.merchant_city)
    .bind(settings.created_by)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(settings)
}

pub async fn fetch_active_settings(conn: &mut SqliteConnection) -> Result<Option<QrisSettings>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM qris_settings WHERE is_active = 1 ORDER BY created_at DESC LIMIT 1")
        .fetch_optional(conn)
        .await
}

pub async fn delete_settings(id: &str, conn: &mut SqliteConnection) -> Result<(), QrisApiError> {
    let result = sqlx::query("DELETE FROM qris_settings WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(QrisApiError::SettingsNotFound(id.to_string()));
    }
    Ok(())
}

pub async fn insert_transaction(
    tx: NewQrisTransaction,
    conn: &mut SqliteConnection,
) -> Result<QrisTransaction, QrisApiError> {
    let tx = sqlx::query_as(
        r#"
            INSERT INTO qris_transactions (id, user_id, order_id, amount, generated_qris, status, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            RETURNING *;
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(tx.user_id)
    .bind(tx.order_id)
    .bind(tx.amount)
    .bind(tx.generated_qris)
    .bind(tx.expires_at)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(tx)
}

pub async fn fetch_transaction(id: &str, conn: &mut SqliteConnection) -> Result<Option<QrisTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM qris_transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}
