use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrisError {
    #[error("QRIS payload is empty")]
    EmptyPayload,
    #[error("Invalid QRIS format: {0}")]
    InvalidFormat(String),
    #[error("Amount must be a positive whole number of Rupiah")]
    InvalidAmount,
    #[error("QRIS payload is not a static code (tag 010211 not found)")]
    NotStatic,
    #[error("Invalid QRIS format: country code not found")]
    CountryCodeNotFound,
}
