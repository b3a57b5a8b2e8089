//! Dynamic QRIS generation.
//!
//! A merchant's static QRIS payload can be turned into a single-use dynamic payload by switching the
//! point-of-initiation tag from `11` to `12` and injecting the transaction amount (tag `54`) ahead of the
//! country-code tag (`5802ID`). The trailing four characters of every payload are a CRC-16/CCITT-FALSE checksum
//! over the rest of the string, which has to be recomputed after the edit.

mod codec;
mod errors;
mod tlv;

pub use codec::{crc16_ccitt_false, extract_merchant_info, generate_dynamic_qris, validate_qris_format, MerchantInfo};
pub use errors::QrisError;
