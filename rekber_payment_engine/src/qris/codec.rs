use rpg_common::Rupiah;

use crate::qris::{errors::QrisError, tlv};

/// CRC-16/CCITT-FALSE over the payload bytes: init 0xFFFF, polynomial 0x1021, no reflection, no final XOR.
/// The result is rendered as four uppercase hex characters, which is how QRIS embeds it in tag 63.
pub fn crc16_ccitt_false(payload: &str) -> String {
    let mut crc: u16 = 0xFFFF;
    for byte in payload.bytes() {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    format!("{crc:04X}")
}

/// Basic sanity checks on a merchant-supplied static payload. Real QRIS codes run 200+ characters, so anything
/// under 100 is rejected outright.
pub fn validate_qris_format(payload: &str) -> Result<(), QrisError> {
    if payload.is_empty() {
        return Err(QrisError::EmptyPayload);
    }
    if payload.len() < 100 {
        return Err(QrisError::InvalidFormat("payload is too short".into()));
    }
    if !payload.starts_with("00020101") {
        return Err(QrisError::InvalidFormat("payload does not start with the EMVCo version header".into()));
    }
    if !payload.contains("5802ID") {
        return Err(QrisError::CountryCodeNotFound);
    }
    Ok(())
}

/// Converts a static QRIS payload into a dynamic one carrying `amount`.
///
/// The old checksum is dropped, the point-of-initiation tag is flipped from `11` to `12`, the amount field
/// (`54` + 2-digit length + digits) is inserted immediately before the country code, and a fresh checksum is
/// appended. A payload that is already dynamic (or malformed enough that the initiation tag is missing) is
/// rejected rather than passed through with a stale indicator.
pub fn generate_dynamic_qris(static_qris: &str, amount: Rupiah) -> Result<String, QrisError> {
    if !amount.is_positive() {
        return Err(QrisError::InvalidAmount);
    }
    validate_qris_format(static_qris)?;
    let without_crc = static_qris
        .get(..static_qris.len() - 4)
        .ok_or_else(|| QrisError::InvalidFormat("payload is not ASCII".into()))?;
    if !without_crc.contains("010211") {
        return Err(QrisError::NotStatic);
    }
    let dynamic = without_crc.replacen("010211", "010212", 1);
    let (head, tail) = dynamic.split_once("5802ID").ok_or(QrisError::CountryCodeNotFound)?;
    if tail.contains("5802ID") {
        return Err(QrisError::InvalidFormat("country code appears more than once".into()));
    }
    let digits = amount.digits();
    let payload = format!("{head}54{:02}{digits}5802ID{tail}", digits.len());
    let crc = crc16_ccitt_false(&payload);
    Ok(format!("{payload}{crc}"))
}

//--------------------------------------    MerchantInfo    ----------------------------------------------------------
/// Merchant name (tag 59) and city (tag 60) pulled from a QRIS payload. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantInfo {
    pub merchant_name: Option<String>,
    pub merchant_city: Option<String>,
}

pub fn extract_merchant_info(payload: &str) -> MerchantInfo {
    MerchantInfo {
        merchant_name: tlv::top_level_value(payload, "59").map(String::from),
        merchant_city: tlv::top_level_value(payload, "60").map(String::from),
    }
}
