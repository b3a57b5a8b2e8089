use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const IDR_CURRENCY_CODE: &str = "IDR";

//--------------------------------------      Rupiah       -----------------------------------------------------------
/// An amount of Indonesian Rupiah. QRIS and manual bank transfers deal in whole Rupiah, so there is no fractional
/// component to worry about.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupiah(i64);

impl Add for Rupiah {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Rupiah {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Rupiah {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in Rupiah: {0}")]
pub struct RupiahConversionError(String);

impl From<i64> for Rupiah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Rupiah {
    type Error = RupiahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupiahConversionError(format!("Value {} is too large to convert to Rupiah", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // id-ID convention: thousands separated with dots. Rp 1.250.000
        let negative = self.0 < 0;
        let mut digits = self.0.unsigned_abs().to_string();
        let mut groups = Vec::new();
        while digits.len() > 3 {
            groups.push(digits.split_off(digits.len() - 3));
        }
        groups.push(digits);
        groups.reverse();
        write!(f, "{}Rp {}", if negative { "-" } else { "" }, groups.join("."))
    }
}

impl Rupiah {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The digit string used when embedding an amount into a QRIS payload. Only meaningful for positive amounts.
    pub fn digits(&self) -> String {
        self.0.to_string()
    }

    /// The platform fee applied to legacy orders that only provide a total: 2.5%, rounded up.
    pub fn legacy_platform_fee(total: Rupiah) -> Rupiah {
        let fee = (total.0 * 25 + 999) / 1000;
        Rupiah(fee)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_uses_indonesian_grouping() {
        assert_eq!(Rupiah::from(0).to_string(), "Rp 0");
        assert_eq!(Rupiah::from(999).to_string(), "Rp 999");
        assert_eq!(Rupiah::from(50_000).to_string(), "Rp 50.000");
        assert_eq!(Rupiah::from(1_250_000).to_string(), "Rp 1.250.000");
        assert_eq!(Rupiah::from(-7_500).to_string(), "-Rp 7.500");
    }

    #[test]
    fn legacy_fee_rounds_up() {
        // 2.5% of 110_000 is 2_750 exactly
        assert_eq!(Rupiah::legacy_platform_fee(Rupiah::from(110_000)), Rupiah::from(2_750));
        // 2.5% of 10_001 is 250.025, which rounds up to 251
        assert_eq!(Rupiah::legacy_platform_fee(Rupiah::from(10_001)), Rupiah::from(251));
        // 2.5% of 100_000 is 2_500 exactly
        assert_eq!(Rupiah::legacy_platform_fee(Rupiah::from(100_000)), Rupiah::from(2_500));
    }

    #[test]
    fn arithmetic_and_sum() {
        let total: Rupiah = [Rupiah::from(100_000), Rupiah::from(10_000)].into_iter().sum();
        assert_eq!(total, Rupiah::from(110_000));
        assert_eq!(total - Rupiah::from(10_000), Rupiah::from(100_000));
    }
}
