//! 金额换算
//!
//! 数据库存整数分（BIGINT），对外使用两位小数的 `Decimal`。

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::errors::{FundlinkerError, Result};

pub const SCALE: u32 = 2;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// 转换为整数分；超过两位小数的金额直接拒绝，不做舍入
pub fn to_cents(amount: Decimal) -> Result<i64> {
    let scaled = amount * Decimal::ONE_HUNDRED;
    if scaled.fract() != Decimal::ZERO {
        return Err(FundlinkerError::validation(format!(
            "amount {} has more than {} decimal places",
            amount, SCALE
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| FundlinkerError::validation(format!("amount {} is out of range", amount)))
}

/// 固定两位小数，如 `30.00`
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(SCALE);
    rounded.rescale(SCALE);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cents_conversion() {
        assert_eq!(from_cents(3000), Decimal::from_str("30.00").unwrap());
        assert_eq!(to_cents(Decimal::from_str("12.5").unwrap()).unwrap(), 1250);
        assert_eq!(to_cents(Decimal::from_str("0.10").unwrap()).unwrap(), 10);
    }

    #[test]
    fn test_rejects_sub_cent_amounts() {
        assert!(to_cents(Decimal::from_str("1.005").unwrap()).is_err());
    }

    #[test]
    fn test_no_float_drift() {
        let a = Decimal::from_str("0.1").unwrap();
        let b = Decimal::from_str("0.2").unwrap();
        assert_eq!(format_amount(a + b), "0.30");
        assert_eq!(format_amount(from_cents(5)), "0.05");
        assert_eq!(format_amount(Decimal::from(7)), "7.00");
    }
}
