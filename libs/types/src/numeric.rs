//! Fixed-point helpers for 18-decimal `U256` amounts
//!
//! Every vault balance, price, and ratio inside the simulator is a `U256`
//! holding an 18-decimal fixed-point number (`1e18` == 1.0). Conversions to
//! and from `rust_decimal::Decimal` exist for human-readable input and log
//! output only; ledger arithmetic never leaves `U256`.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::errors::NumericError;

/// Number of decimals used by the internal fixed-point representation.
pub const FP_DECIMALS: u8 = 18;

/// `1e18`, the fixed-point representation of 1.0.
pub const FP_ONE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// `10^exp` as a `U256`, or `None` when it does not fit.
pub fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(exp))
}

/// Rescale `value` from `decimals` to 18 decimals.
///
/// Scaling up is checked; scaling down truncates toward zero.
pub fn scale18(value: U256, decimals: u8) -> Result<U256, NumericError> {
    rescale(value, decimals, FP_DECIMALS)
}

/// Rescale an 18-decimal `value` down (or up) to `decimals`.
pub fn scale_n(value: U256, decimals: u8) -> Result<U256, NumericError> {
    rescale(value, FP_DECIMALS, decimals)
}

/// Rescale `value` between two decimal precisions.
pub fn rescale(value: U256, from: u8, to: u8) -> Result<U256, NumericError> {
    match from.cmp(&to) {
        std::cmp::Ordering::Equal => Ok(value),
        std::cmp::Ordering::Less => {
            let factor = pow10(u32::from(to - from)).ok_or(NumericError::Overflow)?;
            value.checked_mul(factor).ok_or(NumericError::Overflow)
        }
        std::cmp::Ordering::Greater => {
            let factor = pow10(u32::from(from - to)).ok_or(NumericError::Overflow)?;
            Ok(value / factor)
        }
    }
}

/// Scale by a signed power of ten (`SCALE_BY` semantics).
pub fn scale_by(value: U256, scale: i8) -> Result<U256, NumericError> {
    let factor = pow10(u32::from(scale.unsigned_abs())).ok_or(NumericError::Overflow)?;
    if scale >= 0 {
        value.checked_mul(factor).ok_or(NumericError::Overflow)
    } else {
        Ok(value / factor)
    }
}

/// `a * b / 1e18`, checked.
pub fn fp_mul(a: U256, b: U256) -> Result<U256, NumericError> {
    a.checked_mul(b)
        .map(|product| product / FP_ONE)
        .ok_or(NumericError::Overflow)
}

/// `a * 1e18 / b`, checked.
pub fn fp_div(a: U256, b: U256) -> Result<U256, NumericError> {
    if b.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    a.checked_mul(FP_ONE)
        .map(|scaled| scaled / b)
        .ok_or(NumericError::Overflow)
}

/// Render an 18-decimal value as a `Decimal`.
///
/// Returns `None` when the value exceeds the 96-bit mantissa of `Decimal`.
pub fn to_decimal(value: U256) -> Option<Decimal> {
    let raw = i128::try_from(u128::try_from(value).ok()?).ok()?;
    Decimal::try_from_i128_with_scale(raw, u32::from(FP_DECIMALS))
        .ok()
        .map(|d| d.normalize())
}

/// Parse a non-negative `Decimal` into an 18-decimal value.
///
/// Digits beyond the 18th decimal place are rounded half-up.
pub fn from_decimal(value: Decimal) -> Result<U256, NumericError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(NumericError::Negative(value.to_string()));
    }
    let rounded = value.round_dp_with_strategy(
        u32::from(FP_DECIMALS),
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    let mantissa = U256::from(rounded.mantissa().unsigned_abs());
    let missing = u32::from(FP_DECIMALS) - rounded.scale();
    let factor = pow10(missing).ok_or(NumericError::Overflow)?;
    mantissa.checked_mul(factor).ok_or(NumericError::Overflow)
}

/// Parse a decimal string (e.g. `"0.4"`) into an 18-decimal value.
pub fn parse_fp(text: &str) -> Result<U256, NumericError> {
    let value = Decimal::from_str_exact(text)
        .map_err(|_| NumericError::InvalidDecimal(text.to_string()))?;
    from_decimal(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp_one() {
        assert_eq!(FP_ONE, pow10(18).unwrap());
        assert!(pow10(78).is_none());
    }

    #[test]
    fn test_scale18_up_and_down() {
        // 1.5 USDC (6 decimals) -> 1.5e18
        let scaled = scale18(U256::from(1_500_000u64), 6).unwrap();
        assert_eq!(scaled, U256::from(1_500_000_000_000_000_000u64));

        // 24-decimal token truncates toward zero
        let scaled = scale18(U256::from(1_999_999u64), 24).unwrap();
        assert_eq!(scaled, U256::from(1u64));
    }

    #[test]
    fn test_scale18_overflow() {
        assert_eq!(scale18(U256::MAX, 0), Err(NumericError::Overflow));
    }

    #[test]
    fn test_scale_n_round_trip() {
        let value = U256::from(42u64) * FP_ONE;
        let six = scale_n(value, 6).unwrap();
        assert_eq!(six, U256::from(42_000_000u64));
        assert_eq!(scale18(six, 6).unwrap(), value);
    }

    #[test]
    fn test_scale_by_signed() {
        assert_eq!(scale_by(U256::from(5u64), 2).unwrap(), U256::from(500u64));
        assert_eq!(scale_by(U256::from(512u64), -2).unwrap(), U256::from(5u64));
    }

    #[test]
    fn test_fp_mul_div() {
        let two = U256::from(2u64) * FP_ONE;
        let half = FP_ONE / U256::from(2u64);
        assert_eq!(fp_mul(two, half).unwrap(), FP_ONE);
        assert_eq!(fp_div(FP_ONE, two).unwrap(), half);
        assert_eq!(fp_div(FP_ONE, U256::ZERO), Err(NumericError::DivisionByZero));
        assert_eq!(fp_mul(U256::MAX, two), Err(NumericError::Overflow));
    }

    #[test]
    fn test_decimal_conversions() {
        let value = parse_fp("0.4").unwrap();
        assert_eq!(value, U256::from(400_000_000_000_000_000u64));
        assert_eq!(to_decimal(value).unwrap(), Decimal::from_str_exact("0.4").unwrap());
        assert!(to_decimal(U256::MAX).is_none());
    }

    #[test]
    fn test_from_decimal_rejects_negative() {
        let result = from_decimal(Decimal::from(-1));
        assert!(matches!(result, Err(NumericError::Negative(_))));
    }

    #[test]
    fn test_from_decimal_rounds_excess_precision() {
        let value = Decimal::from_str_exact("0.0000000000000000015").unwrap();
        assert_eq!(from_decimal(value).unwrap(), U256::from(2u64));
    }
}
