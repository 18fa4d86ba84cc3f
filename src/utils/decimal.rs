/// Money helpers.
///
/// All amounts are `BigDecimal` kept at two decimal places, rounded half up.
use bigdecimal::{num_bigint::BigInt, BigDecimal, RoundingMode};
use num_traits::Zero;
use std::str::FromStr;

/// Round to cents.
pub fn to_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Convert a JSON number using its shortest decimal form, so `0.1` stays `0.1`.
/// `None` for NaN/infinite input.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// Like [`decimal_from_f64`], rounded to cents.
pub fn money_from_f64(value: f64) -> Option<BigDecimal> {
    decimal_from_f64(value).map(|bd| to_money(&bd))
}

/// 2.5%
pub fn platform_fee_rate() -> BigDecimal {
    BigDecimal::new(BigInt::from(25), 3)
}

pub fn platform_fee(amount: &BigDecimal) -> BigDecimal {
    to_money(&(amount * platform_fee_rate()))
}

pub fn net_payout(amount: &BigDecimal, fee: &BigDecimal) -> BigDecimal {
    to_money(&(amount - fee))
}

pub fn line_amount(quantity: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    to_money(&(quantity * rate))
}

pub fn minutes_to_hours(minutes: i32) -> BigDecimal {
    to_money(&(BigDecimal::from(minutes) / BigDecimal::from(60)))
}

pub fn is_positive(value: &BigDecimal) -> bool {
    value > &BigDecimal::zero()
}

pub fn is_negative(value: &BigDecimal) -> bool {
    value < &BigDecimal::zero()
}
