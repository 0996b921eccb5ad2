// src/utils/precision.rs
use rust_decimal::Decimal;

/// Rounds a quantity DOWN to the nearest multiple of `step_size`.
/// Example: amount=10.999, step=0.01 -> 10.99
pub fn normalize_quantity(amount: Decimal, step_size: Decimal) -> Decimal {
    if step_size <= Decimal::ZERO {
        return amount;
    }
    ((amount / step_size).floor() * step_size).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn floors_to_step() {
        assert_eq!(normalize_quantity(d("9.990009990"), d("0.001")), d("9.99"));
        assert_eq!(normalize_quantity(d("10.999"), d("1")), d("10"));
    }

    #[test]
    fn zero_step_passes_through() {
        assert_eq!(normalize_quantity(d("1.23456"), Decimal::ZERO), d("1.23456"));
    }
}
