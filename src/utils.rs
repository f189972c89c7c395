//! Small helpers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub fn sanitize_symbol(sym: &str) -> String {
    sym.trim().to_uppercase()
}

/// Round to cents.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Print first two chars, then mask the rest (for logs only).
pub fn mask_key(k: &str) -> String {
    let mut cs = k.chars();
    let a = cs.next().unwrap_or('*');
    let b = cs.next().unwrap_or('*');
    format!("{}{}****", a, b)
}

/// Decimal amounts into the f64 price domain; unrepresentable values become NaN.
pub fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(f64::NAN)
}
