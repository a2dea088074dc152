//! Fixed-scale amount rendering.

use alloy_primitives::U256;

/// Renders a raw integer amount with `decimals` implied fractional digits.
///
/// Trailing fractional zeros are trimmed but at least one fractional digit
/// is kept, so `2 * 10^18` at 18 decimals renders as `"2.0"`.
#[must_use]
pub fn format_units(value: U256, decimals: u32) -> String {
    let digits = value.to_string();
    let scale = decimals as usize;

    let (whole, fraction) = if digits.len() > scale {
        let split = digits.len() - scale;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = scale))
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, fraction)
    }
}
