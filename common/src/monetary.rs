//! Monetary helpers. Amounts and balances are plain `Decimal` values in a
//! single implicit currency.

use rust_decimal::Decimal;

/// Decimal places used when rendering or persisting amounts.
pub const CENT_PLACES: u32 = 2;

/// Check that an amount can be moved: strictly greater than zero.
pub fn is_positive_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO
}

/// Parse an amount from text, accepting surrounding whitespace and an
/// optional leading `$`.
pub fn parse_amount(value: &str) -> Result<Decimal, rust_decimal::Error> {
    let value = value.trim();
    let value = value.strip_prefix('$').unwrap_or(value);
    value.parse()
}

/// Round to whole cents (banker's rounding, as `Decimal::round_dp` does).
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp(CENT_PLACES)
}
