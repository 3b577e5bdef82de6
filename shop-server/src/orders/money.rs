//! Money calculation utilities using rust_decimal for precision
//!
//! All amounts are VND held as `Decimal`. Values are rounded to two decimal
//! places (half-up) whenever a result is stored; the gateway receives
//! integer minor units (`amount × 100`).

use rust_decimal::prelude::*;
use shared::models::OrderItem;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed quantity per merged line
pub const MAX_QUANTITY: i64 = 9999;

/// Round to 2 decimal places, half-up
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum of `price × quantity` over all lines
pub fn subtotal(items: &[OrderItem]) -> Decimal {
    round_money(items.iter().map(OrderItem::line_total).sum())
}

/// `max(0, subtotal - discount)`
pub fn final_total(subtotal: Decimal, discount: Decimal) -> Decimal {
    round_money((subtotal - discount).max(Decimal::ZERO))
}

/// Convert an amount to gateway minor units (`amount × 100`)
///
/// Returns `None` if the value does not fit an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (round_money(amount) * Decimal::ONE_HUNDRED).round().to_i64()
}
