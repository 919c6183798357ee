//! Price formatting as rendered by the frontend

use crate::types::{MenuItem, OrderItem};

pub const BTC_SYMBOL: &str = "₿";

/// Three decimals followed by the bitcoin sign, e.g. `0.008 ₿`.
pub fn format_btc(amount: f64) -> String {
    format!("{} {}", format_amount(amount), BTC_SYMBOL)
}

/// Three decimals without the currency sign.
pub fn format_amount(amount: f64) -> String {
    format!("{:.3}", amount)
}

pub fn order_total(items: &[OrderItem]) -> f64 {
    items.iter().map(|i| i.price).sum()
}

pub fn menu_total(items: &[MenuItem]) -> f64 {
    items.iter().map(|i| i.price).sum()
}
