//! Catalog listings as the client sees them.

use crate::ListingId;
use serde::{Deserialize, Serialize};

/// Display placeholder for listings without a usable price.
pub const PRICE_UNAVAILABLE: &str = "N/A";

fn default_frequency() -> String {
    "night".to_string()
}

/// A catalog listing that can be favorited.
///
/// Properties are immutable from the client's point of view; they always come
/// from the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Stable catalog id
    pub id: ListingId,
    pub title: String,
    pub location: String,
    /// Display price, e.g. `"₹ 1,50,000"`
    pub price: String,
    /// Image URI
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baths: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqft: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Billing period shown next to the price
    #[serde(default = "default_frequency")]
    pub frequency: String,
}

impl Property {
    /// Create a property with the required catalog fields and no extras.
    pub fn new(
        id: impl Into<ListingId>,
        title: impl Into<String>,
        location: impl Into<String>,
        price: Option<i64>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            location: location.into(),
            price: display_price(price),
            image: image.into(),
            rating: None,
            beds: None,
            baths: None,
            sqft: None,
            category: None,
            frequency: default_frequency(),
        }
    }

    /// Nightly price recovered from the display string, 0 when it has no digits.
    pub fn nightly_price(&self) -> u64 {
        let digits: String = self.price.chars().filter(char::is_ascii_digit).collect();
        digits.parse().unwrap_or(0)
    }
}

/// Render a catalog price for display, `"N/A"` when absent or negative.
pub fn display_price(price: Option<i64>) -> String {
    match price {
        Some(amount) if amount >= 0 => format!("₹ {}", format_inr(amount as u64)),
        _ => PRICE_UNAVAILABLE.to_string(),
    }
}

/// Format an amount with Indian digit grouping (`1,50,000`).
pub fn format_inr(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
