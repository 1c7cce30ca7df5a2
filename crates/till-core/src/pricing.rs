//! # Pricing Module
//!
//! Line pricing, totals aggregation, and the floor rounding policy.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Settlement Pricing                                 │
//! │                                                                         │
//! │  CartLine + CatalogEntry                                               │
//! │       │                                                                 │
//! │       ▼  settle_line                                                    │
//! │  subtotal    = unit_price × quantity                                   │
//! │  tax_payable = tax(subtotal)          (half-up to the minor unit)      │
//! │  total_price = subtotal + tax_payable                                  │
//! │       │                                                                 │
//! │       ▼  aggregate_totals                                               │
//! │  total_without_tax = Σ subtotal                                        │
//! │  total_tax         = Σ tax_payable                                     │
//! │  net_price         = total_without_tax + total_tax                     │
//! │       │                                                                 │
//! │       ▼  RoundingPolicy::Floor                                          │
//! │  rounded_net_price = floor(net_price)   → what the customer pays       │
//! │  rounding_remainder = net - rounded     → kept, never charged          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step is pure integer arithmetic, so totals are independent of line
//! order.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CartLine, CatalogEntry, InvoiceTotals, SettledLine};
use crate::validation::validate_quantity;

// =============================================================================
// Line Item Calculator
// =============================================================================

/// Prices and taxes one cart line against its catalog entry.
///
/// Tax applies to the line subtotal, not per unit, so a 3 × 3.33 line at
/// 12.5% is taxed once on 9.99.
///
/// ```rust
/// use till_core::money::Money;
/// use till_core::pricing::settle_line;
/// use till_core::types::{CartLine, CatalogEntry, TaxRate};
///
/// let entry = CatalogEntry {
///     product_id: "P1".into(),
///     name: "Notebook".into(),
///     unit_price: Money::from_major(100),
///     tax_rate: TaxRate::from_whole_percent(18),
/// };
/// let line = settle_line(&CartLine::new("P1", 2), &entry).unwrap();
/// assert_eq!(line.total_price, Money::from_major(236));
/// ```
pub fn settle_line(line: &CartLine, entry: &CatalogEntry) -> CoreResult<SettledLine> {
    if line.product_id != entry.product_id {
        return Err(CoreError::UnknownProduct(line.product_id.clone()));
    }

    validate_quantity(line.quantity).map_err(|_| CoreError::InvalidQuantity {
        product_id: line.product_id.clone(),
        quantity: line.quantity,
    })?;

    let subtotal = entry.unit_price.multiply_quantity(line.quantity);
    let tax_payable = subtotal.calculate_tax(entry.tax_rate);

    Ok(SettledLine {
        product_id: entry.product_id.clone(),
        product_name: entry.name.clone(),
        unit_price: entry.unit_price,
        quantity: line.quantity,
        subtotal,
        tax_rate: entry.tax_rate,
        tax_payable,
        total_price: subtotal + tax_payable,
    })
}

// =============================================================================
// Totals Aggregator
// =============================================================================

/// Sums settled lines and applies the floor rounding policy.
pub fn aggregate_totals(lines: &[SettledLine]) -> InvoiceTotals {
    aggregate_totals_with(lines, RoundingPolicy::Floor)
}

/// Sums settled lines and applies `policy` to the net price.
pub fn aggregate_totals_with(lines: &[SettledLine], policy: RoundingPolicy) -> InvoiceTotals {
    let total_without_tax: Money = lines.iter().map(|l| l.subtotal).sum();
    let total_tax: Money = lines.iter().map(|l| l.tax_payable).sum();
    let net_price = total_without_tax + total_tax;
    let (rounded_net_price, rounding_remainder) = policy.apply(net_price);

    InvoiceTotals {
        total_without_tax,
        total_tax,
        net_price,
        rounded_net_price,
        rounding_remainder,
    }
}

// =============================================================================
// Rounding Policy
// =============================================================================

/// How a fractional net price becomes a payable amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Drop the fraction: the customer never pays for a partial unit.
    #[default]
    Floor,
}

impl RoundingPolicy {
    /// Returns `(payable, remainder)` with `payable + remainder == net`.
    pub fn apply(&self, net: Money) -> (Money, Money) {
        match self {
            RoundingPolicy::Floor => net.floor_to_major(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaxRate;
    use proptest::prelude::*;

    fn entry(id: &str, price_minor: i64, bps: u32) -> CatalogEntry {
        CatalogEntry {
            product_id: id.to_string(),
            name: format!("Product {id}"),
            unit_price: Money::from_minor(price_minor),
            tax_rate: TaxRate::from_bps(bps),
        }
    }

    #[test]
    fn test_settle_line_basic() {
        let line = settle_line(&CartLine::new("P1", 2), &entry("P1", 10000, 1800)).unwrap();

        assert_eq!(line.subtotal, Money::from_major(200));
        assert_eq!(line.tax_payable, Money::from_major(36));
        assert_eq!(line.total_price, Money::from_major(236));
        assert_eq!(line.product_name, "Product P1");
    }

    #[test]
    fn test_tax_on_subtotal_not_per_unit() {
        // Per unit: 3 × round(3.33 × 12.5%) = 3 × 0.42 = 1.26
        // On subtotal: round(9.99 × 12.5%) = round(1.24875) = 1.25
        let line = settle_line(&CartLine::new("P1", 3), &entry("P1", 333, 1250)).unwrap();
        assert_eq!(line.tax_payable.minor(), 125);
    }

    #[test]
    fn test_invalid_quantity() {
        let result = settle_line(&CartLine::new("P1", 0), &entry("P1", 100, 0));
        assert!(matches!(
            result,
            Err(CoreError::InvalidQuantity { quantity: 0, .. })
        ));

        let result = settle_line(&CartLine::new("P1", -3), &entry("P1", 100, 0));
        assert!(matches!(result, Err(CoreError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_mismatched_entry_is_unknown_product() {
        let result = settle_line(&CartLine::new("P2", 1), &entry("P1", 100, 0));
        assert!(matches!(result, Err(CoreError::UnknownProduct(id)) if id == "P2"));
    }

    #[test]
    fn test_aggregate_and_floor() {
        let lines = vec![
            settle_line(&CartLine::new("P1", 1), &entry("P1", 1050, 0)).unwrap(),
            settle_line(&CartLine::new("P2", 1), &entry("P2", 1025, 0)).unwrap(),
        ];
        let totals = aggregate_totals(&lines);

        assert_eq!(totals.net_price.minor(), 2075);
        assert_eq!(totals.rounded_net_price.minor(), 2000);
        assert_eq!(totals.rounding_remainder.minor(), 75);
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let totals = aggregate_totals(&[]);
        assert_eq!(totals, InvoiceTotals::default());
    }

    fn arb_line() -> impl Strategy<Value = SettledLine> {
        (0i64..1_000_000, 1i64..=999, 0u32..=10000).prop_map(|(price, qty, bps)| {
            settle_line(&CartLine::new("P", qty), &entry("P", price, bps)).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_totals_are_exact_and_floored(lines in prop::collection::vec(arb_line(), 0..40)) {
            let totals = aggregate_totals(&lines);
            let sum_of_lines: Money = lines.iter().map(|l| l.total_price).sum();

            prop_assert_eq!(sum_of_lines, totals.total_without_tax + totals.total_tax);
            prop_assert!(totals.rounded_net_price <= totals.net_price);
            prop_assert!(totals.rounding_remainder.minor() >= 0);
            prop_assert!(totals.rounding_remainder.minor() < 100);
            prop_assert_eq!(totals.rounded_net_price.minor_part(), 0);
            prop_assert_eq!(totals.rounded_net_price + totals.rounding_remainder, totals.net_price);
        }

        #[test]
        fn prop_totals_are_order_independent(mut lines in prop::collection::vec(arb_line(), 0..20)) {
            let forward = aggregate_totals(&lines);
            lines.reverse();
            prop_assert_eq!(forward, aggregate_totals(&lines));
        }
    }
}
