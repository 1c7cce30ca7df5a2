//! # Stock Module
//!
//! Note movements against the till.
//!
//! A settlement moves notes both ways: the customer's tender comes in, the
//! change goes out. A `StockMovement` applies both halves or neither.
//!
//! ```text
//! till {10:1, 2:10}  +  tendered {100:2, 50:1}  −  change {10:1, 2:2}
//!                    =  {100:2, 50:1, 10:0, 2:8}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::notes::{Denomination, NoteCounts};

/// Notes entering and leaving the till in one settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub incoming: NoteCounts,
    pub outgoing: NoteCounts,
}

impl StockMovement {
    pub fn new(incoming: NoteCounts, outgoing: NoteCounts) -> Self {
        StockMovement { incoming, outgoing }
    }

    /// Per-denomination net change, largest note first, zero nets omitted.
    pub fn net(&self) -> Vec<(Denomination, i64)> {
        Denomination::descending()
            .map(|d| (d, self.incoming.count(d) as i64 - self.outgoing.count(d) as i64))
            .filter(|(_, delta)| *delta != 0)
            .collect()
    }

    /// Checks that `stock` can cover the outgoing notes once the incoming
    /// ones are in, and that no count ends above `u32::MAX`.
    pub fn check(&self, stock: &NoteCounts) -> CoreResult<()> {
        for d in Denomination::descending().filter(|d| self.touches(*d)) {
            let requested = self.outgoing.count(d);
            let available = stock.count(d) as u64 + self.incoming.count(d) as u64;
            if requested as u64 > available {
                return Err(CoreError::InsufficientStock {
                    denomination: d.value(),
                    available: available as u32,
                    requested,
                });
            }
            if available - requested as u64 > u32::MAX as u64 {
                return Err(ValidationError::OutOfRange {
                    field: format!("count of {d} notes"),
                    min: 0,
                    max: u32::MAX as i64,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Applies the movement to `stock`. On error `stock` is untouched.
    pub fn apply_to(&self, stock: &mut NoteCounts) -> CoreResult<()> {
        self.check(stock)?;

        for d in Denomination::ASCENDING.into_iter().filter(|d| self.touches(*d)) {
            // check() bounds the result to 0..=u32::MAX
            let count = stock.count(d) as u64 + self.incoming.count(d) as u64
                - self.outgoing.count(d) as u64;
            stock.set(d, count as u32);
        }
        Ok(())
    }

    fn touches(&self, d: Denomination) -> bool {
        self.incoming.count(d) > 0 || self.outgoing.count(d) > 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
