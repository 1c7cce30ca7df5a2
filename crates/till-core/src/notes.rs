//! # Notes Module
//!
//! The fixed set of note denominations the till handles, and `NoteCounts`,
//! a count per denomination used for tenders, change breakdowns, and stock.
//!
//! ## Why an Enum?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  An open-ended map of value → count would let "3" or "7" notes into   │
//! │  the till. The enum closes the set:                                    │
//! │                                                                         │
//! │     1   2   5   10   20   50   100   500                               │
//! │                                                                         │
//! │  so the change-making search space is bounded and exhaustible, and    │
//! │  unknown values are rejected at deserialization time.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the wire a `NoteCounts` is a JSON object keyed by the note value:
//! `{"10": 1, "2": 2}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Denomination
// =============================================================================

/// A physical note value, in whole currency units.
///
/// Variants are declared in ascending order so the derived `Ord` sorts by
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Denomination {
    One,
    Two,
    Five,
    Ten,
    Twenty,
    Fifty,
    Hundred,
    FiveHundred,
}

impl Denomination {
    /// Every denomination, smallest first.
    pub const ASCENDING: [Denomination; 8] = [
        Denomination::One,
        Denomination::Two,
        Denomination::Five,
        Denomination::Ten,
        Denomination::Twenty,
        Denomination::Fifty,
        Denomination::Hundred,
        Denomination::FiveHundred,
    ];

    /// Face value in whole currency units.
    #[inline]
    pub const fn value(&self) -> u32 {
        match self {
            Denomination::One => 1,
            Denomination::Two => 2,
            Denomination::Five => 5,
            Denomination::Ten => 10,
            Denomination::Twenty => 20,
            Denomination::Fifty => 50,
            Denomination::Hundred => 100,
            Denomination::FiveHundred => 500,
        }
    }

    /// Looks up a denomination by face value.
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ASCENDING.into_iter().find(|d| d.value() == value)
    }

    /// Every denomination, largest first.
    pub fn descending() -> impl Iterator<Item = Denomination> {
        Self::ASCENDING.into_iter().rev()
    }
}

impl TryFrom<u32> for Denomination {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Denomination::from_value(value).ok_or_else(|| ValidationError::NotAllowed {
            field: "denomination".to_string(),
            allowed: Denomination::ASCENDING
                .iter()
                .map(|d| d.value().to_string())
                .collect(),
        })
    }
}

impl From<Denomination> for u32 {
    fn from(d: Denomination) -> u32 {
        d.value()
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

// =============================================================================
// Note Counts
// =============================================================================

/// A count of notes per denomination.
///
/// Zero counts are kept as written so a stock snapshot can list every
/// denomination; use [`NoteCounts::without_zeros`] for breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteCounts(BTreeMap<Denomination, u32>);

impl NoteCounts {
    pub fn new() -> Self {
        NoteCounts(BTreeMap::new())
    }

    /// Builds counts from `(face value, count)` pairs.
    ///
    /// ```rust
    /// use till_core::notes::{Denomination, NoteCounts};
    ///
    /// let stock = NoteCounts::from_pairs([(10, 1), (2, 2)]).unwrap();
    /// assert_eq!(stock.count(Denomination::Two), 2);
    /// assert_eq!(stock.total_value(), 14);
    /// ```
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut counts = NoteCounts::new();
        for (value, count) in pairs {
            counts.checked_add(Denomination::try_from(value)?, count)?;
        }
        Ok(counts)
    }

    /// A zero count for every denomination.
    pub fn empty_till() -> Self {
        NoteCounts(Denomination::ASCENDING.iter().map(|d| (*d, 0)).collect())
    }

    #[inline]
    pub fn count(&self, denomination: Denomination) -> u32 {
        self.0.get(&denomination).copied().unwrap_or(0)
    }

    pub fn set(&mut self, denomination: Denomination, count: u32) {
        self.0.insert(denomination, count);
    }

    /// Adds `count` notes, saturating at `u32::MAX`.
    pub fn add(&mut self, denomination: Denomination, count: u32) {
        let held = self.0.entry(denomination).or_insert(0);
        *held = held.saturating_add(count);
    }

    /// Adds `count` notes, failing if the total no longer fits a `u32`.
    pub fn checked_add(
        &mut self,
        denomination: Denomination,
        count: u32,
    ) -> Result<(), ValidationError> {
        let total = self
            .count(denomination)
            .checked_add(count)
            .ok_or_else(|| count_overflow(denomination))?;
        self.0.insert(denomination, total);
        Ok(())
    }

    /// Adds every count in `other` to this one.
    ///
    /// Fails without changing `self` if any denomination would overflow.
    pub fn merge(&mut self, other: &NoteCounts) -> Result<(), ValidationError> {
        if let Some((d, _)) = other
            .iter()
            .find(|(d, c)| self.count(*d).checked_add(*c).is_none())
        {
            return Err(count_overflow(d));
        }

        for (d, c) in other.iter() {
            self.add(d, c);
        }
        Ok(())
    }

    /// Iterates `(denomination, count)` pairs, smallest denomination first.
    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        self.0.iter().map(|(d, c)| (*d, *c))
    }

    /// Sum of face values, in whole currency units.
    pub fn total_value(&self) -> u64 {
        self.iter().map(|(d, c)| d.value() as u64 * c as u64).sum()
    }

    /// Sum of face values as money.
    pub fn total_money(&self) -> Money {
        Money::from_major(self.total_value() as i64)
    }

    /// Number of physical notes.
    pub fn note_count(&self) -> u64 {
        self.iter().map(|(_, c)| c as u64).sum()
    }

    /// True when no notes are counted.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, c)| c == 0)
    }

    pub fn without_zeros(&self) -> NoteCounts {
        NoteCounts(self.0.iter().filter(|(_, c)| **c > 0).map(|(d, c)| (*d, *c)).collect())
    }
}

fn count_overflow(denomination: Denomination) -> ValidationError {
    ValidationError::OutOfRange {
        field: format!("count of {denomination} notes"),
        min: 0,
        max: u32::MAX as i64,
    }
}

impl FromIterator<(Denomination, u32)> for NoteCounts {
    fn from_iter<T: IntoIterator<Item = (Denomination, u32)>>(iter: T) -> Self {
        let mut counts = NoteCounts::new();
        for (d, c) in iter {
            counts.add(d, c);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending_is_sorted() {
        let values: Vec<u32> = Denomination::ASCENDING.iter().map(|d| d.value()).collect();
        assert_eq!(values, vec![1, 2, 5, 10, 20, 50, 100, 500]);
        assert!(Denomination::ASCENDING.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unknown_value_rejected() {
        assert!(Denomination::try_from(3).is_err());
        assert!(NoteCounts::from_pairs([(7, 1)]).is_err());
        assert_eq!(Denomination::try_from(500).unwrap(), Denomination::FiveHundred);
    }

    #[test]
    fn test_json_shape() {
        let counts = NoteCounts::from_pairs([(10, 1), (2, 2)]).unwrap();
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"2":2,"10":1}"#);

        let back: NoteCounts = serde_json::from_str(r#"{"500": 1, "1": 3}"#).unwrap();
        assert_eq!(back.count(Denomination::FiveHundred), 1);
        assert_eq!(back.total_value(), 503);

        assert!(serde_json::from_str::<NoteCounts>(r#"{"3": 1}"#).is_err());
    }

    #[test]
    fn test_totals_and_zeros() {
        let mut counts = NoteCounts::empty_till();
        assert!(counts.is_empty());
        counts.add(Denomination::Fifty, 2);
        counts.add(Denomination::One, 3);

        assert_eq!(counts.total_value(), 103);
        assert_eq!(counts.note_count(), 5);
        assert_eq!(counts.without_zeros().iter().count(), 2);
        assert_eq!(counts.total_money(), Money::from_major(103));
    }

    #[test]
    fn test_merge_rejects_count_overflow() {
        let mut till = NoteCounts::from_pairs([(1, 1), (10, 3)]).unwrap();
        let tender = NoteCounts::from_pairs([(10, 2), (1, u32::MAX)]).unwrap();

        let err = till.merge(&tender).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        // Nothing was merged, not even the 10s.
        assert_eq!(till, NoteCounts::from_pairs([(1, 1), (10, 3)]).unwrap());

        till.merge(&NoteCounts::from_pairs([(10, 2)]).unwrap()).unwrap();
        assert_eq!(till.count(Denomination::Ten), 5);
    }

    #[test]
    fn test_add_saturates_and_from_pairs_checks() {
        let mut counts = NoteCounts::from_pairs([(2, u32::MAX)]).unwrap();
        counts.add(Denomination::Two, 1);
        assert_eq!(counts.count(Denomination::Two), u32::MAX);

        assert!(NoteCounts::from_pairs([(2, u32::MAX), (2, 1)]).is_err());
    }
}
