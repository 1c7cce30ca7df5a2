//! # Change Module
//!
//! Bounded change-making: hand back an exact amount using the fewest notes
//! the till actually holds.
//!
//! ## Search Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  make_change(target, stock)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Greedy, largest note first, bounded by stock                          │
//! │       │                                                                 │
//! │       ├── no denomination ran short → done (optimal, see below)        │
//! │       │                                                                 │
//! │       ├── target > value of whole till → infeasible                    │
//! │       ├── target > EXACT_SEARCH_LIMIT  → infeasible                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Bounded DP over 0..=target, one layer per denomination                │
//! │       │                                                                 │
//! │       ├── best[target] reachable → reconstruct, largest note first     │
//! │       └── unreachable            → infeasible                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The note set {1, 2, 5, 10, 20, 50, 100, 500} is canonical: with unlimited
//! notes, greedy is optimal. A bounded greedy that never wanted more of a
//! note than the till held *is* the unbounded greedy, so it is also the
//! bounded optimum. Only when stock clamps a denomination can greedy go
//! wrong:
//!
//! ```text
//! target 14, stock {5:2, 2:2}, no 10s
//!   greedy: 5,5 → 4 left → 2,2 → 0        (happens to work)
//! target 6, stock {5:1, 2:3}
//!   greedy: 5 → 1 left → no 1s            ✗
//!   exact:  2,2,2                          ✓
//! ```
//!
//! ## Tie-break
//! Among plans with the fewest notes, the one with more of the larger notes
//! wins (compared from 500 down). The result is a pure function of
//! `(target, stock)`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::notes::{Denomination, NoteCounts};

/// Targets above this many currency units that greedy cannot settle are
/// reported infeasible instead of running the table search.
///
/// The search keeps one `u32` per amount for each denomination in stock, so
/// this caps it near 7 MB. Commits run it under the commit lock.
pub const EXACT_SEARCH_LIMIT: u64 = 200_000;

const UNREACHABLE: u32 = u32::MAX;

// =============================================================================
// Change Plan
// =============================================================================

/// The outcome of a change-making attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePlan {
    /// Amount owed back, in whole currency units.
    pub balance_payable: u64,
    /// Notes to hand back. Empty unless `fully_satisfied`.
    pub breakdown: NoteCounts,
    pub fully_satisfied: bool,
    /// Amount left uncovered: 0 when satisfied, the whole balance otherwise.
    pub residual: u64,
    /// Largest-first partial the till could cover. Advisory only.
    pub best_partial: NoteCounts,
}

impl ChangePlan {
    fn satisfied(balance_payable: u64, breakdown: NoteCounts) -> Self {
        ChangePlan {
            balance_payable,
            best_partial: breakdown.clone(),
            breakdown,
            fully_satisfied: true,
            residual: 0,
        }
    }

    fn infeasible(balance_payable: u64, best_partial: NoteCounts) -> Self {
        ChangePlan {
            balance_payable,
            breakdown: NoteCounts::new(),
            fully_satisfied: false,
            residual: balance_payable,
            best_partial,
        }
    }
}

// =============================================================================
// Change Maker
// =============================================================================

/// Finds the minimal-note breakdown of `target` within `available`.
///
/// ```rust
/// use till_core::change::make_change;
/// use till_core::notes::NoteCounts;
///
/// let stock = NoteCounts::from_pairs([(10, 1), (5, 1), (2, 10), (1, 10)]).unwrap();
/// let plan = make_change(14, &stock);
/// assert!(plan.fully_satisfied);
/// assert_eq!(plan.breakdown, NoteCounts::from_pairs([(10, 1), (2, 2)]).unwrap());
/// ```
pub fn make_change(target: u64, available: &NoteCounts) -> ChangePlan {
    if target == 0 {
        return ChangePlan::satisfied(0, NoteCounts::new());
    }

    let greedy = bounded_greedy(target, available);
    if !greedy.clamped {
        return ChangePlan::satisfied(target, greedy.taken);
    }

    if target > available.total_value() || target > EXACT_SEARCH_LIMIT {
        return ChangePlan::infeasible(target, greedy.taken);
    }

    match exact_search(target, available) {
        Some(breakdown) => ChangePlan::satisfied(target, breakdown),
        None => ChangePlan::infeasible(target, greedy.taken),
    }
}

struct GreedyOutcome {
    taken: NoteCounts,
    /// True when some denomination was wanted beyond its stock.
    clamped: bool,
}

fn bounded_greedy(target: u64, available: &NoteCounts) -> GreedyOutcome {
    let mut remaining = target;
    let mut taken = NoteCounts::new();
    let mut clamped = false;

    for d in Denomination::descending() {
        let value = d.value() as u64;
        let wanted = remaining / value;
        let have = available.count(d) as u64;
        if wanted > have {
            clamped = true;
        }
        let take = wanted.min(have);
        if take > 0 {
            // take <= have, which came from a u32
            taken.set(d, take as u32);
            remaining -= take * value;
        }
    }

    GreedyOutcome { taken, clamped }
}

/// Bounded min-plus DP.
///
/// `layers[i][a]` is the fewest notes summing to exactly `a` using the `i`
/// smallest usable denominations. Each layer is one bounded-knapsack pass,
/// done per residue class with a monotone deque so a denomination costs
/// O(target) regardless of its stock. Denominations the till cannot use
/// would repeat the layer below, so they get none.
fn exact_search(target: u64, available: &NoteCounts) -> Option<NoteCounts> {
    let target = usize::try_from(target).ok()?;
    let caps: Vec<(Denomination, usize)> = Denomination::ASCENDING
        .iter()
        .map(|d| {
            let value = d.value() as usize;
            let cap = (available.count(*d) as usize).min(target / value);
            (*d, cap)
        })
        .filter(|(_, cap)| *cap > 0)
        .collect();

    let mut base = vec![UNREACHABLE; target + 1];
    base[0] = 0;
    let mut layers = Vec::with_capacity(caps.len() + 1);
    layers.push(base);
    for (d, cap) in &caps {
        let next = bounded_layer(&layers[layers.len() - 1], d.value() as usize, *cap);
        layers.push(next);
    }

    let mut need = layers[caps.len()][target];
    if need == UNREACHABLE {
        return None;
    }

    // Largest denomination first, taking the most notes that still allow
    // the optimum with the smaller ones.
    let mut amount = target;
    let mut breakdown = NoteCounts::new();
    for i in (0..caps.len()).rev() {
        let (d, cap) = caps[i];
        let value = d.value() as usize;
        let below = &layers[i];
        let most = cap.min(amount / value);
        let take = (0..=most).rev().find(|&k| {
            let rest = below[amount - k * value];
            rest != UNREACHABLE && rest as usize + k == need as usize
        })?;
        if take > 0 {
            breakdown.set(d, take as u32);
        }
        amount -= take * value;
        need -= take as u32;
    }

    (amount == 0 && need == 0).then_some(breakdown)
}

/// One bounded-knapsack layer: `next[a] = min over k in 0..=cap of
/// prev[a - k*value] + k`.
fn bounded_layer(prev: &[u32], value: usize, cap: usize) -> Vec<u32> {
    let len = prev.len();
    let mut next = vec![UNREACHABLE; len];
    let mut window: VecDeque<(usize, i64)> = VecDeque::new();

    for residue in 0..value.min(len) {
        window.clear();
        let mut step = 0usize;
        let mut amount = residue;
        while amount < len {
            if prev[amount] != UNREACHABLE {
                let key = prev[amount] as i64 - step as i64;
                while window.back().is_some_and(|&(_, k)| k >= key) {
                    window.pop_back();
                }
                window.push_back((step, key));
            }
            while window.front().is_some_and(|&(start, _)| start + cap < step) {
                window.pop_front();
            }
            if let Some(&(_, key)) = window.front() {
                next[amount] = (key + step as i64) as u32;
            }
            step += 1;
            amount += value;
        }
    }

    next
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn notes(pairs: &[(u32, u32)]) -> NoteCounts {
        NoteCounts::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_greedy_fast_path() {
        let plan = make_change(14, &notes(&[(10, 1), (5, 1), (2, 10), (1, 10)]));
        assert!(plan.fully_satisfied);
        assert_eq!(plan.residual, 0);
        assert_eq!(plan.breakdown, notes(&[(10, 1), (2, 2)]));
    }

    #[test]
    fn test_clamped_stock_uses_smaller_notes() {
        let plan = make_change(14, &notes(&[(10, 0), (5, 2), (2, 2)]));
        assert!(plan.fully_satisfied);
        assert_eq!(plan.breakdown, notes(&[(5, 2), (2, 2)]));
    }

    #[test]
    fn test_greedy_dead_end_recovered() {
        let plan = make_change(6, &notes(&[(5, 1), (2, 3)]));
        assert!(plan.fully_satisfied);
        assert_eq!(plan.breakdown, notes(&[(2, 3)]));
    }

    #[test]
    fn test_infeasible_reports_full_residual() {
        let plan = make_change(3, &notes(&[(2, 1), (1, 0)]));
        assert!(!plan.fully_satisfied);
        assert_eq!(plan.residual, 3);
        assert!(plan.breakdown.is_empty());
        assert_eq!(plan.best_partial, notes(&[(2, 1)]));
    }

    #[test]
    fn test_infeasible_within_total_value() {
        // Till holds 20 in value but only in 20s.
        let plan = make_change(10, &notes(&[(20, 1)]));
        assert!(!plan.fully_satisfied);
        assert_eq!(plan.residual, 10);
    }

    #[test]
    fn test_zero_target() {
        let plan = make_change(0, &NoteCounts::new());
        assert!(plan.fully_satisfied);
        assert!(plan.breakdown.is_empty());
    }

    #[test]
    fn test_tie_break_prefers_larger_notes() {
        // 40 from {20:2, 10:4}: 20+20 (2 notes) beats 10×4 or 20+10+10.
        let plan = make_change(40, &notes(&[(20, 2), (10, 4), (50, 0)]));
        assert_eq!(plan.breakdown, notes(&[(20, 2)]));

        // 60 from {50:1, 20:3, 5:2}: greedy takes the 50 and finds no 10.
        // 50+5+5 and 20×3 are both 3 notes; the 50 wins the tie.
        let plan = make_change(60, &notes(&[(50, 1), (20, 3), (5, 2)]));
        assert_eq!(plan.breakdown, notes(&[(50, 1), (5, 2)]));
    }

    #[test]
    fn test_large_clamped_target_searched_exactly() {
        // Greedy takes the 5 and is left needing a 1.
        let plan = make_change(150_006, &notes(&[(500, 300), (5, 1), (2, 3)]));
        assert!(plan.fully_satisfied);
        assert_eq!(plan.breakdown, notes(&[(500, 300), (2, 3)]));
    }

    #[test]
    fn test_clamped_target_above_search_limit_is_infeasible() {
        let stock = notes(&[(500, 4000), (1, 1)]);
        let plan = make_change(2_000_006, &stock);
        assert!(!plan.fully_satisfied);
        assert_eq!(plan.residual, 2_000_006);
        assert_eq!(plan.best_partial, notes(&[(500, 4000), (1, 1)]));

        // Solvable, but greedy clamps and the target is past the limit.
        let stock = notes(&[(500, 401), (5, 1), (2, 3)]);
        let target = 401 * 500 + 6;
        assert!(target > EXACT_SEARCH_LIMIT);
        let plan = make_change(target, &stock);
        assert!(!plan.fully_satisfied);
        assert_eq!(plan.residual, target);
    }

    #[test]
    fn test_deterministic() {
        let stock = notes(&[(50, 1), (20, 3), (10, 2), (5, 5), (2, 7), (1, 1)]);
        assert_eq!(make_change(83, &stock), make_change(83, &stock));
    }

    // -------------------------------------------------------------------------
    // Properties against an exhaustive search over small tills
    // -------------------------------------------------------------------------

    /// Every sub-multiset of the till, best by (fewest notes, then more of
    /// the larger notes).
    fn brute_force(target: u64, stock: &[u32; 8]) -> Option<[u32; 8]> {
        let values: Vec<u64> = Denomination::ASCENDING.iter().map(|d| d.value() as u64).collect();
        let mut best: Option<(u32, [u32; 8])> = None;
        let mut counts = [0u32; 8];

        loop {
            let total: u64 = counts.iter().zip(&values).map(|(c, v)| *c as u64 * v).sum();
            if total == target {
                let n: u32 = counts.iter().sum();
                let better = match &best {
                    None => true,
                    Some((bn, bc)) => {
                        n < *bn
                            || (n == *bn && counts.iter().rev().cmp(bc.iter().rev()).is_gt())
                    }
                };
                if better {
                    best = Some((n, counts));
                }
            }

            // odometer over 0..=stock[i]
            let mut i = 0;
            loop {
                if i == 8 {
                    return best.map(|(_, c)| c);
                }
                if counts[i] < stock[i] {
                    counts[i] += 1;
                    break;
                }
                counts[i] = 0;
                i += 1;
            }
        }
    }

    fn to_counts(raw: &[u32; 8]) -> NoteCounts {
        Denomination::ASCENDING
            .iter()
            .zip(raw)
            .filter(|(_, c)| **c > 0)
            .map(|(d, c)| (*d, *c))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_matches_exhaustive_search(
            raw in prop::array::uniform8(0u32..=2),
            target in 0u64..=700,
        ) {
            let stock = to_counts(&raw);
            let plan = make_change(target, &stock);

            match brute_force(target, &raw) {
                Some(best) => {
                    prop_assert!(plan.fully_satisfied);
                    prop_assert_eq!(plan.breakdown, to_counts(&best));
                }
                None => {
                    prop_assert!(!plan.fully_satisfied);
                    prop_assert_eq!(plan.residual, target);
                }
            }
        }

        #[test]
        fn prop_breakdown_is_exact_and_within_stock(
            raw in prop::array::uniform8(0u32..=40),
            target in 0u64..=5_000,
        ) {
            let stock = to_counts(&raw);
            let plan = make_change(target, &stock);

            if plan.fully_satisfied {
                prop_assert_eq!(plan.breakdown.total_value(), target);
                for (d, c) in plan.breakdown.iter() {
                    prop_assert!(c <= stock.count(d));
                }
            } else {
                prop_assert!(plan.breakdown.is_empty());
                prop_assert_eq!(plan.residual, target);
                prop_assert!(plan.best_partial.total_value() < target);
            }
        }
    }
}
