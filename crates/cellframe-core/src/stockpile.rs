//! Per-cell resource ledger and the per-frame reserve shield.

use serde::{Deserialize, Serialize};

use crate::topology::NUM_DIRS;

/// Conserved resource balance of one cell.
///
/// Every core operation moves resource between stockpiles; only
/// [`Stockpile::external_growth`] creates or destroys it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stockpile {
    resource: f64,
    harvest_withdrawals: Vec<bool>,
    contributions: [f64; NUM_DIRS],
}

impl Stockpile {
    #[must_use]
    pub fn new(nlev: usize) -> Self {
        Self {
            resource: 0.0,
            harvest_withdrawals: vec![false; nlev],
            contributions: [0.0; NUM_DIRS],
        }
    }

    #[must_use]
    pub const fn query_resource(&self) -> f64 {
        self.resource
    }

    /// Debit up to `amount`, returning what was actually removed.
    pub fn request_resource_amt(&mut self, amount: f64) -> f64 {
        let wanted = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let taken = wanted.min(self.resource.max(0.0));
        self.resource -= taken;
        taken
    }

    /// Debit `fraction` of the current balance.
    pub fn request_resource_frac(&mut self, fraction: f64) -> f64 {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.request_resource_amt(self.resource.max(0.0) * fraction)
    }

    /// Credit resource moved here from a neighbour; `from_dir` only feeds instrumentation.
    pub fn external_contribute(&mut self, amount: f64, from_dir: usize) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        self.resource += amount;
        self.contributions[from_dir % NUM_DIRS] += amount;
    }

    /// Total ever contributed from `dir`.
    #[must_use]
    pub fn contributed_from(&self, dir: usize) -> f64 {
        self.contributions[dir % NUM_DIRS]
    }

    /// The one source and sink outside the conservation law (environmental growth or decay).
    pub fn external_growth(&mut self, amount: f64) {
        if amount.is_finite() {
            self.resource += amount;
        }
    }

    /// Debit on behalf of a level-scoped harvest, flagging the level for the harvest trigger.
    pub fn harvest_withdraw(&mut self, level: usize, amount: f64) -> f64 {
        if let Some(flag) = self.harvest_withdrawals.get_mut(level) {
            *flag = true;
        }
        self.request_resource_amt(amount)
    }

    #[must_use]
    pub fn query_harvest_withdrawals(&self, level: usize) -> bool {
        self.harvest_withdrawals.get(level).copied().unwrap_or(false)
    }

    pub fn reset_harvest_withdrawals(&mut self, level: usize) {
        if let Some(flag) = self.harvest_withdrawals.get_mut(level) {
            *flag = false;
        }
    }

    #[must_use]
    pub fn any_harvest_withdrawals(&self) -> bool {
        self.harvest_withdrawals.iter().any(|flag| *flag)
    }
}

/// Temporary shield added to the reproduction threshold, with a freshness countdown.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Reserve {
    amount: f64,
    fresh: u32,
}

impl Reserve {
    #[must_use]
    pub const fn amount(&self) -> f64 {
        self.amount
    }

    /// Qualifying ticks left before the reserve clears.
    #[must_use]
    pub const fn fresh(&self) -> u32 {
        self.fresh
    }

    pub fn set(&mut self, amount: f64, duration: u32) {
        self.amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        self.fresh = duration;
    }

    /// Shift the reserve by `delta` and restart its countdown.
    pub fn adjust(&mut self, delta: f64, duration: u32) {
        self.set(self.amount + delta, duration);
    }

    /// Called once per qualifying tick.
    pub fn try_clear(&mut self) {
        self.fresh = self.fresh.saturating_sub(1);
        if self.fresh == 0 {
            self.amount = 0.0;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_request_is_partially_fulfilled() {
        let mut stockpile = Stockpile::new(2);
        stockpile.external_growth(100.0);
        assert_eq!(stockpile.request_resource_amt(150.0), 100.0);
        assert_eq!(stockpile.query_resource(), 0.0);
        assert_eq!(stockpile.request_resource_amt(1.0), 0.0);
    }

    #[test]
    fn negative_balance_yields_nothing() {
        let mut stockpile = Stockpile::new(1);
        stockpile.external_growth(-3.0);
        assert_eq!(stockpile.request_resource_frac(0.5), 0.0);
        assert_eq!(stockpile.request_resource_amt(1.0), 0.0);
        assert_eq!(stockpile.query_resource(), -3.0);
    }

    #[test]
    fn fraction_requests_scale_with_balance() {
        let mut stockpile = Stockpile::new(1);
        stockpile.external_growth(50.0);
        assert_eq!(stockpile.request_resource_frac(0.5), 25.0);
        assert_eq!(stockpile.request_resource_frac(2.0), 25.0);
        assert_eq!(stockpile.query_resource(), 0.0);
    }

    #[test]
    fn contributions_are_tallied_by_direction() {
        let mut stockpile = Stockpile::new(1);
        stockpile.external_contribute(2.0, 1);
        stockpile.external_contribute(3.0, 5);
        stockpile.external_contribute(-4.0, 1);
        assert_eq!(stockpile.query_resource(), 5.0);
        assert_eq!(stockpile.contributed_from(1), 5.0);
    }

    #[test]
    fn harvest_flags_track_levels() {
        let mut stockpile = Stockpile::new(2);
        stockpile.external_growth(10.0);
        assert_eq!(stockpile.harvest_withdraw(1, 4.0), 4.0);
        assert!(stockpile.query_harvest_withdrawals(1));
        assert!(!stockpile.query_harvest_withdrawals(0));
        assert!(stockpile.any_harvest_withdrawals());
        stockpile.reset_harvest_withdrawals(1);
        assert!(!stockpile.any_harvest_withdrawals());
        assert_eq!(stockpile.query_resource(), 6.0);
    }

    #[test]
    fn reserve_clears_after_its_duration() {
        let mut reserve = Reserve::default();
        reserve.set(5.0, 3);
        reserve.try_clear();
        reserve.try_clear();
        assert_eq!(reserve.amount(), 5.0);
        reserve.try_clear();
        assert_eq!(reserve.amount(), 0.0);
        assert_eq!(reserve.fresh(), 0);
    }

    #[test]
    fn reserve_never_goes_negative() {
        let mut reserve = Reserve::default();
        reserve.set(-2.0, 4);
        assert_eq!(reserve.amount(), 0.0);
        reserve.adjust(3.0, 2);
        reserve.adjust(-1.0, 2);
        assert_eq!(reserve.amount(), 2.0);
        reserve.adjust(-10.0, 2);
        assert_eq!(reserve.amount(), 0.0);
    }
}
