//! Representatives heard from recently.
//!
//! Quorum is measured against online stake rather than total delegated
//! weight. A representative counts as online while its last observed vote
//! is within the cutoff; the online stake never drops below the configured
//! minimum.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lattice_types::{Account, Amount};

use crate::weights::WeightSource;

pub const CUTOFF_LIVE: Duration = Duration::from_secs(300);
pub const CUTOFF_DEV: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct OnlineReps {
    reps: HashMap<Account, Instant>,
    cutoff: Duration,
    minimum: Amount,
    online: Amount,
}

impl OnlineReps {
    pub fn new(cutoff: Duration, minimum: Amount) -> Self {
        Self {
            reps: HashMap::new(),
            cutoff,
            minimum,
            online: Amount::ZERO,
        }
    }

    /// Record a vote from `rep`. Representatives without weight are not
    /// tracked.
    pub fn observe(&mut self, rep: &Account, weight: Amount, now: Instant) {
        if weight.is_zero() {
            return;
        }
        if self.reps.insert(*rep, now).is_none() {
            tracing::trace!(representative = %rep, weight = %weight, "representative online");
        }
    }

    /// Drop representatives past the cutoff and recompute the online total.
    pub fn recalculate_stake(&mut self, weights: &dyn WeightSource, now: Instant) {
        let cutoff = self.cutoff;
        self.reps
            .retain(|_, seen| now.saturating_duration_since(*seen) <= cutoff);
        self.online = self
            .reps
            .keys()
            .fold(Amount::ZERO, |acc, rep| acc.saturating_add(weights.weight(rep)));
        tracing::debug!(online = %self.online, reps = self.reps.len(), "online stake recalculated");
    }

    /// Online weight, floored at the configured minimum.
    pub fn online_stake(&self) -> Amount {
        self.online.max(self.minimum)
    }

    /// Online weight as last computed, without the floor.
    pub fn online_total(&self) -> Amount {
        self.online
    }

    pub fn list(&self, now: Instant) -> Vec<Account> {
        self.reps
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) <= self.cutoff)
            .map(|(rep, _)| *rep)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reps.is_empty()
    }
}
