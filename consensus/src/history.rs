//! Bounded record of finished elections.

use std::collections::VecDeque;

use crate::election::ElectionStatus;

pub const HISTORY_SIZE: usize = 2048;

#[derive(Debug)]
pub struct ConfirmationHistory {
    entries: VecDeque<ElectionStatus>,
    capacity: usize,
}

impl Default for ConfirmationHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_SIZE)
    }
}

impl ConfirmationHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(HISTORY_SIZE)),
            capacity,
        }
    }

    /// Append, dropping the oldest entry when full.
    pub fn push(&mut self, status: ElectionStatus) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(status);
    }

    /// Oldest first.
    pub fn list(&self) -> Vec<ElectionStatus> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
