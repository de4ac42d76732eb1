//! PoW generation (multi-threaded CPU).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::validator::work_value;
use crate::WorkError;
use lattice_types::Root;

/// Batch size per thread before checking the stop flags.
const BATCH_SIZE: u64 = 4096;

/// Searches the nonce space on every available core.
#[derive(Clone, Default)]
pub struct WorkGenerator {
    cancelled: Arc<AtomicBool>,
}

impl WorkGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort every search in progress and every future search.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Find a nonce whose work value over `root` reaches `threshold`.
    ///
    /// Threads interleave the nonce space with a stride of the thread count.
    /// The first thread to find a valid nonce signals the others to stop.
    pub fn generate(&self, root: &Root, threshold: u64) -> Result<u64, WorkError> {
        if self.is_cancelled() {
            return Err(WorkError::Cancelled);
        }
        if threshold == 0 {
            return Ok(0);
        }

        let found = AtomicBool::new(false);
        let result = AtomicU64::new(0);
        let num_threads = rayon::current_num_threads().max(1);

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let stride = num_threads as u64;
            let mut nonce = thread_id as u64;
            loop {
                if found.load(Ordering::Relaxed) || self.cancelled.load(Ordering::Relaxed) {
                    return;
                }
                for _ in 0..BATCH_SIZE {
                    if work_value(root, nonce) >= threshold {
                        if !found.swap(true, Ordering::SeqCst) {
                            result.store(nonce, Ordering::SeqCst);
                        }
                        return;
                    }
                    nonce = nonce.wrapping_add(stride);
                }
            }
        });

        if found.load(Ordering::SeqCst) {
            Ok(result.load(Ordering::SeqCst))
        } else {
            Err(WorkError::Cancelled)
        }
    }
}
