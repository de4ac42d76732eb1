//! Asynchronous work generation.
//!
//! Requests run on the rayon pool and complete through a one-shot channel,
//! so each request resolves at most once. Stopping the pool cancels every
//! search in flight.

use tokio::sync::oneshot;

use crate::{WorkError, WorkGenerator, WorkThresholds};
use lattice_types::Root;

pub struct WorkPool {
    generator: WorkGenerator,
    thresholds: WorkThresholds,
}

impl WorkPool {
    pub fn new(thresholds: WorkThresholds) -> Self {
        Self {
            generator: WorkGenerator::new(),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> WorkThresholds {
        self.thresholds
    }

    /// Start a search at the publish threshold; the receiver resolves once.
    pub fn generate(&self, root: Root) -> oneshot::Receiver<Result<u64, WorkError>> {
        self.generate_with_threshold(root, self.thresholds.publish)
    }

    pub fn generate_with_threshold(
        &self,
        root: Root,
        threshold: u64,
    ) -> oneshot::Receiver<Result<u64, WorkError>> {
        let (tx, rx) = oneshot::channel();
        if self.generator.is_cancelled() {
            let _ = tx.send(Err(WorkError::Stopped));
            return rx;
        }
        let generator = self.generator.clone();
        rayon::spawn(move || {
            let result = generator.generate(&root, threshold);
            if tx.send(result).is_err() {
                tracing::debug!(root = %root, "work result dropped, requester went away");
            }
        });
        rx
    }

    /// Generate on the calling thread.
    pub fn generate_blocking(&self, root: &Root) -> Result<u64, WorkError> {
        if self.generator.is_cancelled() {
            return Err(WorkError::Stopped);
        }
        self.generator.generate(root, self.thresholds.publish)
    }

    pub fn validate(&self, root: &Root, work: u64) -> bool {
        crate::work_validate(root, work, self.thresholds.publish)
    }

    pub fn stop(&self) {
        self.generator.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn async_generation_completes() {
        let pool = WorkPool::new(WorkThresholds::with_publish(0xF000_0000_0000_0000));
        let root = Root::from_u64(99);
        let work = pool.generate(root).await.unwrap().unwrap();
        assert!(pool.validate(&root, work));
    }

    #[tokio::test]
    async fn stopped_pool_rejects_requests() {
        let pool = WorkPool::new(WorkThresholds::with_publish(1));
        pool.stop();
        assert_eq!(pool.generate(Root::from_u64(1)).await.unwrap(), Err(WorkError::Stopped));
        assert_eq!(pool.generate_blocking(&Root::from_u64(1)), Err(WorkError::Stopped));
    }
}
