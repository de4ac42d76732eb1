//! Events the node emits for subscribers.

use std::net::SocketAddr;
use std::sync::RwLock;

use lattice_consensus::ElectionStatus;
use lattice_ledger::ProcessResult;
use lattice_types::{Account, BlockHash, Root};

#[derive(Clone, Debug)]
pub enum NodeEvent {
    /// The block processor finished with a block.
    BlockProcessed { hash: BlockHash, result: ProcessResult },
    /// An election confirmed its winner.
    ElectionConfirmed(ElectionStatus),
    /// A block competes with the ledger's block at `root`.
    ForkDetected {
        root: Root,
        ledger: BlockHash,
        incoming: BlockHash,
    },
    /// A vote was counted.
    Vote {
        representative: Account,
        endpoint: SocketAddr,
    },
    /// Enough weight voted for a block we do not have.
    BootstrapRequired { hash: BlockHash },
}

type Listener = Box<dyn Fn(&NodeEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting thread, which may be a pipeline
/// worker; keep them fast and do not call back into the node from them.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Listener) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    pub fn emit(&self, event: &NodeEvent) {
        if let Ok(listeners) = self.listeners.read() {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&NodeEvent::BootstrapRequired { hash: BlockHash::ZERO });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn listener_sees_the_variant() {
        let forks = Arc::new(AtomicUsize::new(0));
        let bus = EventBus::new();
        let f = Arc::clone(&forks);
        bus.subscribe(Box::new(move |event| {
            if let NodeEvent::ForkDetected { .. } = event {
                f.fetch_add(1, Ordering::SeqCst);
            }
        }));

        bus.emit(&NodeEvent::ForkDetected {
            root: Root::ZERO,
            ledger: BlockHash::from_u64(1),
            incoming: BlockHash::from_u64(2),
        });
        bus.emit(&NodeEvent::BlockProcessed {
            hash: BlockHash::ZERO,
            result: ProcessResult::Old,
        });
        assert_eq!(forks.load(Ordering::SeqCst), 1);
    }
}
