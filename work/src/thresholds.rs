//! Publish thresholds per network.

use lattice_types::NetworkId;

const LIVE_THRESHOLD: u64 = 0xFFFF_FFC0_0000_0000;
const TEST_THRESHOLD: u64 = 0xFFFF_F000_0000_0000;
const DEV_THRESHOLD: u64 = 0xFE00_0000_0000_0000;

/// Higher threshold values mean harder work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkThresholds {
    pub publish: u64,
}

impl WorkThresholds {
    pub fn for_network(network: NetworkId) -> Self {
        let publish = match network {
            NetworkId::Live => LIVE_THRESHOLD,
            NetworkId::Test => TEST_THRESHOLD,
            NetworkId::Dev => DEV_THRESHOLD,
        };
        Self { publish }
    }

    /// Construct with a custom threshold (useful in tests or local networks).
    pub fn with_publish(publish: u64) -> Self {
        Self { publish }
    }

    /// Expected number of attempts to reach the publish threshold.
    pub fn expected_attempts(&self) -> u64 {
        let gap = u64::MAX - self.publish;
        if gap == 0 {
            u64::MAX
        } else {
            u64::MAX / gap
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_is_hardest() {
        let live = WorkThresholds::for_network(NetworkId::Live);
        let test = WorkThresholds::for_network(NetworkId::Test);
        let dev = WorkThresholds::for_network(NetworkId::Dev);
        assert!(live.publish > test.publish);
        assert!(test.publish > dev.publish);
    }

    #[test]
    fn dev_threshold_is_cheap() {
        let dev = WorkThresholds::for_network(NetworkId::Dev);
        assert!(dev.expected_attempts() <= 128);
    }
}
