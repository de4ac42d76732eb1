//! Network identifier.

use serde::{Deserialize, Serialize};

/// Identifies which network a node is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public test network.
    Test,
    /// Local development network. Timers are shortened and small
    /// representatives are allowed to vote.
    Dev,
}

impl NetworkId {
    /// Default port for this network.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Live => 7075,
            Self::Test => 17075,
            Self::Dev => 44000,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Dev => "dev",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

impl std::str::FromStr for NetworkId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "test" => Ok(Self::Test),
            "dev" => Ok(Self::Dev),
            other => Err(format!("unknown network: {other}")),
        }
    }
}
