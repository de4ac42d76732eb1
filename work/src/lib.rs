//! Anti-spam proof-of-work.
//!
//! Every block carries a 64-bit nonce. The work value of a nonce is the
//! little-endian 64-bit Blake2b digest of `nonce || root`; a nonce is valid when
//! that value reaches the network's publish threshold.

pub mod error;
pub mod generator;
pub mod pool;
pub mod thresholds;
pub mod validator;

pub use error::WorkError;
pub use generator::WorkGenerator;
pub use pool::WorkPool;
pub use thresholds::WorkThresholds;
pub use validator::{work_validate, work_value};
