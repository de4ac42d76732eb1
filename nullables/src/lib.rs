//! Nullable infrastructure for deterministic testing.
//!
//! Test-friendly implementations of external dependencies that never touch
//! the filesystem. Swap them in for the real implementations in tests.

pub mod store;

pub use store::NullStore;
