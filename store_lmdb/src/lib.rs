//! LMDB storage backend for the lattice node.
//!
//! Implements [`lattice_store::Store`] on top of the `heed` LMDB bindings.
//! Every logical [`lattice_store::Table`] maps to one named LMDB database
//! inside a single environment. LMDB itself provides the single-writer,
//! many-reader transaction model.

pub mod environment;
pub mod error;
pub mod transaction;

pub use environment::LmdbStore;
pub use error::LmdbError;
