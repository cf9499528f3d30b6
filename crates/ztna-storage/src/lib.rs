//! # ztna-storage
//!
//! Storage abstraction layer for the ZTNA backend using RocksDB.
//!
//! Services depend on the [`Storage`] trait; [`RocksDbStorage`] is the only
//! production implementation.

#![warn(clippy::all)]

pub mod column_families;
pub mod errors;
pub mod rocksdb_impl;
pub mod traits;

pub use column_families::*;
pub use errors::{Result, StorageError};
pub use rocksdb_impl::RocksDbStorage;
pub use traits::{Batch, BatchExt, Storage};
