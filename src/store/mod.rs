//! Remote record store access and the local cache file.
//!
//! The store is reached only through [`TreeSource`], so callers decide when
//! a connection is made and tests can substitute an in-memory tree.

pub mod cache;

#[cfg(feature = "remote")]
pub mod client;

use crate::core::RecordTree;
use std::path::PathBuf;

pub use cache::{clear_cache, load_or_fetch, refresh};

#[cfg(feature = "remote")]
pub use client::{BlockingStoreClient, Credentials, StoreClient, StoreConfig};

/// Errors from fetching the record tree or reading its cached copy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Authentication, transport, timeout or response failure.
    #[error("store connectivity error: {0}")]
    Connectivity(String),

    /// An existing cache file could not be decoded. Delete it to re-fetch.
    #[error("cache file {path} is corrupt: {reason}")]
    CacheCorruption { path: PathBuf, reason: String },

    /// The cache file could not be read or written.
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Anything able to produce the full record tree in one read.
pub trait TreeSource {
    /// Read the entire tree rooted at `/`. All-or-nothing.
    fn fetch_tree(&self) -> Result<RecordTree, StoreError>;
}

/// A fixed, in-memory tree.
impl TreeSource for RecordTree {
    fn fetch_tree(&self) -> Result<RecordTree, StoreError> {
        Ok(self.clone())
    }
}
