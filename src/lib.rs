//! Stress Sensor Data - dataset construction for wearable stress research.
//!
//! This library turns the experiment's remote record store of galvanic skin
//! response and heart-rate windows into balanced, numeric datasets ready for
//! a classifier (stressed / not stressed) or a regressor (energy score).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Stress Sensor Data                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Store     │──▶│   Window    │──▶│  Dataset    │         │
//! │  │ (fetch/cache│   │  Extractor  │   │  Builder    │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                                             │                │
//! │                                             ▼                │
//! │                                      ┌─────────────┐         │
//! │                                      │  Balance +  │         │
//! │                                      │   Split     │         │
//! │                                      └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rand::SeedableRng;
//! use stress_sensor_data::{core, store, RecordTree};
//!
//! let tree: RecordTree = serde_json::from_str(r#"{"users": {}}"#).unwrap();
//! let tree = store::load_or_fetch(std::path::Path::new("db.json"), &tree).unwrap();
//! let user = tree.user(&core::UserSelector::Index(0)).unwrap();
//! let windows = core::extract_windows(&user, "data").unwrap();
//! let dataset = core::windows_to_dataset(&windows).unwrap();
//!
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
//! let balanced = core::balance(&dataset, &mut rng).unwrap();
//! assert!(balanced.class_counts().is_balanced());
//! ```

pub mod config;
pub mod core;
pub mod pipeline;
pub mod store;
pub mod summary;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    balance, extract_windows, windows_to_dataset, Dataset, DatasetError, ExtractError,
    RecordTree, UserSelector, Window,
};
pub use pipeline::{
    load_combined, BalanceMode, DatasetSource, Pipeline, PipelineConfig, PipelineError,
    PreparedDataset, Task,
};
pub use store::{clear_cache, load_or_fetch, refresh, StoreError, TreeSource};
pub use summary::DatasetSummary;

#[cfg(feature = "remote")]
pub use store::{BlockingStoreClient, StoreClient, StoreConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
