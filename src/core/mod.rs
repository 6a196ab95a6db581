//! Core data shaping for the stress-sensing datasets.
//!
//! This module contains:
//! - Validated navigation of the fetched record tree
//! - Strict window extraction from user records and source files
//! - Dataset construction, minority oversampling and train/test splits

pub mod balance;
pub mod dataset;
pub mod error;
pub mod split;
pub mod tree;
pub mod window;

// Re-export commonly used types
pub use balance::balance;
pub use dataset::{
    energy_from_test_result, windows_to_dataset, ClassCounts, Dataset, FeatureRow,
    FEATURE_COUNT, FEATURE_NAMES, NOT_STRESSED, STRESSED,
};
pub use error::{DatasetError, ExtractError};
pub use split::{split_with_both_classes, train_test_split, Split};
pub use tree::{RecordTree, UserRecord, UserSelector};
pub use window::{
    extract_windows, windows_from_document, windows_from_file, Sample, Window, DEFAULT_FILE_KEY,
};
