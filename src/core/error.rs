//! Error types for record navigation, window extraction and dataset shaping.

use std::path::PathBuf;

/// Errors raised while walking the record tree or parsing windows.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The tree has no `users` mapping at its root.
    #[error("record tree has no `users` mapping")]
    MissingUsers,

    /// An entry under `users` is not a mapping of fields.
    #[error("user entry \"{id}\" is not a mapping")]
    MalformedUser { id: String },

    /// No user matches the requested index or id.
    #[error("user not found: {selector} ({available} users in tree)")]
    UserNotFound {
        /// Human-readable form of the selector that failed.
        selector: String,
        /// Number of users present in the tree.
        available: usize,
    },

    /// The user record has no entry for the requested data category.
    #[error("no data of category \"{category}\" for this user")]
    MissingCategory {
        /// Category key that was looked up.
        category: String,
    },

    /// The category exists but is not a mapping of windows.
    #[error("category \"{category}\" is not a mapping of windows")]
    MalformedCategory { category: String },

    /// A window payload could not be parsed or lacks required fields.
    #[error("malformed window {window_id}: {reason}")]
    MalformedWindow {
        /// Id of the offending window (store key, or `key[index]` for files).
        window_id: String,
        /// Parser message describing what is wrong.
        reason: String,
    },

    /// The alternate source dataset file is unreadable or not valid JSON.
    #[error("cannot read source dataset {path}: {reason}")]
    SourceFile { path: PathBuf, reason: String },
}

/// Errors raised by dataset construction, balancing and splitting.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// No rows to build, balance or split.
    #[error("empty dataset: no windows to build from")]
    EmptyDataset,

    /// Balancing needs both classes; only one label value is present.
    #[error("only one class present (label {label}); minority class is undefined")]
    SingleClass { label: f64 },

    /// A classification label other than 0.0 or 1.0.
    #[error("row {index} has label {value}, expected 0.0 or 1.0")]
    NonBinaryLabel { index: usize, value: f64 },

    /// Feature rows and labels differ in length.
    #[error("feature matrix has {rows} rows but label vector has {labels} entries")]
    LengthMismatch { rows: usize, labels: usize },

    /// Test fraction outside the open interval (0, 1).
    #[error("test fraction {0} must lie strictly between 0 and 1")]
    InvalidFraction(f64),

    /// No acceptable train/test partition was produced.
    #[error("could not produce a usable train/test split of {rows} rows after {attempts} attempt(s)")]
    DegenerateSplit { rows: usize, attempts: usize },
}
