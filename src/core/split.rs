//! Randomized train/test partitioning.

use crate::core::dataset::Dataset;
use crate::core::error::DatasetError;
use rand::seq::SliceRandom;
use rand::Rng;

/// A train/test partition of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

impl Split {
    /// Whether both partitions contain at least one row of each class.
    pub fn has_both_classes(&self) -> bool {
        self.train.class_counts().has_both() && self.test.class_counts().has_both()
    }
}

/// Shuffle and cut off `ceil(n * test_fraction)` rows for testing.
pub fn train_test_split<R: Rng + ?Sized>(
    dataset: &Dataset,
    test_fraction: f64,
    rng: &mut R,
) -> Result<Split, DatasetError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DatasetError::InvalidFraction(test_fraction));
    }
    if dataset.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    let n = dataset.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DatasetError::DegenerateSplit {
            rows: n,
            attempts: 1,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(Split {
        train: dataset.select(train_idx),
        test: dataset.select(test_idx),
    })
}

/// Re-draw the split until both partitions hold both classes.
pub fn split_with_both_classes<R: Rng + ?Sized>(
    dataset: &Dataset,
    test_fraction: f64,
    rng: &mut R,
    max_attempts: usize,
) -> Result<Split, DatasetError> {
    for attempt in 1..=max_attempts {
        let split = train_test_split(dataset, test_fraction, rng)?;
        if split.has_both_classes() {
            return Ok(split);
        }
        tracing::warn!(attempt, "split left a partition with one class, re-drawing");
    }

    Err(DatasetError::DegenerateSplit {
        rows: dataset.len(),
        attempts: max_attempts,
    })
}
