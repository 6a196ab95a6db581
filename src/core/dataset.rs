//! Rectangular feature matrix and label vector built from windows.

use crate::core::error::DatasetError;
use crate::core::window::Window;
use serde::{Deserialize, Serialize};

/// Label of a window recorded while not stressed.
pub const NOT_STRESSED: f64 = 0.0;

/// Label of a window recorded while stressed.
pub const STRESSED: f64 = 1.0;

/// Number of feature columns.
pub const FEATURE_COUNT: usize = 4;

/// Column names, in matrix order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["gsrMean", "gsrLocals", "hrMean", "hrMeanDerivative"];

/// One row of the feature matrix.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Feature rows paired 1:1 with labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    features: Vec<FeatureRow>,
    labels: Vec<f64>,
}

/// Counts of the two classification labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub not_stressed: usize,
    pub stressed: usize,
    /// Rows whose label is neither class (regression data)
    pub other: usize,
}

impl ClassCounts {
    /// Whether both classes have at least one row.
    pub fn has_both(&self) -> bool {
        self.not_stressed > 0 && self.stressed > 0
    }

    pub fn is_balanced(&self) -> bool {
        self.not_stressed == self.stressed
    }
}

impl Dataset {
    /// Pair feature rows with labels; lengths must match.
    pub fn new(features: Vec<FeatureRow>, labels: Vec<f64>) -> Result<Self, DatasetError> {
        if features.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &[FeatureRow] {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Split back into the owned matrix and label vector.
    pub fn into_parts(self) -> (Vec<FeatureRow>, Vec<f64>) {
        (self.features, self.labels)
    }

    /// Iterate over `(row, label)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&FeatureRow, f64)> + '_ {
        self.features.iter().zip(self.labels.iter().copied())
    }

    pub fn class_counts(&self) -> ClassCounts {
        let mut counts = ClassCounts::default();
        for &label in &self.labels {
            if label == NOT_STRESSED {
                counts.not_stressed += 1;
            } else if label == STRESSED {
                counts.stressed += 1;
            } else {
                counts.other += 1;
            }
        }
        counts
    }

    /// Rows at `indices`, in the order given.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Append another dataset's rows after this one's.
    pub fn concat(&self, other: &Dataset) -> Self {
        let mut features = self.features.clone();
        features.extend_from_slice(&other.features);
        let mut labels = self.labels.clone();
        labels.extend_from_slice(&other.labels);
        Self { features, labels }
    }

    /// Apply `f` to every label, leaving features untouched.
    pub fn map_labels(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            features: self.features.clone(),
            labels: self.labels.iter().map(|&y| f(y)).collect(),
        }
    }

    pub(crate) fn push(&mut self, row: FeatureRow, label: f64) {
        self.features.push(row);
        self.labels.push(label);
    }
}

/// Build the feature matrix and label vector from extracted windows.
pub fn windows_to_dataset(windows: &[Window]) -> Result<Dataset, DatasetError> {
    if windows.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    let features = windows.iter().map(|w| w.sample.to_row()).collect();
    let labels = windows.iter().map(|w| w.label).collect();
    Dataset::new(features, labels)
}

/// Map a questionnaire test result onto the energy scale (1.0 = rested).
pub fn energy_from_test_result(test_result: f64) -> f64 {
    1.0 - ((test_result - 0.2) / 0.8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::Sample;

    fn window(row: FeatureRow, label: f64) -> Window {
        Window {
            id: String::new(),
            sample: Sample {
                gsr_mean: row[0],
                gsr_locals: row[1],
                hr_mean: row[2],
                hr_mean_derivative: row[3],
            },
            label,
        }
    }

    #[test]
    fn test_windows_to_dataset_preserves_length_and_order() {
        let windows = vec![
            window([1.0, 0.0, 60.0, 0.0], 0.0),
            window([5.0, 3.0, 90.0, 2.0], 1.0),
            window([2.0, 0.0, 62.0, 0.0], 0.0),
        ];
        let ds = windows_to_dataset(&windows).unwrap();

        assert_eq!(ds.len(), windows.len());
        assert_eq!(ds.features().len(), ds.labels().len());
        assert_eq!(ds.features()[1], [5.0, 3.0, 90.0, 2.0]);
        assert_eq!(ds.labels(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_empty_windows_rejected() {
        assert!(matches!(
            windows_to_dataset(&[]),
            Err(DatasetError::EmptyDataset)
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = Dataset::new(vec![[0.0; 4]], vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::LengthMismatch { rows: 1, labels: 2 }
        ));
    }

    #[test]
    fn test_class_counts() {
        let ds = Dataset::new(vec![[0.0; 4]; 5], vec![0.0, 1.0, 1.0, 0.5, 0.0]).unwrap();
        let counts = ds.class_counts();
        assert_eq!(counts.not_stressed, 2);
        assert_eq!(counts.stressed, 2);
        assert_eq!(counts.other, 1);
        assert!(counts.has_both());
        assert!(counts.is_balanced());
    }

    #[test]
    fn test_concat_and_select() {
        let a = Dataset::new(vec![[1.0; 4]], vec![0.0]).unwrap();
        let b = Dataset::new(vec![[2.0; 4], [3.0; 4]], vec![1.0, 0.0]).unwrap();
        let joined = a.concat(&b);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.features()[2], [3.0; 4]);

        let picked = joined.select(&[2, 0]);
        assert_eq!(picked.labels(), &[0.0, 0.0]);
        assert_eq!(picked.features()[0], [3.0; 4]);
    }

    #[test]
    fn test_energy_transform() {
        assert!((energy_from_test_result(0.2) - 1.0).abs() < 1e-12);
        assert!((energy_from_test_result(1.0) - 0.0).abs() < 1e-12);

        let ds = Dataset::new(vec![[0.0; 4]; 2], vec![0.2, 0.6]).unwrap();
        let scaled = ds.map_labels(|y| energy_from_test_result(y) * 30.0);
        assert!((scaled.labels()[0] - 30.0).abs() < 1e-9);
        assert!((scaled.labels()[1] - 15.0).abs() < 1e-9);
        assert_eq!(scaled.features(), ds.features());
    }
}
