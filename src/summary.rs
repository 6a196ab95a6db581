//! Descriptive statistics of a dataset for display and export.

use crate::core::{ClassCounts, Dataset, FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

/// Mean and spread of one feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Row count, class balance and per-feature statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub classes: ClassCounts,
    /// Stressed rows per not-stressed row, if any not-stressed rows exist
    pub stressed_ratio: Option<f64>,
    pub features: Vec<FeatureStats>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let classes = dataset.class_counts();
        let stressed_ratio = (classes.not_stressed > 0)
            .then(|| classes.stressed as f64 / classes.not_stressed as f64);

        let features = (0..FEATURE_COUNT)
            .map(|col| {
                let column: Vec<f64> = dataset.features().iter().map(|r| r[col]).collect();
                FeatureStats {
                    name: FEATURE_NAMES[col].to_string(),
                    mean: column.iter().mean(),
                    std_dev: column.iter().std_dev(),
                    min: Statistics::min(&column),
                    max: Statistics::max(&column),
                }
            })
            .collect();

        Self {
            rows: dataset.len(),
            classes,
            stressed_ratio,
            features,
        }
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset Statistics:")?;
        writeln!(f, "  - Rows: {}", self.rows)?;
        writeln!(f, "  - Stressed samples: {}", self.classes.stressed)?;
        writeln!(f, "  - Not stressed samples: {}", self.classes.not_stressed)?;
        if self.classes.other > 0 {
            writeln!(f, "  - Other labels: {}", self.classes.other)?;
        }
        match self.stressed_ratio {
            Some(ratio) => writeln!(f, "  - Ratio: {ratio:.3}")?,
            None => writeln!(f, "  - Ratio: n/a")?,
        }
        writeln!(f)?;
        writeln!(f, "Features:")?;
        for feat in &self.features {
            writeln!(
                f,
                "  - {:<18} mean {:>10.4}  std {:>10.4}  range [{:.4}, {:.4}]",
                feat.name, feat.mean, feat.std_dev, feat.min, feat.max
            )?;
        }
        Ok(())
    }
}
