//! The parameterized download → reshape → balance → split pipeline.
//!
//! Experiment variants (which partitions get balanced, whether the energy
//! transform runs) are expressed as [`PipelineConfig`] fields.

use crate::core::{
    balance, energy_from_test_result, extract_windows, split_with_both_classes,
    train_test_split, windows_from_file, windows_to_dataset, Dataset, DatasetError, ExtractError,
    RecordTree, Split, UserSelector, Window, FEATURE_NAMES,
};
use crate::store::StoreError;
use crate::summary::DatasetSummary;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the prepared dataset is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    /// Binary stressed / not-stressed classification
    Stress,
    /// Continuous energy-score regression
    Energy,
}

impl Task {
    /// Store category holding this task's windows.
    pub fn default_category(&self) -> &'static str {
        match self {
            Task::Stress => "data",
            Task::Energy => "energy_data",
        }
    }
}

/// Which rows are oversampled for a stress dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BalanceMode {
    /// Never balance.
    Off,
    /// Balance the whole dataset, then split. Duplicated minority rows can
    /// land in both partitions.
    BeforeSplit,
    /// Split, then balance only the training partition. The test partition
    /// keeps the natural class ratio.
    TrainOnly,
    /// Split, then balance each partition independently.
    Separately,
}

/// Errors from any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// A store-backed source was requested without a record tree.
    #[error("source {0} needs the record tree but none was loaded")]
    MissingTree(String),
    #[error("cannot write export {path}: {reason}")]
    Export { path: PathBuf, reason: String },
}

/// Where a dataset's windows come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    /// One user's category in the record tree.
    Store { user: UserSelector, category: String },
    /// A source dataset file with an array of windows under `key`.
    File { path: PathBuf, key: String },
}

impl DatasetSource {
    pub fn needs_tree(&self) -> bool {
        matches!(self, DatasetSource::Store { .. })
    }

    /// Extract this source's windows.
    pub fn load_windows(&self, tree: Option<&RecordTree>) -> Result<Vec<Window>, PipelineError> {
        match self {
            DatasetSource::Store { user, category } => {
                let tree = tree.ok_or_else(|| PipelineError::MissingTree(user.to_string()))?;
                tracing::info!(users = tree.users()?.len(), "found data from users");

                let record = tree.user(user)?;
                tracing::info!(
                    subject = record.display_name().unwrap_or("?"),
                    category = category.as_str(),
                    "selected subject"
                );
                Ok(extract_windows(&record, category)?)
            }
            DatasetSource::File { path, key } => Ok(windows_from_file(path, key)?),
        }
    }

    /// Extract windows and build the dataset.
    pub fn load(&self, tree: Option<&RecordTree>) -> Result<Dataset, PipelineError> {
        let windows = self.load_windows(tree)?;
        Ok(windows_to_dataset(&windows)?)
    }
}

/// Load several sources and stack them into one composite dataset.
pub fn load_combined(
    sources: &[DatasetSource],
    tree: Option<&RecordTree>,
) -> Result<Dataset, PipelineError> {
    let mut combined: Option<Dataset> = None;
    for source in sources {
        let dataset = source.load(tree)?;
        combined = Some(match combined {
            Some(acc) => acc.concat(&dataset),
            None => dataset,
        });
    }
    combined.ok_or(PipelineError::Dataset(DatasetError::EmptyDataset))
}

/// Pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub task: Task,
    /// Ignored for energy datasets, which are never balanced
    pub balance: BalanceMode,
    pub test_fraction: f64,
    /// Apply the energy transform and multiply by this factor
    pub energy_scale: Option<f64>,
    pub max_split_attempts: usize,
}

impl PipelineConfig {
    /// The balance mode is always an explicit choice.
    pub fn new(task: Task, balance: BalanceMode) -> Self {
        Self {
            task,
            balance,
            test_fraction: 0.33,
            energy_scale: None,
            max_split_attempts: 100,
        }
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_energy_scale(mut self, scale: f64) -> Self {
        self.energy_scale = Some(scale);
        self
    }

    pub fn with_max_split_attempts(mut self, attempts: usize) -> Self {
        self.max_split_attempts = attempts;
        self
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedDataset {
    pub config: PipelineConfig,
    pub feature_names: [&'static str; 4],
    /// Dataset after label transforms, before balancing
    pub full: Dataset,
    pub train: Dataset,
    pub test: Dataset,
    pub summary: DatasetSummary,
}

impl PreparedDataset {
    /// Write the prepared dataset as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        let export_error = |reason: String| PipelineError::Export {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| export_error(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| export_error(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| export_error(e.to_string()))?;
        Ok(())
    }
}

/// Runs the configured reshape → balance → split sequence.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Prepare `dataset` for fitting.
    pub fn run<R: Rng + ?Sized>(
        &self,
        dataset: Dataset,
        rng: &mut R,
    ) -> Result<PreparedDataset, PipelineError> {
        let cfg = &self.config;

        let full = match (cfg.task, cfg.energy_scale) {
            (Task::Energy, Some(scale)) => {
                dataset.map_labels(|y| energy_from_test_result(y) * scale)
            }
            _ => dataset,
        };

        let split = match cfg.task {
            Task::Energy => train_test_split(&full, cfg.test_fraction, rng)?,
            Task::Stress => self.split_stress(&full, rng)?,
        };

        tracing::debug!(
            rows = full.len(),
            train = split.train.len(),
            test = split.test.len(),
            "pipeline complete"
        );

        Ok(PreparedDataset {
            config: cfg.clone(),
            feature_names: FEATURE_NAMES,
            summary: DatasetSummary::from_dataset(&full),
            full,
            train: split.train,
            test: split.test,
        })
    }

    fn split_stress<R: Rng + ?Sized>(
        &self,
        full: &Dataset,
        rng: &mut R,
    ) -> Result<Split, DatasetError> {
        match self.config.balance {
            BalanceMode::Off => self.split_classes(full, rng),
            BalanceMode::BeforeSplit => {
                let balanced = balance(full, rng)?;
                self.split_classes(&balanced, rng)
            }
            BalanceMode::TrainOnly => {
                let Split { train, test } = self.split_classes(full, rng)?;
                Ok(Split {
                    train: balance(&train, rng)?,
                    test,
                })
            }
            BalanceMode::Separately => {
                let Split { train, test } = self.split_classes(full, rng)?;
                Ok(Split {
                    train: balance(&train, rng)?,
                    test: balance(&test, rng)?,
                })
            }
        }
    }

    fn split_classes<R: Rng + ?Sized>(
        &self,
        dataset: &Dataset,
        rng: &mut R,
    ) -> Result<Split, DatasetError> {
        split_with_both_classes(
            dataset,
            self.config.test_fraction,
            rng,
            self.config.max_split_attempts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 12 not-stressed rows and 4 stressed rows.
    fn imbalanced() -> Dataset {
        let features = (0..16).map(|i| [i as f64, 0.0, 60.0 + i as f64, 0.0]).collect();
        let labels = (0..16).map(|i| if i < 12 { 0.0 } else { 1.0 }).collect();
        Dataset::new(features, labels).unwrap()
    }

    fn run(mode: BalanceMode) -> PreparedDataset {
        let pipeline = Pipeline::new(PipelineConfig::new(Task::Stress, mode));
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        pipeline.run(imbalanced(), &mut rng).unwrap()
    }

    #[test]
    fn test_balance_before_split() {
        let out = run(BalanceMode::BeforeSplit);
        assert_eq!(out.train.len() + out.test.len(), 24);
        let total = out.train.concat(&out.test).class_counts();
        assert!(total.is_balanced());
        assert_eq!(out.full.len(), 16);
    }

    #[test]
    fn test_balance_train_only() {
        let out = run(BalanceMode::TrainOnly);
        assert!(out.train.class_counts().is_balanced());
        assert!(out.test.class_counts().has_both());
        // 16 rows, ceil(16 * 0.33) = 6 held out untouched
        assert_eq!(out.test.len(), 6);
    }

    #[test]
    fn test_balance_separately() {
        let out = run(BalanceMode::Separately);
        assert!(out.train.class_counts().is_balanced());
        assert!(out.test.class_counts().is_balanced());
    }

    #[test]
    fn test_balance_off() {
        let out = run(BalanceMode::Off);
        assert_eq!(out.train.len() + out.test.len(), 16);
    }

    #[test]
    fn test_energy_transform_and_no_balancing() {
        let ds = Dataset::new(vec![[0.0; 4]; 4], vec![0.2, 0.6, 1.0, 0.2]).unwrap();
        let config = PipelineConfig::new(Task::Energy, BalanceMode::BeforeSplit)
            .with_energy_scale(30.0)
            .with_test_fraction(0.25);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let out = Pipeline::new(config).run(ds, &mut rng).unwrap();
        assert_eq!(out.full.len(), 4);
        assert_eq!(out.test.len(), 1);
        let expected = [30.0, 15.0, 0.0, 30.0];
        for (got, want) in out.full.labels().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_class_stress_fails() {
        let ds = Dataset::new(vec![[0.0; 4]; 4], vec![1.0; 4]).unwrap();
        let pipeline = Pipeline::new(PipelineConfig::new(Task::Stress, BalanceMode::BeforeSplit));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(matches!(
            pipeline.run(ds, &mut rng),
            Err(PipelineError::Dataset(DatasetError::SingleClass { .. }))
        ));
    }

    #[test]
    fn test_store_source_without_tree() {
        let source = DatasetSource::Store {
            user: UserSelector::Index(0),
            category: "data".into(),
        };
        assert!(source.needs_tree());
        assert!(matches!(
            source.load(None),
            Err(PipelineError::MissingTree(_))
        ));
    }

    #[test]
    fn test_task_categories() {
        assert_eq!(Task::Stress.default_category(), "data");
        assert_eq!(Task::Energy.default_category(), "energy_data");
    }
}
