//! Minority-class oversampling.

use crate::core::dataset::{Dataset, NOT_STRESSED, STRESSED};
use crate::core::error::DatasetError;
use rand::Rng;

/// Equalize the two classes by appending duplicates of minority rows.
///
/// Rows are drawn uniformly with replacement from the minority class and
/// appended after the original rows. Original rows are never removed or
/// changed, and an already balanced input is returned unchanged.
pub fn balance<R: Rng + ?Sized>(dataset: &Dataset, rng: &mut R) -> Result<Dataset, DatasetError> {
    if dataset.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    if let Some((index, &value)) = dataset
        .labels()
        .iter()
        .enumerate()
        .find(|(_, &y)| y != NOT_STRESSED && y != STRESSED)
    {
        return Err(DatasetError::NonBinaryLabel { index, value });
    }

    let counts = dataset.class_counts();
    if !counts.has_both() {
        return Err(DatasetError::SingleClass {
            label: dataset.labels()[0],
        });
    }
    if counts.is_balanced() {
        return Ok(dataset.clone());
    }

    let minority_label = if counts.not_stressed < counts.stressed {
        NOT_STRESSED
    } else {
        STRESSED
    };
    let deficit = counts.not_stressed.abs_diff(counts.stressed);

    let minority: Vec<usize> = dataset
        .labels()
        .iter()
        .enumerate()
        .filter(|(_, &y)| y == minority_label)
        .map(|(i, _)| i)
        .collect();

    let mut balanced = dataset.clone();
    for _ in 0..deficit {
        let source = minority[rng.gen_range(0..minority.len())];
        balanced.push(dataset.features()[source], minority_label);
    }

    tracing::debug!(
        original = dataset.len(),
        appended = deficit,
        minority = minority_label,
        "balanced dataset"
    );
    Ok(balanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dataset(rows: &[([f64; 4], f64)]) -> Dataset {
        Dataset::new(
            rows.iter().map(|(r, _)| *r).collect(),
            rows.iter().map(|(_, y)| *y).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_identity_when_balanced() {
        let rows: Vec<([f64; 4], f64)> = (0..10)
            .map(|i| ([i as f64, 0.0, 60.0, 0.0], (i % 2) as f64))
            .collect();
        let ds = dataset(&rows);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let out = balance(&ds, &mut rng).unwrap();
        assert_eq!(out, ds);
    }

    #[test]
    fn test_single_minority_row_duplicated() {
        let ds = dataset(&[
            ([1.0, 0.0, 60.0, 0.0], 0.0),
            ([2.0, 0.0, 62.0, 0.0], 0.0),
            ([1.0, 1.0, 61.0, 0.0], 0.0),
            ([5.0, 3.0, 90.0, 2.0], 1.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let out = balance(&ds, &mut rng).unwrap();
        let counts = out.class_counts();
        assert_eq!(counts.not_stressed, 3);
        assert_eq!(counts.stressed, 3);
        assert_eq!(out.len(), 6);
        assert_eq!(&out.features()[..4], ds.features());
        for row in &out.features()[4..] {
            assert_eq!(*row, [5.0, 3.0, 90.0, 2.0]);
        }
    }

    #[test]
    fn test_minority_not_stressed() {
        let ds = dataset(&[
            ([1.0; 4], 1.0),
            ([2.0; 4], 1.0),
            ([3.0; 4], 1.0),
            ([4.0; 4], 1.0),
            ([8.0; 4], 0.0),
            ([9.0; 4], 0.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let out = balance(&ds, &mut rng).unwrap();
        assert!(out.class_counts().is_balanced());
        assert_eq!(out.len(), 8);
        for (row, label) in out.rows().skip(6) {
            assert_eq!(label, 0.0);
            assert!(*row == [8.0; 4] || *row == [9.0; 4]);
        }
    }

    #[test]
    fn test_majority_rows_preserved() {
        let rows: Vec<([f64; 4], f64)> = (0..9)
            .map(|i| ([i as f64, 1.0, 70.0 + i as f64, 0.5], if i < 7 { 0.0 } else { 1.0 }))
            .collect();
        let ds = dataset(&rows);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let out = balance(&ds, &mut rng).unwrap();
        let majority_before: Vec<_> = ds.rows().filter(|(_, y)| *y == 0.0).collect();
        let majority_after: Vec<_> = out.rows().filter(|(_, y)| *y == 0.0).collect();
        assert_eq!(majority_before, majority_after);
    }

    #[test]
    fn test_idempotent() {
        let ds = dataset(&[
            ([1.0; 4], 0.0),
            ([2.0; 4], 0.0),
            ([3.0; 4], 0.0),
            ([4.0; 4], 1.0),
            ([5.0; 4], 1.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let once = balance(&ds, &mut rng).unwrap();
        let twice = balance(&once, &mut rng).unwrap();
        assert_eq!(once.len(), twice.len());
        assert_eq!(once.class_counts(), twice.class_counts());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_single_class_rejected() {
        let ds = dataset(&[([1.0; 4], 1.0), ([2.0; 4], 1.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        match balance(&ds, &mut rng) {
            Err(DatasetError::SingleClass { label }) => assert_eq!(label, 1.0),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_binary_label_rejected() {
        let ds = dataset(&[([1.0; 4], 0.0), ([2.0; 4], 12.5)]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(matches!(
            balance(&ds, &mut rng),
            Err(DatasetError::NonBinaryLabel { index: 1, .. })
        ));
    }
}
