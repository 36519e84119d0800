//! Stratified train/test holdout split.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::RfError;

/// Splits sample indices into train and test sets, preserving class ratios.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `seed`    | 42      |
#[derive(Debug, Clone)]
pub struct StratifiedHoldout {
    test_fraction: f64,
    seed: u64,
}

impl StratifiedHoldout {
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTestFraction`] unless `0.0 < test_fraction < 1.0`.
    pub fn new(test_fraction: f64) -> Result<Self, RfError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(RfError::InvalidTestFraction {
                fraction: test_fraction,
            });
        }
        Ok(Self {
            test_fraction,
            seed: 42,
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return `(train, test)` index lists, each sorted ascending.
    ///
    /// Every class contributes `round(count * test_fraction)` samples to the
    /// test side, clamped so both sides keep at least one.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `labels` is empty |
    /// | [`RfError::TooFewSamplesForSplit`] | a class has fewer than 2 samples |
    pub fn split(&self, labels: &[usize]) -> Result<(Vec<usize>, Vec<usize>), RfError> {
        if labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }

        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(i);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut test = Vec::new();

        for (class, mut indices) in by_class {
            let count = indices.len();
            if count < 2 {
                return Err(RfError::TooFewSamplesForSplit { class, count });
            }
            indices.shuffle(&mut rng);
            let n_test = ((count as f64 * self.test_fraction).round() as usize).clamp(1, count - 1);
            debug!(class, count, n_test, "stratified split");
            test.extend_from_slice(&indices[..n_test]);
            train.extend_from_slice(&indices[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok((train, test))
    }
}
