//! Training configuration.

use attrition_rf::{MaxFeatures, RandomForestConfig, StratifiedHoldout};

use crate::error::ModelError;

/// Settings for a training run.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `n_trees`           | 200     |
/// | `max_depth`         | 15      |
/// | `min_samples_split` | 10      |
/// | `min_samples_leaf`  | 4       |
/// | `test_fraction`     | 0.2     |
/// | `seed`              | 42      |
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    test_fraction: f64,
    seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: Some(15),
            min_samples_split: 10,
            min_samples_leaf: 4,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// `None` grows trees until the other limits stop them.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Fraction of rows held out for evaluation, in (0, 1).
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Seeds both the holdout shuffle and the forest.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The forest settings: square-root feature sampling plus the limits above.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] when `n_trees` is zero.
    pub fn forest_config(&self) -> Result<RandomForestConfig, ModelError> {
        Ok(RandomForestConfig::new(self.n_trees)?
            .with_max_features(MaxFeatures::Sqrt)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_seed(self.seed))
    }

    /// The stratified holdout for this run.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Forest`] when the test fraction is outside (0, 1).
    pub fn holdout(&self) -> Result<StratifiedHoldout, ModelError> {
        Ok(StratifiedHoldout::new(self.test_fraction)?.with_seed(self.seed))
    }
}
