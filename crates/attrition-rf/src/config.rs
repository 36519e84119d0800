//! Configuration builder for random forest training.

use crate::error::RfError;
use crate::result::RandomForestResult;

/// Number of features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Floor of the square root of the feature count (at least 1).
    Sqrt,
    /// Floor of log2 of the feature count (at least 1).
    Log2,
    /// A fixed count.
    Fixed(usize),
    /// Every feature at every split.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] when the count falls outside
    /// `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let resolved = match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
            MaxFeatures::Log2 => ((n_features as f64).log2().floor() as usize).max(1),
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for random forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `max_features`      | `Sqrt`  |
/// | `max_depth`         | `None`  |
/// | `min_samples_split` | 2       |
/// | `min_samples_leaf`  | 1       |
/// | `seed`              | 42      |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        })
    }

    /// Set the per-split feature sampling strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples a node needs before it may split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples each child must keep after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the master seed; per-tree seeds are derived from it.
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
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
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
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the tree-growth parameters.
    pub(crate) fn validate(&self) -> Result<(), RfError> {
        if let Some(max_depth) = self.max_depth
            && max_depth == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }

    /// Train a random forest.
    ///
    /// `features[sample][feature]` is row-major, `labels[sample]` are
    /// zero-based class ids, `feature_names` names each column.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                             |
    /// |--------------------------------------|--------------------------------------------------|
    /// | [`RfError::EmptyDataset`]            | `features` is empty                              |
    /// | [`RfError::ZeroFeatures`]            | rows have zero feature columns                   |
    /// | [`RfError::FeatureCountMismatch`]    | rows have inconsistent lengths                   |
    /// | [`RfError::LabelCountMismatch`]      | `labels.len() != features.len()`                 |
    /// | [`RfError::FeatureNameMismatch`]     | `feature_names.len()` differs from the row width |
    /// | [`RfError::NonFiniteValue`]          | any value is NaN or infinite                     |
    /// | [`RfError::InvalidMaxFeatures`]      | max_features resolves outside [1, n_features]    |
    /// | [`RfError::InvalidMaxDepth`] and co. | tree-growth parameters are out of range          |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_and_log2_round_down() {
        assert_eq!(MaxFeatures::Sqrt.resolve(25).unwrap(), 5);
        assert_eq!(MaxFeatures::Sqrt.resolve(24).unwrap(), 4);
        assert_eq!(MaxFeatures::Log2.resolve(25).unwrap(), 4);
        assert_eq!(MaxFeatures::Sqrt.resolve(1).unwrap(), 1);
    }

    #[test]
    fn fixed_out_of_range_is_rejected() {
        let err = MaxFeatures::Fixed(9).resolve(4).unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidMaxFeatures {
                max_features: 9,
                n_features: 4
            }
        ));
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn validate_catches_bad_limits() {
        let base = RandomForestConfig::new(3).unwrap();
        assert!(base.clone().with_max_depth(Some(0)).validate().is_err());
        assert!(base.clone().with_min_samples_split(1).validate().is_err());
        assert!(base.clone().with_min_samples_leaf(0).validate().is_err());
        assert!(base.validate().is_ok());
    }
}
