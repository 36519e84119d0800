//! Training result types for the random forest.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// Metadata about the training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    pub n_trees: usize,
    pub n_features: usize,
    pub n_classes: usize,
    pub n_samples: usize,
    /// Features considered per split after resolving [`MaxFeatures`](crate::MaxFeatures).
    pub max_features_resolved: usize,
}

/// Fitted forest together with its ranked importances.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            metadata,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Importances sorted descending, ranks starting at 1.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
