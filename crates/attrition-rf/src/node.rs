use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Position of a node inside a tree's node arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Gini impurity of a node, in `[0, 1 - 1/n_classes]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    /// Gini impurity `1 - Σ p_i²` for the given class counts.
    ///
    /// An empty node is treated as pure.
    #[must_use]
    pub fn gini(class_counts: &[usize], n_samples: usize) -> Self {
        if n_samples == 0 {
            return Self(0.0);
        }
        let n = n_samples as f64;
        let sum_sq: f64 = class_counts
            .iter()
            .map(|&c| {
                let p = c as f64 / n;
                p * p
            })
            .sum();
        Self(1.0 - sum_sq)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// True when the node contains a single class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= f64::EPSILON
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`], the root lives at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node routing `value <= threshold` to `left`.
    Split {
        /// Feature tested at this node.
        feature: FeatureIndex,
        /// Midpoint between the two neighbouring training values.
        threshold: f64,
        /// Child receiving samples at or below the threshold.
        left: NodeIndex,
        /// Child receiving samples above the threshold.
        right: NodeIndex,
        /// Training samples that reached this node.
        n_samples: usize,
        /// `n·I(parent) - n_l·I(left) - n_r·I(right)`.
        impurity_decrease: f64,
    },
    /// Terminal node carrying the class distribution of its training samples.
    Leaf {
        /// Class frequencies, sums to 1.0.
        distribution: Vec<f64>,
        /// Training samples that reached this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
