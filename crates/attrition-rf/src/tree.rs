use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::node::{Impurity, Node, NodeIndex};
use crate::split::SplitSearch;

/// Growth limits for a single CART tree.
///
/// Built by the forest from its [`RandomForestConfig`](crate::RandomForestConfig);
/// all values are validated there.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeLimits {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

/// A fitted CART decision tree stored as a node arena.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on column-major training data restricted to `samples`.
    ///
    /// `samples` may repeat indices (bootstrap draws).
    pub(crate) fn grow(
        columns: &[Vec<f64>],
        labels: &[usize],
        samples: &[usize],
        n_classes: usize,
        limits: TreeLimits,
        seed: u64,
    ) -> Self {
        let mut grower = Grower {
            columns,
            labels,
            n_classes,
            limits,
            rng: ChaCha8Rng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        grower.grow(samples, 0);
        trace!(n_nodes = grower.nodes.len(), "tree grown");
        Self {
            nodes: grower.nodes,
            n_features: columns.len(),
        }
    }

    /// Class distribution of the leaf reached by `sample`.
    ///
    /// The caller guarantees `sample.len() == n_features`.
    pub(crate) fn leaf_distribution(&self, sample: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution, .. } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Mean decrease in impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), depth + 1));
                    stack.push((right.index(), depth + 1));
                }
            }
        }
        deepest
    }
}

struct Grower<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    limits: TreeLimits,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    fn grow(&mut self, samples: &[usize], depth: usize) -> NodeIndex {
        let n_samples = samples.len();
        let mut counts = vec![0usize; self.n_classes];
        for &s in samples {
            counts[self.labels[s]] += 1;
        }

        let stop = n_samples < self.limits.min_samples_split
            || Impurity::gini(&counts, n_samples).is_pure()
            || self.limits.max_depth.is_some_and(|max| depth >= max);

        let split = if stop {
            None
        } else {
            let candidates = self.sample_features();
            SplitSearch {
                columns: self.columns,
                labels: self.labels,
                samples,
                n_classes: self.n_classes,
                min_samples_leaf: self.limits.min_samples_leaf,
            }
            .best(&candidates)
        };

        let Some(split) = split else {
            return self.push_leaf(&counts, n_samples);
        };

        // Reserve the slot so children get higher indices, then patch it.
        let idx = self.push_leaf(&counts, n_samples);
        let left = self.grow(&split.left, depth + 1);
        let right = self.grow(&split.right, depth + 1);
        self.nodes[idx.index()] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };
        idx
    }

    /// Partial Fisher-Yates draw of `max_features` distinct columns.
    fn sample_features(&mut self) -> Vec<usize> {
        let n_features = self.columns.len();
        let mut order: Vec<usize> = (0..n_features).collect();
        for i in 0..self.limits.max_features {
            let j = self.rng.gen_range(i..n_features);
            order.swap(i, j);
        }
        order.truncate(self.limits.max_features);
        order
    }

    fn push_leaf(&mut self, counts: &[usize], n_samples: usize) -> NodeIndex {
        let total = n_samples.max(1) as f64;
        let distribution = counts.iter().map(|&c| c as f64 / total).collect();
        self.nodes.push(Node::Leaf {
            distribution,
            n_samples,
        });
        NodeIndex::new(self.nodes.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> TreeLimits {
        TreeLimits {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    fn columns_of(rows: &[[f64; 2]]) -> Vec<Vec<f64>> {
        (0..2).map(|f| rows.iter().map(|r| r[f]).collect()).collect()
    }

    #[test]
    fn pure_labels_give_single_leaf() {
        let columns = columns_of(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let tree = DecisionTree::grow(&columns, &[1, 1, 1], &[0, 1, 2], 2, limits(), 7);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.leaf_distribution(&[0.0, 0.0]), &[0.0, 1.0]);
        assert!(tree.feature_importances().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn separable_data_routes_correctly() {
        let columns = columns_of(&[
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [10.0, 0.0],
            [11.0, 0.0],
            [12.0, 0.0],
        ]);
        let labels = [0, 0, 0, 1, 1, 1];
        let samples: Vec<usize> = (0..6).collect();
        let tree = DecisionTree::grow(&columns, &labels, &samples, 2, limits(), 42);

        assert_eq!(tree.leaf_distribution(&[2.0, 0.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf_distribution(&[11.0, 0.0]), &[0.0, 1.0]);
        let importances = tree.feature_importances();
        assert!((importances[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn xor_grows_two_levels() {
        let columns = columns_of(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
        let tree = DecisionTree::grow(&columns, &[0, 1, 1, 0], &[0, 1, 2, 3], 2, limits(), 1);
        // Neither feature helps on its own, the second level separates the classes.
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.leaf_distribution(&[1.0, 1.0]), &[1.0, 0.0]);
    }

    #[test]
    fn max_depth_is_respected() {
        let columns = columns_of(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        let capped = TreeLimits {
            max_depth: Some(1),
            ..limits()
        };
        let tree = DecisionTree::grow(&columns, &[0, 1, 1, 0, 1], &[0, 1, 2, 3, 4], 2, capped, 3);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn min_samples_split_stops_growth() {
        let columns = columns_of(&[[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let strict = TreeLimits {
            min_samples_split: 4,
            ..limits()
        };
        let tree = DecisionTree::grow(&columns, &[0, 1, 1], &[0, 1, 2], 2, strict, 3);
        assert_eq!(tree.n_nodes(), 1);
        let dist = tree.leaf_distribution(&[1.0, 0.0]);
        assert!((dist[1] - 2.0 / 3.0).abs() < 1e-12);
    }
}
