//! Exact CART split search on the Gini criterion.

use crate::node::{FeatureIndex, Impurity};

/// Best split found for one node.
#[derive(Debug, Clone)]
pub(crate) struct Split {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) impurity_decrease: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Read-only view of a node's training data used during split search.
///
/// `columns[feature][sample]` is column-major; `samples` indexes into the
/// inner vectors.
pub(crate) struct SplitSearch<'a> {
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) samples: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    /// Scan every boundary of every candidate feature and keep the split with
    /// the largest weighted impurity decrease.
    ///
    /// Returns `None` when no candidate has two distinct values separated by
    /// at least `min_samples_leaf` samples on each side.
    pub(crate) fn best(&self, candidates: &[usize]) -> Option<Split> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }

        let mut parent_counts = vec![0usize; self.n_classes];
        for &s in self.samples {
            parent_counts[self.labels[s]] += 1;
        }
        let parent_term = n as f64 * Impurity::gini(&parent_counts, n).value();

        let mut best: Option<(usize, f64, f64)> = None;
        let mut ordered: Vec<(f64, usize)> = Vec::with_capacity(n);

        for &feature in candidates {
            let column = &self.columns[feature];
            ordered.clear();
            ordered.extend(self.samples.iter().map(|&s| (column[s], self.labels[s])));
            ordered.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.clone();

            for i in 0..n - 1 {
                let (value, label) = ordered[i];
                left_counts[label] += 1;
                right_counts[label] -= 1;

                let next = ordered[i + 1].0;
                if value == next {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let decrease = parent_term
                    - n_left as f64 * Impurity::gini(&left_counts, n_left).value()
                    - n_right as f64 * Impurity::gini(&right_counts, n_right).value();

                if best.is_none_or(|(_, _, d)| decrease > d) {
                    best = Some((feature, (value + next) / 2.0, decrease));
                }
            }
        }

        let (feature, threshold, impurity_decrease) = best?;
        let column = &self.columns[feature];
        let (left, right): (Vec<usize>, Vec<usize>) =
            self.samples.iter().partition(|&&s| column[s] <= threshold);

        Some(Split {
            feature: FeatureIndex::new(feature),
            threshold,
            impurity_decrease,
            left,
            right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SplitSearch;

    fn search<'a>(
        columns: &'a [Vec<f64>],
        labels: &'a [usize],
        samples: &'a [usize],
        min_samples_leaf: usize,
    ) -> SplitSearch<'a> {
        SplitSearch {
            columns,
            labels,
            samples,
            n_classes: 2,
            min_samples_leaf,
        }
    }

    #[test]
    fn finds_the_separating_boundary() {
        let columns = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let samples: Vec<usize> = (0..6).collect();

        let split = search(&columns, &labels, &samples, 1)
            .best(&[0])
            .expect("separable data must split");

        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < f64::EPSILON);
        assert_eq!(split.left, vec![0, 1, 2]);
        assert_eq!(split.right, vec![3, 4, 5]);
        // Parent gini 0.5 over 6 samples, both children pure.
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn prefers_informative_feature() {
        let columns = vec![
            vec![5.0, 1.0, 5.0, 1.0],
            vec![0.0, 0.0, 9.0, 9.0],
        ];
        let labels = vec![0, 0, 1, 1];
        let samples: Vec<usize> = (0..4).collect();

        let split = search(&columns, &labels, &samples, 1).best(&[0, 1]).unwrap();
        assert_eq!(split.feature.index(), 1);
    }

    #[test]
    fn constant_column_has_no_split() {
        let columns = vec![vec![4.0; 4]];
        let labels = vec![0, 1, 0, 1];
        let samples: Vec<usize> = (0..4).collect();
        assert!(search(&columns, &labels, &samples, 1).best(&[0]).is_none());
    }

    #[test]
    fn respects_min_samples_leaf() {
        let columns = vec![vec![1.0, 2.0, 3.0]];
        let labels = vec![0, 1, 1];
        let samples: Vec<usize> = (0..3).collect();
        assert!(search(&columns, &labels, &samples, 2).best(&[0]).is_none());
    }
}
