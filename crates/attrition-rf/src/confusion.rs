//! Confusion matrix and per-class precision/recall/F1.

use std::fmt;

use crate::error::RfError;

/// Counts of `rows[actual][predicted]` over an evaluation set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    rows: Vec<Vec<usize>>,
}

/// Precision, recall, F1 and support for one class.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    pub class: usize,
    /// TP / (TP + FP), 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN), 0.0 when the class has no samples.
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ConfusionMatrix {
    /// Tally actual against predicted labels.
    ///
    /// The matrix is widened if a label exceeds `n_classes - 1`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | no labels |
    /// | [`RfError::LabelCountMismatch`] | `predicted.len() != actual.len()` |
    pub fn from_labels(
        actual: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if actual.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if actual.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: predicted.len(),
                n_labels: actual.len(),
            });
        }
        let width = actual
            .iter()
            .chain(predicted)
            .map(|&c| c + 1)
            .max()
            .unwrap_or(0)
            .max(n_classes);

        let mut rows = vec![vec![0usize; width]; width];
        for (&a, &p) in actual.iter().zip(predicted) {
            rows[a][p] += 1;
        }
        Ok(Self { rows })
    }

    /// Fraction of samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes()).map(|c| self.rows[c][c]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes())
            .map(|class| {
                let tp = self.rows[class][class];
                let predicted: usize = self.rows.iter().map(|row| row[class]).sum();
                let support: usize = self.rows[class].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.rows
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.iter().flatten().sum()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for c in 0..self.n_classes() {
            write!(f, " {:>8}", format!("pred {c}"))?;
        }
        writeln!(f)?;
        for (c, row) in self.rows.iter().enumerate() {
            write!(f, "{:>10}", format!("actual {c}"))?;
            for count in row {
                write!(f, " {count:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_counts_and_metrics() {
        // actual: 4 stay, 2 leave; one stay predicted leave, one leave predicted stay
        let actual = [0, 0, 0, 0, 1, 1];
        let predicted = [0, 0, 0, 1, 1, 0];
        let cm = ConfusionMatrix::from_labels(&actual, &predicted, 2).unwrap();

        assert_eq!(cm.as_rows(), &[vec![3, 1], vec![1, 1]]);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);

        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 0.75).abs() < 1e-12);
        assert!((metrics[0].recall - 0.75).abs() < 1e-12);
        assert_eq!(metrics[0].support, 4);
        assert!((metrics[1].precision - 0.5).abs() < 1e-12);
        assert!((metrics[1].f1 - 0.5).abs() < 1e-12);
        assert_eq!(metrics[1].support, 2);
    }

    #[test]
    fn never_predicted_class_has_zero_precision() {
        let cm = ConfusionMatrix::from_labels(&[0, 1, 1], &[0, 0, 0], 2).unwrap();
        let leave = &cm.class_metrics()[1];
        assert_eq!(leave.precision, 0.0);
        assert_eq!(leave.recall, 0.0);
        assert_eq!(leave.f1, 0.0);
    }

    #[test]
    fn widens_for_unexpected_label() {
        let cm = ConfusionMatrix::from_labels(&[0, 2], &[0, 2], 2).unwrap();
        assert_eq!(cm.n_classes(), 3);
        assert_eq!(cm.total(), 2);
    }

    #[test]
    fn empty_and_mismatched_inputs() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 2),
            Err(RfError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0], 2),
            Err(RfError::LabelCountMismatch { .. })
        ));
    }

    #[test]
    fn display_has_row_and_column_labels() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let text = cm.to_string();
        assert!(text.contains("pred 1"));
        assert!(text.contains("actual 0"));
    }
}
