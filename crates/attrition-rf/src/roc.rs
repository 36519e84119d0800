//! Area under the ROC curve for binary labels.

use crate::error::RfError;

/// ROC-AUC of `scores` against binary `labels` (class 1 is positive).
///
/// Computed from the Mann-Whitney U statistic; tied scores share their
/// average rank, so a constant scorer yields 0.5.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::EmptyDataset`] | no labels |
/// | [`RfError::ScoreCountMismatch`] | `scores.len() != labels.len()` |
/// | [`RfError::TooFewClasses`] | only positives or only negatives |
pub fn roc_auc(labels: &[usize], scores: &[f64]) -> Result<f64, RfError> {
    if labels.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if labels.len() != scores.len() {
        return Err(RfError::ScoreCountMismatch {
            n_labels: labels.len(),
            n_scores: scores.len(),
        });
    }

    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(RfError::TooFewClasses { n_present: 1 });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean.
        let avg_rank = (start + end + 1) as f64 / 2.0;
        let tied_pos = order[start..end].iter().filter(|&&i| labels[i] == 1).count();
        pos_rank_sum += avg_rank * tied_pos as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let u = pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking() {
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_ranking() {
        let auc = roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!(auc.abs() < 1e-12);
    }

    #[test]
    fn constant_scores_give_half() {
        let auc = roc_auc(&[0, 1, 0, 1, 1], &[0.3; 5]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn known_value_with_tie() {
        // pairs (pos, neg): (0.8,0.1)=1 (0.8,0.8)=0.5 (0.4,0.1)=1 (0.4,0.8)=0
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.8, 0.8, 0.4]).unwrap();
        assert!((auc - 2.5 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_rejected() {
        assert!(matches!(
            roc_auc(&[1, 1], &[0.2, 0.4]),
            Err(RfError::TooFewClasses { n_present: 1 })
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(matches!(
            roc_auc(&[0, 1], &[0.2]),
            Err(RfError::ScoreCountMismatch {
                n_labels: 2,
                n_scores: 1
            })
        ));
    }
}
