//! Performance metrics for concept drift
//!
//! Accuracy and rank-based ROC AUC against ground truth, plus the
//! symmetric KL divergence used as a prediction-distribution proxy when
//! labels are unavailable.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Fraction of predictions matching the ground truth.
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (**t - **p).abs() < 1e-9)
        .count();
    correct as f64 / y_true.len() as f64
}

/// ROC AUC of predictions against ground truth.
///
/// Binary labels use the Mann-Whitney rank statistic directly; more than
/// two classes fall back to macro-averaged one-vs-rest. Returns None when
/// the ground truth holds a single class (AUC is undefined).
pub fn roc_auc(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    let mut classes: Vec<f64> = y_true.to_vec();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    classes.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    match classes.len() {
        0 | 1 => None,
        2 => {
            let positive = classes[1];
            let is_positive: Vec<bool> =
                y_true.iter().map(|t| (t - positive).abs() < 1e-9).collect();
            binary_auc(&is_positive, y_pred)
        }
        _ => {
            let mut aucs = Vec::new();
            for class in &classes {
                let is_positive: Vec<bool> =
                    y_true.iter().map(|t| (t - class).abs() < 1e-9).collect();
                let scores: Vec<f64> = y_pred
                    .iter()
                    .map(|p| if (p - class).abs() < 1e-9 { 1.0 } else { 0.0 })
                    .collect();
                if let Some(auc) = binary_auc(&is_positive, &scores) {
                    aucs.push(auc);
                }
            }
            if aucs.is_empty() {
                None
            } else {
                Some(aucs.iter().sum::<f64>() / aucs.len() as f64)
            }
        }
    }
}

/// Mann-Whitney AUC with midranks for tied scores.
fn binary_auc(is_positive: &[bool], scores: &[f64]) -> Option<f64> {
    let n = scores.len();
    let n_pos = is_positive.iter().filter(|&&p| p).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let midrank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = midrank;
        }
        i = j + 1;
    }

    let rank_sum: f64 = (0..n).filter(|&k| is_positive[k]).map(|k| ranks[k]).sum();
    let auc = (rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64;
    Some(auc)
}

/// Normalized distribution of predicted labels.
pub fn label_distribution(predictions: &[f64]) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for &p in predictions {
        *counts.entry(format_label(p)).or_insert(0) += 1;
    }
    let total = predictions.len();
    if total == 0 {
        return BTreeMap::new();
    }
    counts
        .into_iter()
        .map(|(k, c)| (k, c as f64 / total as f64))
        .collect()
}

/// Symmetric KL divergence between two label distributions over the union
/// of their categories, with additive smoothing so disjoint support stays
/// finite.
pub fn symmetric_kl(
    reference: &BTreeMap<String, f64>,
    current: &BTreeMap<String, f64>,
) -> f64 {
    const SMOOTHING: f64 = 1e-8;

    let keys: BTreeSet<&String> = reference.keys().chain(current.keys()).collect();
    if keys.is_empty() {
        return 0.0;
    }

    let mut p: Vec<f64> = keys
        .iter()
        .map(|k| reference.get(*k).copied().unwrap_or(0.0) + SMOOTHING)
        .collect();
    let mut q: Vec<f64> = keys
        .iter()
        .map(|k| current.get(*k).copied().unwrap_or(0.0) + SMOOTHING)
        .collect();

    let p_sum: f64 = p.iter().sum();
    let q_sum: f64 = q.iter().sum();
    for v in &mut p {
        *v /= p_sum;
    }
    for v in &mut q {
        *v /= q_sum;
    }

    0.5 * (kl_divergence(&p, &q) + kl_divergence(&q, &p))
}

fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| pi * (pi / qi).ln())
        .sum()
}

/// Class labels are formatted without a trailing decimal when integral so
/// distribution keys match across JSON round trips.
pub fn format_label(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let y_true = vec![1.0, 0.0, 1.0, 0.0];
        let y_pred = vec![1.0, 0.0, 0.0, 0.0];
        assert!((accuracy(&y_true, &y_pred) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_perfect_and_reversed() {
        let y_true = vec![0.0, 0.0, 1.0, 1.0];
        assert!((roc_auc(&y_true, &[0.0, 0.0, 1.0, 1.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!(roc_auc(&y_true, &[1.0, 1.0, 0.0, 0.0]).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_auc_chance_level_on_constant_scores() {
        let y_true = vec![0.0, 1.0, 0.0, 1.0];
        let auc = roc_auc(&y_true, &[1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_undefined() {
        let y_true = vec![1.0, 1.0, 1.0];
        assert!(roc_auc(&y_true, &[1.0, 0.0, 1.0]).is_none());
    }

    #[test]
    fn test_auc_multiclass_one_vs_rest() {
        let y_true = vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let perfect = roc_auc(&y_true, &y_true).unwrap();
        assert!((perfect - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_label_distribution() {
        let dist = label_distribution(&[1.0, 1.0, 0.0, 1.0]);
        assert!((dist["1"] - 0.75).abs() < 1e-12);
        assert!((dist["0"] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_kl_identical_is_zero() {
        let mut dist = BTreeMap::new();
        dist.insert("0".to_string(), 0.4);
        dist.insert("1".to_string(), 0.6);
        assert!(symmetric_kl(&dist, &dist).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric_kl_disjoint_is_large() {
        let mut p = BTreeMap::new();
        p.insert("0".to_string(), 1.0);
        let mut q = BTreeMap::new();
        q.insert("1".to_string(), 1.0);
        assert!(symmetric_kl(&p, &q) > 1.0);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(0.0), "0");
        assert_eq!(format_label(1.5), "1.5");
    }
}
