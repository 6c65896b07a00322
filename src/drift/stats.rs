//! Statistical tests for distribution comparison
//!
//! Two-sample Kolmogorov-Smirnov for numeric features and chi-squared
//! goodness-of-fit for categorical features, both reporting asymptotic
//! p-values.

use ndarray::Array1;
use std::cmp::Ordering;

/// Two-sample Kolmogorov-Smirnov test.
///
/// Returns `(statistic, p_value)`. The statistic is the maximum absolute
/// difference between the two empirical CDFs; the p-value uses the
/// asymptotic Kolmogorov distribution with effective sample size
/// `n1*n2/(n1+n2)`. An empty sample on either side yields `(0.0, 1.0)`.
pub fn ks_two_sample(reference: &Array1<f64>, sample: &Array1<f64>) -> (f64, f64) {
    if reference.is_empty() || sample.is_empty() {
        return (0.0, 1.0);
    }

    let mut ref_sorted: Vec<f64> = reference.iter().copied().collect();
    let mut smp_sorted: Vec<f64> = sample.iter().copied().collect();
    ref_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    smp_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n1 = ref_sorted.len();
    let n2 = smp_sorted.len();

    // Walk both sorted samples, advancing past ties before comparing CDFs
    let mut statistic = 0.0f64;
    let mut i = 0usize;
    let mut j = 0usize;
    while i < n1 && j < n2 {
        let v = ref_sorted[i].min(smp_sorted[j]);
        while i < n1 && ref_sorted[i] <= v {
            i += 1;
        }
        while j < n2 && smp_sorted[j] <= v {
            j += 1;
        }
        let diff = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        statistic = statistic.max(diff);
    }

    let n_eff = (n1 as f64 * n2 as f64) / (n1 as f64 + n2 as f64);
    let lambda = statistic * n_eff.sqrt();
    (statistic, ks_p_value(lambda))
}

/// Chi-squared goodness-of-fit test.
///
/// `observed` and `expected` are aligned count vectors over the same
/// category union; degrees of freedom are `len - 1`. Returns
/// `(statistic, p_value)`.
pub fn chi_square_gof(observed: &[f64], expected: &[f64]) -> (f64, f64) {
    let mut statistic = 0.0;
    for (&o, &e) in observed.iter().zip(expected.iter()) {
        if e > 0.0 {
            statistic += (o - e).powi(2) / e;
        }
    }
    let df = observed.len().saturating_sub(1);
    (statistic, chi_square_p_value(statistic, df))
}

/// Survival function of the Kolmogorov distribution,
/// `P(D > d) = 2 * sum_{k>=1} (-1)^{k+1} exp(-2 k^2 lambda^2)`.
pub fn ks_p_value(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100u32 {
        let term = (-2.0 * f64::from(k * k) * lambda * lambda).exp();
        if k % 2 == 1 {
            sum += term;
        } else {
            sum -= term;
        }
        if term < 1e-10 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Upper-tail chi-squared p-value via the Wilson-Hilferty cube-root
/// normal approximation.
pub fn chi_square_p_value(statistic: f64, df: usize) -> f64 {
    if df == 0 || statistic <= 0.0 {
        return 1.0;
    }
    let k = df as f64;
    let cube = (statistic / k).powf(1.0 / 3.0);
    let mean = 1.0 - 2.0 / (9.0 * k);
    let sd = (2.0 / (9.0 * k)).sqrt();
    let z = (cube - mean) / sd;
    normal_sf(z)
}

/// Standard normal survival function `P(Z > z)`.
fn normal_sf(z: f64) -> f64 {
    0.5 * (1.0 - erf(z / std::f64::consts::SQRT_2))
}

/// Error function, Abramowitz & Stegun 7.1.26 polynomial approximation.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}
