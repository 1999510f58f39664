//! Weighted summary statistics and empirical CDFs

use crate::{Error, Result};

fn check_lengths(a: &[f64], weights: &[f64]) -> Result<()> {
    if a.len() != weights.len() {
        return Err(Error::LengthMismatch { what: "weights", left: weights.len(), right: a.len() });
    }
    if a.is_empty() { return Err(Error::EmptyData) }
    Ok(())
}

/// Values and weights sorted by value
fn sorted_pairs(a: &[f64], weights: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<_> = a.iter().copied().zip(weights.iter().copied()).collect();
    pairs.sort_by(|(x, _), (y, _)| x.total_cmp(y));
    pairs.into_iter().unzip()
}

fn total(weights: &[f64]) -> Result<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() { Ok(total) } else { Err(Error::EmptyData) }
}

/// Weighted percentiles of `a`, for each percentile (0 to 100) in `q`.
///
/// Each sample's weight is centred on its value: the cumulative weight
/// assigned to the `k`th smallest sample is `sum(w[..k]) + w[k]/2`,
/// normalized by the total weight. Percentiles are linearly interpolated
/// between samples and clamped to the smallest and largest samples, so `q = 0`
/// and `q = 100` give the minimum and maximum.
pub fn weighted_percentile(a: &[f64], q: &[f64], weights: &[f64]) -> Result<Vec<f64>> {
    check_lengths(a, weights)?;
    let (values, weights) = sorted_pairs(a, weights);
    let total = total(&weights)?;
    let mut running = 0.0;
    let centres: Vec<f64> = weights.iter()
        .map(|w| { let c = running + w / 2.0; running += w; c / total })
        .collect();
    Ok(q.iter().map(|q| interpolate(q / 100.0, &centres, &values)).collect())
}

/// Piecewise-linear interpolation of the points `(xs, ys)` at `x`; `xs` must
/// be non-decreasing. Beyond the ends, the end values are returned.
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if x <= xs[0]     { return ys[0] }
    if x >= xs[n - 1] { return ys[n - 1] }
    // First index whose abscissa exceeds x; 1 <= hi <= n-1
    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let dx = xs[hi] - xs[lo];
    if dx <= 0.0 { return ys[hi] }
    (ys[lo] + (ys[hi] - ys[lo]) * (x - xs[lo]) / dx).clamp(ys[lo], ys[hi])
}

pub fn weighted_mean(a: &[f64], weights: &[f64]) -> Result<f64> {
    check_lengths(a, weights)?;
    let total = total(weights)?;
    Ok(a.iter().zip(weights).map(|(a, w)| a * w).sum::<f64>() / total)
}

/// Weighted empirical cumulative distribution of some data: the sorted data
/// `x`, and at each point the fraction of the total weight at or below it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCdf {
    pub x: Vec<f64>,
    pub cdf: Vec<f64>,
}

impl EmpiricalCdf {

    pub fn new(data: &[f64], weights: &[f64]) -> Result<Self> {
        check_lengths(data, weights)?;
        let (x, weights) = sorted_pairs(data, weights);
        let total = total(&weights)?;
        let mut running = 0.0;
        let cdf = weights.iter()
            .map(|w| { running += w; running / total })
            .collect();
        Ok(Self { x, cdf })
    }

    pub fn len(&self) -> usize { self.x.len() }

    pub fn is_empty(&self) -> bool { self.x.is_empty() }

    /// Keep at most `max_points` points, evenly spaced in rank. The first and
    /// last points are always kept.
    pub fn thinned(self, max_points: usize) -> Self {
        let n = self.len();
        if max_points >= n || max_points < 2 { return self }
        let step = (n - 1) as f64 / (max_points - 1) as f64;
        let (x, cdf) = (0..max_points)
            .map(|k| ((k as f64 * step).round() as usize).min(n - 1))
            .map(|i| (self.x[i], self.cdf[i]))
            .unzip();
        Self { x, cdf }
    }

    /// Smallest data value whose cumulative fraction reaches `p`
    pub fn quantile(&self, p: f64) -> f64 {
        let i = self.cdf.partition_point(|&c| c < p).min(self.len() - 1);
        self.x[i]
    }
}
