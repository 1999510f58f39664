//! Least-squares fits of parametric CDFs to weighted empirical CDFs.
//!
//! Each fit minimizes the mean squared difference between a distribution's
//! CDF and the empirical CDF, using Nelder–Mead over `(ln shapes.., loc, ln
//! scale)`, so that shapes and scale stay positive without constraints.
//! Independent fits run on a fixed-size pool of worker threads.

use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use serde::{Deserialize, Serialize};

use crate::distributions::{Distribution, Support};
use crate::stats::EmpiricalCdf;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub max_iterations: u64,
    /// The empirical CDF is thinned to at most this many points before fitting
    pub max_points: usize,
    /// Worker threads; `None` means as many as there are CPUs
    pub threads: Option<usize>,
    /// Fits still running when this much time has passed are abandoned
    pub timeout: Option<Duration>,
    pub sd_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            max_points: 10_000,
            threads: None,
            timeout: None,
            sd_tolerance: 1e-10,
        }
    }
}

/// Result of fitting one distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdfFit {
    pub name: String,
    /// Shape parameters, followed by `loc` and `scale`
    pub params: Vec<f64>,
    pub param_names: Vec<String>,
    /// Mean squared deviation of the fitted CDF from the empirical CDF
    pub mse: f64,
    /// Largest absolute deviation of the fitted CDF from the empirical CDF
    pub ks: f64,
    pub n_points: usize,
    pub n_iter: u64,
    pub converged: bool,
}

// ----- Cost function ------------------------------------------------------------------------------------

struct CdfLeastSquares<'a> {
    distribution: Distribution,
    empirical: &'a EmpiricalCdf,
    deadline: Option<Instant>,
}

/// Map optimizer coordinates `(ln shapes.., loc, ln scale)` to distribution
/// parameters `(shapes.., loc, scale)`
fn from_search_space(p: &[f64]) -> Vec<f64> {
    let n = p.len();
    p.iter().enumerate()
        .map(|(i, &v)| if i == n - 2 { v } else { v.exp() })
        .collect()
}

fn to_search_space(params: &[f64]) -> Vec<f64> {
    let n = params.len();
    params.iter().enumerate()
        .map(|(i, &v)| if i == n - 2 { v } else { v.ln() })
        .collect()
}

fn mse(model: &dyn Fn(f64) -> f64, empirical: &EmpiricalCdf) -> f64 {
    let sum: f64 = empirical.x.iter().zip(&empirical.cdf)
        .map(|(&x, &c)| (model(x) - c).powi(2))
        .sum();
    sum / empirical.len() as f64
}

/// Kolmogorov-Smirnov statistic: compares the model with the empirical CDF
/// on both sides of each step
fn ks(model: &dyn Fn(f64) -> f64, empirical: &EmpiricalCdf) -> f64 {
    let mut below = 0.0;
    let mut worst: f64 = 0.0;
    for (&x, &c) in empirical.x.iter().zip(&empirical.cdf) {
        let m = model(x);
        worst = worst.max((m - c).abs()).max((m - below).abs());
        below = c;
    }
    worst
}

impl CostFunction for CdfLeastSquares<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(argmin::core::Error::msg("timed out"));
            }
        }
        let cost = self.distribution.cdf(&from_search_space(p))
            .map_or(f64::INFINITY, |cdf| mse(&cdf, self.empirical));
        // Nelder-Mead cannot order NaNs
        Ok(if cost.is_finite() { cost } else { f64::INFINITY })
    }
}

// ----- Single fit ---------------------------------------------------------------------------------------

/// Starting `(shapes.., loc, scale)` for fitting `distribution` to `cdf`
fn initial_params(distribution: Distribution, cdf: &EmpiricalCdf) -> Vec<f64> {
    let min = cdf.x[0];
    let max = cdf.x[cdf.len() - 1];
    let spread = max - min;
    let margin = if spread > 0.0 { 1e-3 * spread } else { 1e-3 };
    let positive_or_one = |v: f64| if v > 0.0 && v.is_finite() { v } else { 1.0 };
    let median = cdf.quantile(0.5);
    let (loc, scale) = match distribution.support() {
        Support::Real => {
            let half_iqr = (cdf.quantile(0.75) - cdf.quantile(0.25)) / 2.0;
            (median, positive_or_one(half_iqr))
        },
        Support::Above(lower) => {
            let scale = positive_or_one(median - min);
            (min - lower * scale - margin, scale)
        },
        Support::Unit => (min - margin, positive_or_one(spread + 2.0 * margin)),
    };
    let mut params = distribution.initial_shapes().to_vec();
    params.push(loc);
    params.push(scale);
    params
}

/// Nelder–Mead simplex around `start` (in search space)
fn initial_simplex(start: &[f64], scale: f64) -> Vec<Vec<f64>> {
    let n = start.len();
    let mut simplex = vec![start.to_vec()];
    for i in 0..n {
        let mut vertex = start.to_vec();
        vertex[i] += if i == n - 2 { 0.1 * scale } else { 0.5 };
        simplex.push(vertex);
    }
    simplex
}

/// Fit `distribution` to `cdf`. A fit that is still running at `deadline`
/// fails.
pub fn fit_cdf(
    cdf: &EmpiricalCdf,
    distribution: Distribution,
    options: &FitOptions,
    deadline: Option<Instant>,
) -> Result<CdfFit> {
    if cdf.is_empty() { return Err(Error::EmptyData) }
    let name = distribution.name();
    let failed = |reason: String| Error::FitFailed { name: name.to_string(), reason };

    let start = initial_params(distribution, cdf);
    let scale = start[start.len() - 1];
    let solver = NelderMead::new(initial_simplex(&to_search_space(&start), scale))
        .with_sd_tolerance(options.sd_tolerance)
        .map_err(|e| failed(e.to_string()))?;
    let problem = CdfLeastSquares { distribution, empirical: cdf, deadline };
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(options.max_iterations))
        .run()
        .map_err(|e| failed(e.to_string()))?;

    let state = result.state();
    let best = state.get_best_param()
        .ok_or_else(|| failed("optimizer produced no parameters".into()))?;
    if !state.get_best_cost().is_finite() {
        return Err(failed("no parameters describe the data".into()));
    }
    let params = from_search_space(best);
    let model = distribution.cdf(&params)
        .ok_or_else(|| failed(format!("invalid best-fit parameters {params:?}")))?;
    // A simplex whose vertices all cost the same passes the tolerance test
    // before taking a single step
    let converged = state.get_iter() > 0 && matches!(
        state.get_termination_status(),
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    let param_names = distribution.shape_names().iter().copied()
        .chain(["loc", "scale"])
        .map(str::to_string)
        .collect();
    Ok(CdfFit {
        name: name.to_string(),
        mse: mse(&model, cdf),
        ks: ks(&model, cdf),
        params,
        param_names,
        n_points: cdf.len(),
        n_iter: state.get_iter(),
        converged,
    })
}

// ----- Parallel fits ------------------------------------------------------------------------------------

/// Observer of the progress of `fit_distributions_to_data`
pub trait FitMonitor {
    fn fitting(&self, _names: &[&str]) {}
    fn finished(&self, _name: &str, _succeeded: bool) {}
}

impl FitMonitor for () {}

/// Fit each of `distributions` to the weighted `data`, in parallel.
///
/// Failed fits are dropped with a warning, as are fits that have not finished
/// when `options.timeout` expires. Results appear in the order in which the
/// distributions were requested, with duplicates fitted only once.
pub fn fit_distributions_to_data(
    data: &[f64],
    weights: &[f64],
    distributions: &[Distribution],
    options: &FitOptions,
    monitor: &dyn FitMonitor,
) -> Result<Vec<CdfFit>> {
    let mut unique = Vec::with_capacity(distributions.len());
    for &d in distributions {
        if !unique.contains(&d) { unique.push(d) }
    }
    if unique.is_empty() { return Err(Error::NoFitsSucceeded(options.timeout)) }

    let cdf = Arc::new(EmpiricalCdf::new(data, weights)?.thinned(options.max_points));
    let threads = options.threads.unwrap_or_else(rayon::current_num_threads).clamp(1, unique.len());
    log::debug!("fitting {} distributions to {} points on {threads} threads", unique.len(), cdf.len());

    let deadline = options.timeout.map(|t| Instant::now() + t);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let (tx, rx) = mpsc::channel();
    monitor.fitting(&unique.iter().map(|d| d.name()).collect::<Vec<_>>());
    for (index, &distribution) in unique.iter().enumerate() {
        let (tx, cdf, options) = (tx.clone(), Arc::clone(&cdf), options.clone());
        pool.spawn(move || {
            let fit = fit_cdf(&cdf, distribution, &options, deadline);
            // The receiver is gone only if the deadline passed
            let _ = tx.send((index, fit));
        });
    }
    drop(tx);

    let mut fits: Vec<Option<CdfFit>> = vec![None; unique.len()];
    let mut reported = vec![false; unique.len()];
    for _ in 0..unique.len() {
        let received = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())).ok(),
            None           => rx.recv().ok(),
        };
        let Some((index, fit)) = received else {
            log::warn!("timeout reached: abandoning fits still in progress");
            break;
        };
        let name = unique[index].name();
        reported[index] = true;
        match fit {
            Ok(fit) => {
                log::debug!("{name}: mse = {:.3e}, {} iterations", fit.mse, fit.n_iter);
                monitor.finished(name, true);
                fits[index] = Some(fit);
            },
            Err(e) => {
                log::warn!("{e}");
                monitor.finished(name, false);
            },
        }
    }

    for (distribution, _) in unique.iter().zip(&reported).filter(|(_, done)| !**done) {
        log::warn!("fit of `{distribution}` abandoned at timeout");
        monitor.finished(distribution.name(), false);
    }

    let fits: Vec<CdfFit> = fits.into_iter().flatten().collect();
    if fits.is_empty() { return Err(Error::NoFitsSucceeded(options.timeout)) }
    Ok(fits)
}
