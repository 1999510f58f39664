//! Fit error distributions of an extracted reco, and pick the best-fitting
//! distribution for each param.
//!
//! Results are identified by reco, params and a short hash of the set of
//! distributions that were fitted. The full list of distributions behind
//! each hash is recorded in `distributions_sha256/<hash>`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};
use crate::distributions::{canonical, Distribution};
use crate::extract::{valid_errors, RECOS_FILE, RECOS_GROUP, TRUTH_FILE};
use crate::fit::{fit_distributions_to_data, CdfFit, FitMonitor, FitOptions};
use crate::io::hdf5::{dataset_names, read_table, RecoEvent, Truth};
use crate::samples::{canonical_params, Param, TRUTH_DATASET};
use crate::utils::group_digits;

pub const DISTS_HASH_DIR: &str = "distributions_sha256";

/// Fits of each distribution (by name) to the errors in each param
pub type FitInfo = BTreeMap<Param, BTreeMap<String, CdfFit>>;

/// First 10 hex digits of the SHA-256 of the sorted, space-separated
/// distribution names; and those names.
pub fn distributions_hash(distributions: &[Distribution]) -> (String, String) {
    let names = canonical(distributions).iter().map(|d| d.name()).join(" ");
    let digest = Sha256::digest(names.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(10);
    (hash, names)
}

fn joined_params(params: &[Param]) -> String { params.iter().map(|p| p.name()).join(",") }

pub fn fit_info_path(datadir: &Path, reco: &str, params: &[Param], hash: &str) -> PathBuf {
    datadir.join(format!("fit_info__reco={reco}__params={}__dists_sha256={hash}.json", joined_params(params)))
}

pub fn best_fits_path(datadir: &Path, reco: &str, params: &[Param], hash: &str) -> PathBuf {
    datadir.join(format!("best_fits__reco={reco}__params={}__dists_sha256={hash}.json", joined_params(params)))
}

/// Record which distributions `hash` stands for, unless already recorded
fn record_hash(datadir: &Path, hash: &str, names: &str) -> Result<()> {
    let dir = datadir.join(DISTS_HASH_DIR);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(hash);
    if !path.is_file() {
        std::fs::write(&path, format!("{hash}  {names}\n"))?;
    }
    Ok(())
}

/// Truth, and the records of `reco`, as written by `extract`
pub fn read_extracted(datadir: &Path, reco: &str) -> Result<(Vec<Truth>, Vec<RecoEvent>)> {
    let truth = read_table::<Truth>(&datadir.join(TRUTH_FILE), TRUTH_DATASET)?;
    let recos_path = datadir.join(RECOS_FILE);
    if !dataset_names(&recos_path, RECOS_GROUP)?.iter().any(|name| name == reco) {
        return Err(Error::UnknownReco(reco.to_string()));
    }
    let records = read_table::<RecoEvent>(&recos_path, &format!("{RECOS_GROUP}/{reco}"))?;
    Ok((truth.to_vec(), records.to_vec()))
}

/// Fit `distributions` to the errors of `reco` in each of `params`, using
/// the data that `extract` wrote to `datadir`. Returns the path of the file
/// containing the fit results.
pub fn fit(
    datadir: &Path,
    reco: &str,
    params: &[Param],
    distributions: &[Distribution],
    options: &FitOptions,
    monitor: &dyn FitMonitor,
) -> Result<PathBuf> {
    if !datadir.is_dir() { return Err(Error::NotADirectory(datadir.to_path_buf())) }
    let params = canonical_params(params);
    let distributions = canonical(distributions);
    let (hash, names) = distributions_hash(&distributions);
    record_hash(datadir, &hash, &names)?;

    let (truth, records) = read_extracted(datadir, reco)?;
    log::info!("fitting reco \"{reco}\" params {} with distributions (sha256={hash}) {}",
               joined_params(&params), names.replace(' ', ","));

    let mut info = FitInfo::new();
    for &param in &params {
        let (errors, weights, n_invalid) = valid_errors(&records, &truth, param)?;
        if errors.is_empty() {
            return Err(Error::NoValidErrors { reco: reco.to_string(), param });
        }
        log::info!("fitting reco \"{reco}\" param \"{param}\": {} valid errors ({} invalid)",
                   group_digits(errors.len()), group_digits(n_invalid));
        let start = Instant::now();
        let fits = fit_distributions_to_data(&errors, &weights, &distributions, options, monitor)?;
        log::info!("fitting \"{param}\" took {:.1} s", start.elapsed().as_secs_f32());
        info.insert(param, fits.into_iter().map(|f| (f.name.clone(), f)).collect());
    }

    let path = fit_info_path(datadir, reco, &params, &hash);
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &info)?;
    log::info!("wrote results to {}", path.display());
    Ok(path)
}

pub fn read_fit_info(path: &Path) -> Result<FitInfo> {
    Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
}

// ----- Summarizing ---------------------------------------------------------------------------------------

/// Criterion for choosing the best fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Mean squared CDF deviation
    #[default]
    Mse,
    /// Largest CDF deviation
    Ks,
}

impl Metric {
    pub fn of(self, fit: &CdfFit) -> f64 {
        match self {
            Metric::Mse => fit.mse,
            Metric::Ks  => fit.ks,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Metric::Mse => "mse", Metric::Ks => "ks" })
    }
}

impl FromStr for Metric {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mse" => Ok(Metric::Mse),
            "ks"  => Ok(Metric::Ks),
            other => Err(format!("unknown metric `{other}` (expected mse or ks)")),
        }
    }
}

/// Fits sorted from best to worst according to `metric`
pub fn ranked(fits: &BTreeMap<String, CdfFit>, metric: Metric) -> Vec<&CdfFit> {
    fits.values()
        .sorted_by(|a, b| metric.of(a).total_cmp(&metric.of(b)))
        .collect()
}

/// The distribution that best describes the errors in one param
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    pub param: Param,
    pub metric: Metric,
    pub value: f64,
    pub fit: CdfFit,
}

/// Choose the best fit for each param from the results of `fit`, write the
/// choices next to them, and return them.
pub fn summarize(
    datadir: &Path,
    reco: &str,
    params: &[Param],
    distributions: &[Distribution],
    metric: Metric,
) -> Result<(PathBuf, Vec<BestFit>)> {
    let params = canonical_params(params);
    let (hash, _) = distributions_hash(distributions);
    let info_path = fit_info_path(datadir, reco, &params, &hash);
    let info = read_fit_info(&info_path)?;

    let mut best = vec![];
    for &param in &params {
        let missing = || Error::MissingFitInfo { path: info_path.clone(), param };
        let fits = info.get(&param).ok_or_else(missing)?;
        let fit = ranked(fits, metric).into_iter().next().ok_or_else(missing)?;
        log::info!("{param}: best fit is {} with {metric} = {:.3e}", fit.name, metric.of(fit));
        best.push(BestFit { param, metric, value: metric.of(fit), fit: fit.clone() });
    }

    let path = best_fits_path(datadir, reco, &params, &hash);
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &best)?;
    Ok((path, best))
}
