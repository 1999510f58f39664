//! Extract truth and reco records from the event samples, summarize how well
//! each reco performs, and store everything needed for fitting priors.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use crate::io::hdf5::{write_table, write_tables, Params, RecoEvent, Truth};
use crate::samples::{read_reco, read_truth, FitStatus, Flavour, Param, PathProto, TRUTH_DATASET};
use crate::stats::{weighted_mean, weighted_percentile};

pub const RECO_PERF_FILE: &str = "reco_perf.json";
pub const TRUTH_FILE: &str = "truth.h5";
pub const RECOS_FILE: &str = "recos.h5";
pub const RECOS_GROUP: &str = "recos";

/// Summary of one reco's errors in one param
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoPerf {
    pub reco: String,
    pub param: Param,
    pub n_invalid: usize,
    pub err_mean: f64,
    pub err_median: f64,
    pub err_min: f64,
    pub err_max: f64,
    /// Width of the central 50% of errors
    pub err_iq50: f64,
    /// Width of the central 90% of errors
    pub err_iq90: f64,
    pub err_absmean: f64,
    pub err_absmedian: f64,
    pub err_absmin: f64,
    pub err_absmax: f64,
}

/// Truth and reco records of all flavours, concatenated in flavour order,
/// along with the per-reco performance summary
#[derive(Debug, Clone)]
pub struct Extracted {
    pub perf: Vec<RecoPerf>,
    /// Records of each reco that matches truth event-for-event, in requested
    /// order
    pub recos: Vec<(String, Vec<RecoEvent>)>,
    pub truth: Vec<Truth>,
}

/// Errors (`reco - truth`) in `param` of the events whose reco succeeded,
/// their truth weights, and the number of events that were discarded.
pub fn valid_errors(reco: &[RecoEvent], truth: &[Truth], param: Param) -> Result<(Vec<f64>, Vec<f64>, usize)> {
    if reco.len() != truth.len() {
        return Err(Error::LengthMismatch { what: "reco", left: reco.len(), right: truth.len() });
    }
    let (errors, weights): (Vec<f64>, Vec<f64>) = reco.iter().zip(truth)
        .filter(|(r, _)| FitStatus::from_code(r.fit_status) == Some(FitStatus::OK))
        .map(|(r, t)| (r.param(param) as f64 - t.param(param) as f64, t.weight as f64))
        .filter(|(err, _)| err.is_finite())
        .unzip();
    let n_invalid = reco.len() - errors.len();
    Ok((errors, weights, n_invalid))
}

/// Summarize the errors of `reco` in `param`
pub fn reco_performance(reco: &str, param: Param, records: &[RecoEvent], truth: &[Truth]) -> Result<RecoPerf> {
    let (errors, weights, n_invalid) = valid_errors(records, truth, param)?;
    if errors.is_empty() {
        return Err(Error::NoValidErrors { reco: reco.to_string(), param });
    }
    let q = weighted_percentile(&errors, &[0.0, 5.0, 25.0, 50.0, 75.0, 95.0, 100.0], &weights)?;
    let &[min, q5, q25, median, q75, q95, max] = q.as_slice() else { return Err(Error::EmptyData) };
    let mean = weighted_mean(&errors, &weights)?;
    Ok(RecoPerf {
        reco: reco.to_string(),
        param,
        n_invalid,
        err_mean: mean,
        err_median: median,
        err_min: min,
        err_max: max,
        err_iq50: q75 - q25,
        err_iq90: q95 - q5,
        err_absmean: mean.abs(),
        err_absmedian: median.abs(),
        err_absmin: min.abs(),
        err_absmax: max.abs(),
    })
}

/// Read truth and the requested recos for every flavour, and summarize each
/// reco's performance in each param. When `outdir` is given, the summary
/// and the concatenated records are written there.
pub fn extract(
    proto: &PathProto,
    flavours: &[Flavour],
    recos: &[String],
    params: &[Param],
    outdir: Option<&Path>,
) -> Result<Extracted> {
    let mut truth = vec![];
    let mut reco_records: Vec<(String, Vec<RecoEvent>)> = recos.iter().map(|r| (r.clone(), vec![])).collect();

    for &flavour in flavours {
        let (flavour_truth, n_samples) = read_truth(proto, flavour)?;
        log::info!("flavour {flavour}: {} truth events in {n_samples} samples", flavour_truth.len());
        for (reco, records) in reco_records.iter_mut() {
            let (vals, _) = read_reco(proto, flavour, reco)?;
            if vals.len() != flavour_truth.len() {
                log::warn!("abs_flav {flavour} reco \"{reco}\" has len {} but truth has len {}",
                           vals.len(), flavour_truth.len());
            }
            records.extend(vals);
        }
        truth.extend(flavour_truth);
    }

    reco_records.retain(|(reco, records)| {
        let usable = records.len() == truth.len();
        if records.is_empty() {
            log::warn!("no records found for reco \"{reco}\"");
        } else if !usable {
            log::warn!("excluding reco \"{reco}\": {} records cannot be paired with {} truth events",
                       records.len(), truth.len());
        }
        usable && !records.is_empty()
    });

    let mut perf = vec![];
    for (reco, records) in &reco_records {
        for &param in params {
            perf.push(reco_performance(reco, param, records, &truth)?);
        }
    }
    perf.sort_by(|a, b| (&a.reco, a.param.name()).cmp(&(&b.reco, b.param.name())));

    let extracted = Extracted { perf, recos: reco_records, truth };
    if let Some(outdir) = outdir {
        write_extracted(&extracted, outdir)?;
    }
    Ok(extracted)
}

/// Write `reco_perf.json`, `truth.h5` and `recos.h5` into `outdir`
pub fn write_extracted(extracted: &Extracted, outdir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(outdir)?;
    let perf_path = outdir.join(RECO_PERF_FILE);
    serde_json::to_writer_pretty(BufWriter::new(File::create(&perf_path)?), &extracted.perf)?;

    let truth_path = outdir.join(TRUTH_FILE);
    write_table(&truth_path, TRUTH_DATASET, &extracted.truth)?;

    let recos_path = outdir.join(RECOS_FILE);
    write_tables(&recos_path, extracted.recos.iter()
                 .map(|(reco, records)| (format!("{RECOS_GROUP}/{reco}"), records.as_slice())))?;
    log::info!("wrote {}, {} and {}", perf_path.display(), truth_path.display(), recos_path.display());
    Ok(vec![perf_path, truth_path, recos_path])
}

pub fn read_reco_perf(path: &Path) -> Result<Vec<RecoPerf>> {
    Ok(serde_json::from_reader(std::io::BufReader::new(File::open(path)?))?)
}

// ----- TESTS ------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use crate::io::hdf5::read_table;
    use crate::samples::{reco_path, truth_path, RECO_DATASET};
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn truth(x: f32, weight: f32) -> Truth { Truth { x, y: 0.0, z: 0.0, time: 100.0, weight } }
    fn reco (x: f32, fit_status: i8) -> RecoEvent { RecoEvent { x, y: 0.0, z: 0.0, time: 101.0, fit_status } }

    #[test]
    fn invalid_events_are_discarded() {
        let t = [truth(0.0, 1.0), truth(1.0, 2.0), truth(2.0, 3.0), truth(3.0, 4.0)];
        let r = [reco(0.5, 0), reco(f32::NAN, 0), reco(2.0, 30), reco(2.0, 0)];
        let (errors, weights, n_invalid) = valid_errors(&r, &t, Param::X).unwrap();
        assert_eq!(errors, vec![0.5, -1.0]);
        assert_eq!(weights, vec![1.0, 4.0]);
        assert_eq!(n_invalid, 2);
    }

    #[test]
    fn mismatched_lengths_cannot_be_paired() {
        let t = [truth(0.0, 1.0)];
        assert!(matches!(valid_errors(&[], &t, Param::X), Err(Error::LengthMismatch { .. })));
    }

    #[test]
    fn performance_summary() {
        let t: Vec<_> = (0..4).map(|_| truth(0.0, 1.0)).collect();
        let r = [reco(-2.0, 0), reco(1.0, 0), reco(2.0, 0), reco(3.0, 0)];
        let perf = reco_performance("A", Param::X, &r, &t).unwrap();
        assert_eq!(perf.n_invalid, 0);
        assert_float_eq!(perf.err_mean  , 1.0, ulps <= 1);
        assert_float_eq!(perf.err_median, 1.5, ulps <= 1);
        assert_float_eq!(perf.err_min   , -2.0, ulps <= 1);
        assert_float_eq!(perf.err_absmin, 2.0, ulps <= 1);
        assert_float_eq!(perf.err_max   , 3.0, ulps <= 1);
        assert_float_eq!(perf.err_iq50  , 2.5 - (-0.5), ulps <= 2);
        let time = reco_performance("A", Param::Time, &r, &t).unwrap();
        assert_float_eq!(time.err_median, 1.0, ulps <= 1);
        assert_float_eq!(time.err_iq90  , 0.0, abs <= 1e-12);
    }

    #[test]
    fn all_invalid_is_an_error() {
        let t = [truth(0.0, 1.0)];
        let r = [reco(0.0, 10)];
        assert!(matches!(reco_performance("A", Param::X, &r, &t),
                         Err(Error::NoValidErrors { param: Param::X, .. })));
    }

    #[test]
    fn extract_concatenates_and_writes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let proto: PathProto = format!("{}/{{abs_flav}}/{{i:02}}", dir.path().display()).parse()?;
        let write_sample = |flavour, i, t: &[Truth], recos: &[(&str, &[RecoEvent])]| -> Result<()> {
            let sample = proto.path(flavour, i);
            std::fs::create_dir_all(sample.join("recos"))?;
            write_table(&truth_path(&sample), TRUTH_DATASET, t)?;
            for (name, records) in recos {
                write_table(&reco_path(&sample, name), RECO_DATASET, records)?;
            }
            Ok(())
        };
        let t = [truth(1.0, 1.0), truth(2.0, 1.0)];
        let good = [reco(1.5, 0), reco(2.5, 0)];
        write_sample(Flavour::NuE , 0, &t, &[("Good", &good[..]), ("Partial", &good[..])])?;
        write_sample(Flavour::NuE , 1, &t, &[("Good", &good[..])])?;
        write_sample(Flavour::NuMu, 0, &t, &[("Good", &good[..]), ("Partial", &good[..])])?;
        // A gap in the numbering ends the sequence
        write_sample(Flavour::NuMu, 2, &t, &[("Good", &good[..])])?;

        let outdir = dir.path().join("out");
        let recos = vec!["Partial".to_string(), "Good".to_string()];
        let extracted = extract(&proto, &Flavour::ALL, &recos, &[Param::X, Param::Time], Some(&outdir))?;

        assert_eq!(extracted.truth.len(), 6);
        assert_eq!(extracted.recos.len(), 1);
        assert_eq!(extracted.recos[0].0, "Good");
        let rows: Vec<_> = extracted.perf.iter().map(|p| (p.reco.as_str(), p.param)).collect();
        assert_eq!(rows, vec![("Good", Param::Time), ("Good", Param::X)]);
        assert_float_eq!(extracted.perf[1].err_median, 0.5, abs <= 1e-6);

        assert_eq!(read_reco_perf(&outdir.join(RECO_PERF_FILE))?, extracted.perf);
        assert_eq!(read_table::<Truth>(&outdir.join(TRUTH_FILE), TRUTH_DATASET)?.len(), 6);
        assert_eq!(read_table::<RecoEvent>(&outdir.join(RECOS_FILE), "recos/Good")?.len(), 6);
        Ok(())
    }
}
