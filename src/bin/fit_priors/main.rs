mod cli;
mod progress;

fn main() -> Result<(), Box<dyn Error>> {
    let Cli { config, v, command } = Cli::parse();
    init_logging(v);
    let config = match config {
        Some(path) => read_config_file(&expand(path)?)?,
        None       => Config::default(),
    };
    match command {
        Command::Extract { outdir, path_proto, flavours, recos, params } => {
            let proto: PathProto = match path_proto.or_else(|| config.path_proto.clone()) {
                Some(proto) => proto.parse()?,
                None        => PathProto::default(),
            };
            let flavours = choose(flavours, &config.flavours, || Flavour::ALL.to_vec());
            let recos    = choose(recos   , &config.recos   , default_recos);
            let params   = choose(params  , &config.params  , || Param::ALL.to_vec());
            run_extract(&proto, &flavours, &recos, &params, &expand(outdir)?)
        },
        Command::Fit { datadir, reco, params, distributions, timeout, threads, max_points, max_iterations } => {
            let params        = choose(params       , &config.params       , || Param::ALL.to_vec());
            let distributions = choose(distributions, &config.distributions, || Distribution::ALL.to_vec());
            let mut options = config.fit_options();
            if let Some(timeout) = timeout {
                options.timeout = Some(duration(timeout).ok_or("timeout must be a non-negative time")?);
            }
            if threads       .is_some() { options.threads = threads }
            if let Some(n) = max_points     { options.max_points     = n }
            if let Some(n) = max_iterations { options.max_iterations = n }
            run_fit(&expand(datadir)?, &reco, &params, &distributions, &options)
        },
        Command::Summarize { datadir, reco, params, distributions, metric } => {
            let params        = choose(params       , &config.params       , || Param::ALL.to_vec());
            let distributions = choose(distributions, &config.distributions, || Distribution::ALL.to_vec());
            run_summarize(&expand(datadir)?, &reco, &params, &distributions, metric.unwrap_or_default())
        },
    }
}

/// Command line values if any were given, otherwise those in the config file,
/// otherwise the defaults
fn choose<T: Clone>(cli: Vec<T>, config: &Option<Vec<T>>, default: impl FnOnce() -> Vec<T>) -> Vec<T> {
    if !cli.is_empty() { return cli }
    config.clone().unwrap_or_else(default)
}

fn run_extract(
    proto: &PathProto,
    flavours: &[Flavour],
    recos: &[String],
    params: &[Param],
    outdir: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut progress = Progress::new();
    progress.startln(&format!("Extracting {} recos from samples at {proto}", recos.len()));
    let extracted = extract(proto, flavours, recos, params, Some(outdir))?;
    progress.done_with_message(&format!("Extracted {} events", group_digits(extracted.truth.len())));

    println!("{:>36} {:>5} {:>9} {:>11} {:>11} {:>11} {:>11}",
             "reco", "param", "n_invalid", "err_median", "err_iq50", "err_iq90", "err_absmean");
    for p in &extracted.perf {
        println!("{:>36} {:>5} {:>9} {:>11.4} {:>11.4} {:>11.4} {:>11.4}",
                 p.reco, p.param.name(), p.n_invalid, p.err_median, p.err_iq50, p.err_iq90, p.err_absmean);
    }
    println!("Wrote results to {}", outdir.display());
    Ok(())
}

fn run_fit(
    datadir: &Path,
    reco: &str,
    params: &[Param],
    distributions: &[Distribution],
    options: &FitOptions,
) -> Result<(), Box<dyn Error>> {
    let (hash, names) = distributions_hash(distributions);
    println!("Fitting reco \"{reco}\"\nparams\n    {}\nwith distributions (sha256={hash})\n    {}",
             params.iter().join(","), names.replace(' ', ","));
    let progress_bar = progress::FitProgress::new()?;
    let mut progress = Progress::new();
    let result = fit(datadir, reco, params, distributions, options, &progress_bar);
    progress_bar.final_report();
    let path = result?;
    progress.done_with_message("Fitting finished");
    println!("Wrote results to {}", path.display());
    Ok(())
}

fn run_summarize(
    datadir: &Path,
    reco: &str,
    params: &[Param],
    distributions: &[Distribution],
    metric: Metric,
) -> Result<(), Box<dyn Error>> {
    let (path, best) = summarize(datadir, reco, params, distributions, metric)?;
    println!("Best fits for reco \"{reco}\" by {metric}:");
    for BestFit { param, value, fit, .. } in &best {
        let params = fit.param_names.iter().zip(&fit.params)
            .map(|(name, value)| format!("{name}={value:.4}"))
            .join(" ");
        let note = if fit.converged { "" } else { " (not converged)" };
        let param = format!("{param} [{}]", param.unit());
        println!("{param:>9}: {:<12} {metric}={value:.3e}  {params}{note}", fit.name);
    }
    println!("Wrote {}", path.display());
    Ok(())
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;
use std::path::Path;
use clap::Parser;
use itertools::Itertools;
use cli::{Cli, Command};
use retro::config::priors::{read_config_file, Config};
use retro::distributions::Distribution;
use retro::extract::extract;
use retro::fit::FitOptions;
use retro::priors::{distributions_hash, fit, summarize, BestFit, Metric};
use retro::samples::{default_recos, Flavour, Param, PathProto};
use retro::utils::{expand, group_digits, init_logging, timing::Progress};
use units::duration;
