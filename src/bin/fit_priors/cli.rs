/// Command line interface for `fit_priors` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "fit_priors",
    about = "Formulate priors for Retro Reco from previously-run reconstructions",
)]
pub (super) struct Cli {
    /// TOML file providing defaults for any of the options below
    #[clap(long, global = true)]
    pub config: Option<String>,

    /// Verbose: report debug-level details
    #[clap(short, global = true)]
    pub v: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub (super) enum Command {

    /// Extract recos and truth, and summarize how each reco performs
    Extract {
        /// Where to write the summary and the extracted records
        #[clap(long)]
        outdir: String,

        /// Template of sample directories, with `{abs_flav}` and `{i}` placeholders
        #[clap(long)]
        path_proto: Option<String>,

        /// Neutrino flavours (absolute PDG codes) [default: 12 14 16]
        #[clap(long, num_args = 1..)]
        flavours: Vec<Flavour>,

        /// Recos to extract [default: all known recos]
        #[clap(long, num_args = 1..)]
        recos: Vec<String>,

        /// Params whose errors are summarized [default: x y z time]
        #[clap(long, num_args = 1..)]
        params: Vec<Param>,
    },

    /// Fit reco errors with various distributions.
    ///
    /// Fitting every distribution to heavy-tailed errors can take minutes per
    /// param; use --timeout to bound it.
    Fit {
        /// Directory written by `extract`
        #[clap(long)]
        datadir: String,

        #[clap(long)]
        reco: String,

        /// [default: x y z time]
        #[clap(long, num_args = 1..)]
        params: Vec<Param>,

        /// [default: all supported distributions]
        #[clap(long, num_args = 1..)]
        distributions: Vec<Distribution>,

        /// Abandon fits that have not finished in this time, e.g. '90 s' or '5 min' [default: no limit]
        #[clap(long)]
        timeout: Option<Time>,

        /// Maximum number of simultaneous fits [default: number of CPUs]
        #[clap(short = 'j', long)]
        threads: Option<usize>,

        /// Thin the empirical CDF to this many points before fitting [default: 10000]
        #[clap(long)]
        max_points: Option<usize>,

        /// Nelder-Mead iteration limit for each fit [default: 2000]
        #[clap(long)]
        max_iterations: Option<u64>,
    },

    /// Find the best-fitting distribution for each param
    Summarize {
        /// Directory written by `extract` and `fit`
        #[clap(long)]
        datadir: String,

        #[clap(long)]
        reco: String,

        /// [default: x y z time]
        #[clap(long, num_args = 1..)]
        params: Vec<Param>,

        /// Distributions that were fitted [default: all supported distributions]
        #[clap(long, num_args = 1..)]
        distributions: Vec<Distribution>,

        /// Criterion for choosing the best fit: mse or ks [default: mse]
        #[clap(long)]
        metric: Option<Metric>,
    },
}

// ----- Imports -----------------------------------------------------------------------------------------
use retro::Time;
use retro::distributions::Distribution;
use retro::priors::Metric;
use retro::samples::{Flavour, Param};
