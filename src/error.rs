use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::tables::TableKind;
use crate::samples::Param;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hdf5(#[from] hdf5::Error),

    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Expand(#[from] shellexpand::LookupError<std::env::VarError>),

    #[error("told to generate time-independent {kind} table, but no {kind} table exists at `{}`", .path.display())]
    MissingTable { kind: TableKind, path: PathBuf },

    #[error("cannot read table `{}`: only .npy tables are supported", .0.display())]
    UnsupportedTable(PathBuf),

    #[error("table axis {axis} has length {len}: too short to strip its overflow bins")]
    TableShape { axis: usize, len: usize },

    #[error("`{}` is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("bad path prototype `{proto}`: {reason}")]
    PathProto { proto: String, reason: String },

    #[error("unknown reco `{0}`")]
    UnknownReco(String),

    #[error("unknown distribution `{0}`")]
    UnknownDistribution(String),

    #[error("reco `{reco}` has no valid `{param}` errors")]
    NoValidErrors { reco: String, param: Param },

    #[error("length mismatch: {what} has {left} entries but {right} were expected")]
    LengthMismatch { what: &'static str, left: usize, right: usize },

    #[error("cannot fit or summarize empty data")]
    EmptyData,

    #[error("no fits succeeded{}", before_timeout(.0))]
    NoFitsSucceeded(Option<Duration>),

    #[error("fit of `{name}` failed: {reason}")]
    FitFailed { name: String, reason: String },

    #[error("fit info file `{}` has no results for param `{param}`", .path.display())]
    MissingFitInfo { path: PathBuf, param: Param },
}

fn before_timeout(timeout: &Option<Duration>) -> String {
    timeout.map_or(String::new(), |t| format!(" before timeout of {:.1} s", t.as_secs_f32()))
}
