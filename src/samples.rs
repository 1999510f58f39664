//! Simulated event samples on disk: neutrino flavours, reconstructed
//! parameters, fit statuses and the directory layout of the samples.
//!
//! Each sample directory contains `truth.h5` (dataset `truth`) and, for every
//! reco that was run on it, `recos/<reco>.h5` (dataset `reco`). Sample
//! directories are numbered consecutively from 0 for each flavour, and are
//! located by a [`PathProto`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};
use crate::io::hdf5::{read_table, RecoEvent, Truth};

pub const TRUTH_FILE: &str = "truth.h5";
pub const TRUTH_DATASET: &str = "truth";
pub const RECOS_DIR: &str = "recos";
pub const RECO_DATASET: &str = "reco";

pub const DEFAULT_PATH_PROTO: &str =
    "/data/icecube/sim/ic86/i3/oscNext/pass2/genie/level5/{abs_flav}9002/oscNext_genie_level5_pass2.{abs_flav}9002.{i:06}";

/// Reconstructions whose performance is extracted by default
pub const RECOS: [&str; 20] = [
    "CascadeLast_DC",
    "DipoleFit_DC",
    "L4_ToIEval2",
    "L4_ToIEval3",
    "L4_iLineFit",
    "L5_SPEFit11",
    "LineFit",
    "LineFit_DC",
    "MM_DC_LineFitI_MM_DC_Pulses_1P_C05",
    "MM_IC_LineFitI",
    "MPEFit",
    "MPEFitMuEX",
    "PoleMuonLinefit",
    "PoleMuonLlhFit",
    "SPEFit2",
    "SPEFit2MuEX_FSS",
    "SPEFit2_DC",
    "SPEFitSingle",
    "SPEFitSingle_DC",
    "ToI_DC",
];

pub fn default_recos() -> Vec<String> {
    let mut recos: Vec<_> = RECOS.iter().map(|r| r.to_string()).collect();
    recos.sort();
    recos
}

// ----- Flavour ----------------------------------------------------------------------------------------

/// Neutrino flavour, identified by the absolute value of its PDG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
#[serde(try_from = "u32")]
pub enum Flavour {
    NuE   = 12,
    NuMu  = 14,
    NuTau = 16,
}

impl Flavour {
    pub const ALL: [Flavour; 3] = [Flavour::NuE, Flavour::NuMu, Flavour::NuTau];

    pub fn abs_pdg(self) -> u32 { self as u32 }
}

impl TryFrom<u32> for Flavour {
    type Error = String;
    fn try_from(code: u32) -> std::result::Result<Self, Self::Error> {
        Flavour::ALL.into_iter()
            .find(|f| f.abs_pdg() == code)
            .ok_or_else(|| format!("unknown flavour `{code}` (expected 12, 14 or 16)"))
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.abs_pdg()) }
}

impl FromStr for Flavour {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "12" | "nue"   => Ok(Flavour::NuE),
            "14" | "numu"  => Ok(Flavour::NuMu),
            "16" | "nutau" => Ok(Flavour::NuTau),
            other => Err(format!("unknown flavour `{other}` (expected 12, 14 or 16)")),
        }
    }
}

// ----- Param ------------------------------------------------------------------------------------------

/// Event parameter whose reconstruction error is studied
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param { X, Y, Z, Time }

impl Param {
    pub const ALL: [Param; 4] = [Param::X, Param::Y, Param::Z, Param::Time];

    pub fn name(self) -> &'static str {
        match self {
            Param::X    => "x",
            Param::Y    => "y",
            Param::Z    => "z",
            Param::Time => "time",
        }
    }

    /// Unit in which the parameter (and its error) is stored
    pub fn unit(self) -> &'static str {
        match self {
            Param::X | Param::Y | Param::Z => "m",
            Param::Time                    => "ns",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Param {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Param::ALL.iter().copied()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| format!("unknown param `{s}` (expected one of x, y, z, time)"))
    }
}

impl serde::Serialize for Param {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'d> serde::Deserialize<'d> for Param {
    fn deserialize<D: serde::Deserializer<'d>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sort by name and remove duplicates
pub fn canonical_params(params: &[Param]) -> Vec<Param> {
    let mut params = params.to_vec();
    params.sort_by_key(|p| p.name());
    params.dedup();
    params
}

// ----- FitStatus --------------------------------------------------------------------------------------

/// Outcome of a reconstruction, as recorded in the `fit_status` field of
/// reco records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    NotSet              = -1,
    OK                  =  0,
    GeneralFailure      = 10,
    InsufficientHits    = 20,
    FailedToConverge    = 30,
    MissingSeed         = 40,
    InsufficientQuality = 50,
}

impl FitStatus {
    pub fn from_code(code: i8) -> Option<Self> {
        use FitStatus::*;
        [NotSet, OK, GeneralFailure, InsufficientHits, FailedToConverge, MissingSeed, InsufficientQuality]
            .into_iter()
            .find(|s| *s as i8 == code)
    }
}

// ----- PathProto --------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    AbsFlav,
    Index { width: usize },
}

/// Template for sample directory paths, containing the placeholders
/// `{abs_flav}` and `{i}`; the latter may carry a zero-padding width, as in
/// `{i:06}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathProto {
    proto: String,
    pieces: Vec<Piece>,
}

impl PathProto {

    pub fn path(&self, flavour: Flavour, i: usize) -> PathBuf {
        let mut out = String::with_capacity(self.proto.len() + 8);
        for piece in &self.pieces {
            match piece {
                Piece::Literal(s)      => out.push_str(s),
                Piece::AbsFlav         => out.push_str(&flavour.abs_pdg().to_string()),
                Piece::Index { width } => out.push_str(&format!("{i:0width$}")),
            }
        }
        PathBuf::from(out)
    }

    fn bad(proto: &str, reason: impl Into<String>) -> Error {
        Error::PathProto { proto: proto.to_string(), reason: reason.into() }
    }

    fn placeholder(proto: &str, inner: &str) -> Result<Piece> {
        let (name, format) = match inner.split_once(':') {
            Some((name, format)) => (name, Some(format.trim_end_matches('d'))),
            None                 => (inner, None),
        };
        match (name, format) {
            ("abs_flav", None | Some("")) => Ok(Piece::AbsFlav),
            ("i", None | Some(""))        => Ok(Piece::Index { width: 0 }),
            ("i", Some(format)) => format.parse::<usize>()
                .map(|width| Piece::Index { width })
                .map_err(|_| Self::bad(proto, format!("bad width `{format}` for {{i}}"))),
            _ => Err(Self::bad(proto, format!("unknown placeholder `{{{inner}}}`"))),
        }
    }
}

impl FromStr for PathProto {
    type Err = Error;
    fn from_str(proto: &str) -> Result<Self> {
        // `~` and environment variables are resolved before the placeholders
        let expanded = crate::utils::expand(proto)?;
        let expanded = expanded.to_string_lossy();
        let mut pieces = vec![];
        let mut rest: &str = &expanded;
        while !rest.is_empty() {
            match rest.find(&['{', '}'][..]) {
                None => { pieces.push(Piece::Literal(rest.to_string())); break; }
                Some(pos) if rest[pos..].starts_with('}') => return Err(Self::bad(proto, "unmatched `}`")),
                Some(pos) => {
                    if pos > 0 { pieces.push(Piece::Literal(rest[..pos].to_string())); }
                    let after = &rest[pos + 1..];
                    let end = after.find('}').ok_or_else(|| Self::bad(proto, "unmatched `{`"))?;
                    pieces.push(Self::placeholder(proto, &after[..end])?);
                    rest = &after[end + 1..];
                }
            }
        }
        if !pieces.iter().any(|p| matches!(p, Piece::Index { .. })) {
            return Err(Self::bad(proto, "no `{i}` placeholder"));
        }
        Ok(Self { proto: proto.to_string(), pieces })
    }
}

impl fmt::Display for PathProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.proto) }
}

impl Default for PathProto {
    fn default() -> Self {
        // The default prototype is a valid template
        DEFAULT_PATH_PROTO.parse().unwrap_or_else(|_| unreachable!())
    }
}

// ----- Reading samples --------------------------------------------------------------------------------

pub fn truth_path(sample_dir: &Path) -> PathBuf { sample_dir.join(TRUTH_FILE) }

pub fn reco_path(sample_dir: &Path, reco: &str) -> PathBuf {
    sample_dir.join(RECOS_DIR).join(format!("{reco}.h5"))
}

/// Concatenate the tables found at `file(0)`, `file(1)`, ... stopping at the
/// first index whose file does not exist. Returns the rows and the number of
/// files read.
fn read_consecutive<T, F>(file: F, dataset: &str) -> Result<(Vec<T>, usize)>
where
    T: hdf5::H5Type + Clone,
    F: Fn(usize) -> PathBuf,
{
    let mut rows = vec![];
    let mut i = 0;
    loop {
        let path = file(i);
        if !path.is_file() { return Ok((rows, i)) }
        let table = read_table::<T>(&path, dataset)?;
        log::debug!("read {} rows from {}", table.len(), path.display());
        rows.extend(table.iter().cloned());
        i += 1;
    }
}

/// All truth records of `flavour`, in sample order
pub fn read_truth(proto: &PathProto, flavour: Flavour) -> Result<(Vec<Truth>, usize)> {
    read_consecutive(|i| truth_path(&proto.path(flavour, i)), TRUTH_DATASET)
}

/// All records of `reco` for `flavour`, in sample order
pub fn read_reco(proto: &PathProto, flavour: Flavour, reco: &str) -> Result<(Vec<RecoEvent>, usize)> {
    read_consecutive(|i| reco_path(&proto.path(flavour, i), reco), RECO_DATASET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/           proto           , flavour       , i  ,         expected         ,
             case("/d/{abs_flav}9002/s.{i:06}", Flavour::NuE  ,  7, "/d/129002/s.000007"),
             case("/d/{abs_flav}/{i}"         , Flavour::NuTau, 42, "/d/16/42"          ),
             case("{i:03d}_{abs_flav:d}"      , Flavour::NuMu ,  5, "005_14"            ),
    )]
    fn path_proto_renders(proto: &str, flavour: Flavour, i: usize, expected: &str) {
        let proto: PathProto = proto.parse().unwrap();
        assert_eq!(proto.path(flavour, i), PathBuf::from(expected));
    }

    #[rstest(/**/      proto      ,
             case("/d/{abs_flav}"   ), // no index
             case("/d/{i"           ),
             case("/d/i}"           ),
             case("/d/{flavour}/{i}"),
             case("/d/{i:xx}"       ),
    )]
    fn path_proto_rejects(proto: &str) {
        assert!(matches!(proto.parse::<PathProto>(), Err(Error::PathProto { .. })));
    }

    #[test]
    fn path_proto_expands_environment() -> Result<()> {
        std::env::set_var("RETRO_SAMPLES_TEST_ROOT", "/scratch/sim");
        let proto: PathProto = "${RETRO_SAMPLES_TEST_ROOT}/{abs_flav}/{i:02}".parse()?;
        assert_eq!(proto.path(Flavour::NuE, 4), PathBuf::from("/scratch/sim/12/04"));
        assert!(matches!("$RETRO_SAMPLES_UNSET_ROOT/{i}".parse::<PathProto>(), Err(Error::Expand(_))));
        Ok(())
    }

    #[test]
    fn default_path_proto() {
        let p = PathProto::default().path(Flavour::NuMu, 3);
        assert!(p.ends_with("149002/oscNext_genie_level5_pass2.149002.000003"));
    }

    #[test]
    fn params_parse() {
        assert_eq!("time".parse::<Param>().unwrap(), Param::Time);
        assert!("t".parse::<Param>().is_err());
        assert_eq!(canonical_params(&[Param::Time, Param::X, Param::Time]), vec![Param::Time, Param::X]);
    }

    #[test]
    fn fit_status_codes() {
        assert_eq!(FitStatus::from_code(0), Some(FitStatus::OK));
        assert_eq!(FitStatus::from_code(30), Some(FitStatus::FailedToConverge));
        assert_eq!(FitStatus::from_code(7), None);
    }

    #[test]
    fn default_recos_are_sorted() {
        let recos = default_recos();
        assert_eq!(recos.len(), 20);
        assert!(recos.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn consecutive_samples_stop_at_first_gap() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let proto: PathProto = format!("{}/{{abs_flav}}/{{i:02}}", dir.path().display()).parse()?;
        let truth = |w| vec![Truth { x: 0.0, y: 0.0, z: 0.0, time: 0.0, weight: w }];
        for (i, w) in [(0, 1.0), (1, 2.0), (3, 4.0)] {
            let d = proto.path(Flavour::NuE, i);
            std::fs::create_dir_all(&d)?;
            crate::io::hdf5::write_table(&truth_path(&d), TRUTH_DATASET, &truth(w))?;
        }
        let (rows, n) = read_truth(&proto, Flavour::NuE)?;
        assert_eq!(n, 2);
        assert_eq!(rows.iter().map(|t| t.weight).collect::<Vec<_>>(), vec![1.0, 2.0]);

        let (rows, n) = read_truth(&proto, Flavour::NuMu)?;
        assert_eq!((rows.len(), n), (0, 0));
        Ok(())
    }
}
