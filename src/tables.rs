//! Time-independent photon tables.
//!
//! CLSim and Cherenkov tables have axes `(r, costheta, t, costhetadir,
//! deltaphidir)`. Summing out `t` gives 4-D tables over `(r, costheta,
//! costhetadir, deltaphidir)`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use ndarray::{s, Array4, Array5, ArrayView5, Axis};
use ndarray_npy::{read_npy, write_npy};
use rayon::prelude::*;

use crate::{Error, Result};

pub const CLSIM_TABLE: &str = "table.npy";
pub const CKV_TABLE: &str = "ckv_table.npy";
pub const T_INDEP_CLSIM_TABLE: &str = "t_indep_table.npy";
pub const T_INDEP_CKV_TABLE: &str = "t_indep_ckv_table.npy";

const TIME_AXIS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKind { Clsim, Ckv }

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::Clsim, TableKind::Ckv];

    pub fn name(self) -> &'static str {
        match self {
            TableKind::Clsim => "clsim",
            TableKind::Ckv   => "ckv",
        }
    }

    /// File name of the 5-D table inside a table directory
    pub fn table_file(self) -> &'static str {
        match self {
            TableKind::Clsim => CLSIM_TABLE,
            TableKind::Ckv   => CKV_TABLE,
        }
    }

    pub fn t_indep_file(self) -> &'static str {
        match self {
            TableKind::Clsim => T_INDEP_CLSIM_TABLE,
            TableKind::Ckv   => T_INDEP_CKV_TABLE,
        }
    }

    /// CLSim tables carry under- and overflow bins on every axis
    pub fn has_overflow_bins(self) -> bool { self == TableKind::Clsim }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for TableKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clsim" => Ok(TableKind::Clsim),
            "ckv"   => Ok(TableKind::Ckv),
            other   => Err(format!("unknown table kind `{other}`: expected `clsim` or `ckv`")),
        }
    }
}

// ----- Summing --------------------------------------------------------------------------------------------

/// Sum `table` over its time axis. With `strip_overflow`, the first and last
/// bins of every axis are discarded first.
pub fn sum_over_time(table: ArrayView5<f32>, strip_overflow: bool) -> Result<Array4<f32>> {
    let table = if strip_overflow {
        if let Some((axis, &len)) = table.shape().iter().enumerate().find(|(_, len)| **len < 2) {
            return Err(Error::TableShape { axis, len });
        }
        table.slice_move(s![1..-1, 1..-1, 1..-1, 1..-1, 1..-1])
    } else {
        table
    };
    let (n_r, n_costheta, _, n_costhetadir, n_deltaphidir) = table.dim();
    let mut summed = Array4::zeros((n_r, n_costheta, n_costhetadir, n_deltaphidir));
    // Each r-slice has the time axis one position earlier
    summed.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(table.axis_iter(Axis(0)).into_par_iter())
        .for_each(|(mut out, slice)| out.assign(&slice.sum_axis(Axis(TIME_AXIS - 1))));
    Ok(summed)
}

// ----- Locating ---------------------------------------------------------------------------------------------

/// Where to find the 5-D tables, and where to put the time-independent ones
#[derive(Debug, Clone, PartialEq)]
pub struct TableLocations {
    pub outdir: PathBuf,
    pub clsim: Option<PathBuf>,
    pub ckv: Option<PathBuf>,
}

impl TableLocations {
    pub fn input(&self, kind: TableKind) -> Option<&Path> {
        match kind {
            TableKind::Clsim => self.clsim.as_deref(),
            TableKind::Ckv   => self.ckv  .as_deref(),
        }
    }

    pub fn output(&self, kind: TableKind) -> PathBuf { self.outdir.join(kind.t_indep_file()) }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map_or(false, |e| e == extension)
}

/// `table` may be a table file or a directory containing tables. Unless
/// given explicitly, the output directory is the table directory, or the
/// directory containing a `.npy` table, or a `.fits` table's path without
/// its extension.
pub fn locate_tables(table: &Path, kinds: &[TableKind], outdir: Option<&Path>) -> TableLocations {
    let outdir = match outdir {
        Some(dir) => dir.to_path_buf(),
        None if table.is_dir()              => table.to_path_buf(),
        None if has_extension(table, "fits") => table.with_extension(""),
        None => table.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };

    let (mut clsim, mut ckv) = (None, None);
    if table.is_file() {
        let name = table.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name == CLSIM_TABLE || has_extension(table, "fits") {
            clsim = Some(table.to_path_buf());
        } else if name == CKV_TABLE {
            ckv = Some(table.to_path_buf());
        }
    } else if table.is_dir() {
        let inside = |kind: TableKind| {
            let path = table.join(kind.table_file());
            (kinds.contains(&kind) && path.is_file()).then_some(path)
        };
        clsim = inside(TableKind::Clsim);
        ckv   = inside(TableKind::Ckv);
    }
    TableLocations { outdir, clsim, ckv }
}

// ----- Generating ----------------------------------------------------------------------------------------

pub fn load_table(path: &Path) -> Result<Array5<f32>> {
    if !has_extension(path, "npy") {
        return Err(Error::UnsupportedTable(path.to_path_buf()));
    }
    Ok(read_npy(path)?)
}

/// Generate the time-independent version of each kind of table in `kinds`
/// (CLSim first). Existing outputs are kept unless `overwrite` is set.
/// Returns the paths of the tables that were written.
pub fn generate_time_indep_tables(
    table: &Path,
    kinds: &[TableKind],
    outdir: Option<&Path>,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let locations = locate_tables(table, kinds, outdir);
    let mut written = vec![];
    for kind in TableKind::ALL.into_iter().filter(|k| kinds.contains(k)) {
        let output = locations.output(kind);
        if output.is_file() {
            if overwrite {
                log::warn!("{} already exists, overwriting", output.display());
            } else {
                log::info!("{} already exists, not overwriting", output.display());
                continue;
            }
        }
        let input = locations.input(kind)
            .ok_or_else(|| Error::MissingTable { kind, path: table.to_path_buf() })?;
        log::info!("generating {} from {}", output.display(), input.display());
        std::fs::create_dir_all(&locations.outdir)?;

        let t0 = Instant::now();
        let full = load_table(input)?;
        let t1 = Instant::now();
        log::debug!("loaded {kind} table {:?} in {} ms", full.shape(), (t1 - t0).as_millis());
        let summed = sum_over_time(full.view(), kind.has_overflow_bins())?;
        drop(full);
        let t2 = Instant::now();
        log::debug!("summed over time axis in {} ms", (t2 - t1).as_millis());
        write_npy(&output, &summed)?;
        log::debug!("saved {} in {} ms", output.display(), t2.elapsed().as_millis());
        written.push(output);
    }
    Ok(written)
}

// ----- TESTS ------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ndarray::Array;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn ramp(shape: (usize, usize, usize, usize, usize)) -> Array5<f32> {
        let n = shape.0 * shape.1 * shape.2 * shape.3 * shape.4;
        Array::from_shape_vec(shape, (0..n).map(|i| (i % 7) as f32).collect()).unwrap()
    }

    #[test]
    fn sum_matches_serial_sum() {
        let table = ramp((3, 4, 5, 2, 3));
        let summed = sum_over_time(table.view(), false).unwrap();
        assert_eq!(summed.dim(), (3, 4, 2, 3));
        assert_eq!(summed, table.sum_axis(Axis(2)));
    }

    #[test]
    fn overflow_bins_are_stripped() {
        let table = ramp((4, 5, 6, 4, 3));
        let summed = sum_over_time(table.view(), true).unwrap();
        assert_eq!(summed.dim(), (2, 3, 2, 1));
        let expected = table.slice(s![1..-1, 1..-1, 1..-1, 1..-1, 1..-1]).sum_axis(Axis(2));
        assert_eq!(summed, expected);
    }

    #[test]
    fn short_axis_cannot_be_stripped() {
        let table = ramp((4, 1, 6, 4, 3));
        assert!(matches!(sum_over_time(table.view(), true), Err(Error::TableShape { axis: 1, len: 1 })));
    }

    #[rstest(/**/ input   , expected,
             case("clsim" , TableKind::Clsim),
             case(" CKV " , TableKind::Ckv  ),
    )]
    fn parse_kind(input: &str, expected: TableKind) {
        assert_eq!(input.parse::<TableKind>().unwrap(), expected);
    }

    #[test]
    fn reject_unknown_kind() {
        assert!("photons".parse::<TableKind>().is_err());
    }

    #[test]
    fn locate_in_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(CLSIM_TABLE), b"")?;
        let both = [TableKind::Clsim, TableKind::Ckv];
        let found = locate_tables(dir.path(), &both, None);
        assert_eq!(found.outdir, dir.path());
        assert_eq!(found.clsim, Some(dir.path().join(CLSIM_TABLE)));
        assert_eq!(found.ckv, None);
        // Only requested kinds are looked for
        assert_eq!(locate_tables(dir.path(), &[TableKind::Ckv], None).clsim, None);
        Ok(())
    }

    #[test]
    fn locate_single_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let ckv = dir.path().join(CKV_TABLE);
        let fits = dir.path().join("cl_table_1.fits");
        std::fs::write(&ckv, b"")?;
        std::fs::write(&fits, b"")?;

        let found = locate_tables(&ckv, &[TableKind::Ckv], None);
        assert_eq!(found.outdir, dir.path());
        assert_eq!(found.ckv, Some(ckv.clone()));

        let found = locate_tables(&fits, &[TableKind::Clsim], None);
        assert_eq!(found.outdir, dir.path().join("cl_table_1"));
        assert_eq!(found.clsim, Some(fits.clone()));

        let elsewhere = dir.path().join("out");
        assert_eq!(locate_tables(&ckv, &[TableKind::Ckv], Some(&elsewhere)).outdir, elsewhere);
        Ok(())
    }

    #[test]
    fn fits_tables_cannot_be_loaded() {
        assert!(matches!(load_table(Path::new("x/table.fits")), Err(Error::UnsupportedTable(_))));
    }
}
