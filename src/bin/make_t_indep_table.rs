// ----------------------------------- CLI -----------------------------------
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "make_t_indep_table",
    about = "Sum 5-D CLSim and/or Cherenkov tables over time, producing 4-D time-independent tables",
)]
pub struct Cli {

    /// 5-D table file, or directory containing `table.npy` and/or `ckv_table.npy`
    pub table: String,

    /// Kind(s) of table to process. Repeat for both.
    #[clap(long, required = true)]
    pub kind: Vec<TableKind>,

    /// Where to write the time-independent tables [default: alongside the input]
    #[clap(long)]
    pub outdir: Option<String>,

    /// Overwrite any existing time-independent tables
    #[clap(long)]
    pub overwrite: bool,

    /// Report load, sum and save timings
    #[clap(short)]
    pub v: bool,
}

// --------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn Error>> {
    let Cli { table, kind, outdir, overwrite, v } = Cli::parse();
    init_logging(v);

    let table = expand(table)?;
    let outdir = outdir.map(expand).transpose()?;
    let mut progress = Progress::new();
    progress.startln(&format!("Making time-independent {} table(s) from {}",
                              kind.iter().join(" and "), table.display()));
    let written = generate_time_indep_tables(&table, &kind, outdir.as_deref(), overwrite)?;
    for path in &written {
        println!("Wrote {}", path.display());
    }
    progress.done_with_message("Finished");
    Ok(())
}

// ----- Imports -----------------------------------------------------------------------------------------
use std::error::Error;
use clap::Parser;
use itertools::Itertools;
use retro::tables::{generate_time_indep_tables, TableKind};
use retro::utils::{expand, init_logging, timing::Progress};
