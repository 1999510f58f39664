//! Offline tools for the retro reconstruction: collapsing photon tables over
//! time, and deriving reconstruction priors from simulated event samples.

mod error;
pub use error::{Error, Result};

pub mod io;
pub mod utils;
pub mod config;
pub mod tables;
pub mod samples;
pub mod stats;
pub mod extract;
pub mod distributions;
pub mod fit;
pub mod priors;

pub use units::Time;
