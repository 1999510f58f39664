//! The continuous distributions which may be fitted to reco errors.
//!
//! Every distribution has zero or more (positive) shape parameters, plus a
//! location and a scale: `cdf(x; shapes, loc, scale) = F((x - loc) / scale;
//! shapes)` where `F` is the standard form of the distribution. Names follow
//! the conventions of common statistics packages, so that fit results can be
//! compared with those produced elsewhere.

use std::fmt;
use std::str::FromStr;

use statrs::distribution::{
    Beta, Cauchy, ChiSquared, ContinuousCDF, Exp, FisherSnedecor, Gamma, InverseGamma, Laplace,
    LogNormal, Normal, Pareto, StudentsT, Uniform, Weibull,
};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Distribution {
    Beta,
    Cauchy,
    Chi,
    Chi2,
    Expon,
    F,
    Gamma,
    InvGamma,
    Laplace,
    LogNorm,
    Norm,
    Pareto,
    T,
    Uniform,
    WeibullMin,
}

/// Region where the standard form of a distribution has support
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Support {
    Real,
    /// `[lower, ∞)`
    Above(f64),
    /// `[0, 1]`
    Unit,
}

/// The CDF of a distribution with specific parameter values
pub type Cdf = Box<dyn Fn(f64) -> f64>;

impl Distribution {

    /// All distributions, sorted by name
    pub const ALL: [Distribution; 15] = {
        use Distribution as D;
        [D::Beta, D::Cauchy, D::Chi, D::Chi2, D::Expon, D::F, D::Gamma, D::InvGamma, D::Laplace,
         D::LogNorm, D::Norm, D::Pareto, D::T, D::Uniform, D::WeibullMin]
    };

    pub fn name(self) -> &'static str {
        use Distribution as D;
        match self {
            D::Beta       => "beta",
            D::Cauchy     => "cauchy",
            D::Chi        => "chi",
            D::Chi2       => "chi2",
            D::Expon      => "expon",
            D::F          => "f",
            D::Gamma      => "gamma",
            D::InvGamma   => "invgamma",
            D::Laplace    => "laplace",
            D::LogNorm    => "lognorm",
            D::Norm       => "norm",
            D::Pareto     => "pareto",
            D::T          => "t",
            D::Uniform    => "uniform",
            D::WeibullMin => "weibull_min",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL.iter().copied()
            .find(|d| d.name() == name)
            .ok_or_else(|| Error::UnknownDistribution(name.to_string()))
    }

    /// Names of the shape parameters, in the order in which they appear in
    /// fit results
    pub fn shape_names(self) -> &'static [&'static str] {
        use Distribution as D;
        match self {
            D::Beta                                                  => &["a", "b"],
            D::Chi | D::Chi2 | D::T                                  => &["df"],
            D::F                                                     => &["dfn", "dfd"],
            D::Gamma | D::InvGamma                                   => &["a"],
            D::LogNorm                                               => &["s"],
            D::Pareto                                                => &["b"],
            D::WeibullMin                                            => &["c"],
            D::Cauchy | D::Expon | D::Laplace | D::Norm | D::Uniform => &[],
        }
    }

    pub fn n_shapes(self) -> usize { self.shape_names().len() }

    /// Shape values from which fits start
    pub fn initial_shapes(self) -> &'static [f64] {
        use Distribution as D;
        match self {
            D::Beta       => &[2.0, 2.0],
            D::Chi        => &[2.0],
            D::Chi2       => &[2.0],
            D::F          => &[5.0, 5.0],
            D::Gamma      => &[2.0],
            D::InvGamma   => &[3.0],
            D::LogNorm    => &[0.5],
            D::Pareto     => &[3.0],
            D::T          => &[5.0],
            D::WeibullMin => &[1.5],
            D::Cauchy | D::Expon | D::Laplace | D::Norm | D::Uniform => &[],
        }
    }

    pub fn support(self) -> Support {
        use Distribution as D;
        match self {
            D::Cauchy | D::Laplace | D::Norm | D::T                                                  => Support::Real,
            D::Chi | D::Chi2 | D::Expon | D::F | D::Gamma | D::InvGamma | D::LogNorm | D::WeibullMin => Support::Above(0.0),
            D::Pareto                                                                                => Support::Above(1.0),
            D::Beta | D::Uniform                                                                     => Support::Unit,
        }
    }

    /// CDF of the standard form (`loc = 0`, `scale = 1`) with the given shape
    /// parameters. `None` if the shapes are not valid for this distribution.
    pub fn standard_cdf(self, shapes: &[f64]) -> Option<Cdf> {
        if shapes.len() != self.n_shapes() { return None }
        macro_rules! cdf { ($dist:expr) => {{
            let d = $dist.ok()?;
            Box::new(move |x: f64| d.cdf(x)) as Cdf
        }}}
        use Distribution as D;
        Some(match self {
            D::Beta       => {
                let d = Beta::new(shapes[0], shapes[1]).ok()?;
                Box::new(move |x: f64| if x <= 0.0 { 0.0 } else if x >= 1.0 { 1.0 } else { d.cdf(x) }) as Cdf
            },
            D::Cauchy     => cdf!(Cauchy::new(0.0, 1.0)),
            D::Chi        => {
                let d = ChiSquared::new(shapes[0]).ok()?;
                Box::new(move |x: f64| if x <= 0.0 { 0.0 } else { d.cdf(x * x) }) as Cdf
            },
            D::Chi2       => cdf!(ChiSquared::new(shapes[0])),
            D::Expon      => cdf!(Exp::new(1.0)),
            D::F          => cdf!(FisherSnedecor::new(shapes[0], shapes[1])),
            D::Gamma      => cdf!(Gamma::new(shapes[0], 1.0)),
            D::InvGamma   => cdf!(InverseGamma::new(shapes[0], 1.0)),
            D::Laplace    => cdf!(Laplace::new(0.0, 1.0)),
            D::LogNorm    => cdf!(LogNormal::new(0.0, shapes[0])),
            D::Norm       => cdf!(Normal::new(0.0, 1.0)),
            D::Pareto     => cdf!(Pareto::new(1.0, shapes[0])),
            D::T          => cdf!(StudentsT::new(0.0, 1.0, shapes[0])),
            D::Uniform    => cdf!(Uniform::new(0.0, 1.0)),
            D::WeibullMin => cdf!(Weibull::new(shapes[0], 1.0)),
        })
    }

    /// CDF with shapes, location and scale, packed as `[shapes.., loc, scale]`
    pub fn cdf(self, params: &[f64]) -> Option<Cdf> {
        let n = self.n_shapes();
        if params.len() != n + 2 { return None }
        let (loc, scale) = (params[n], params[n + 1]);
        if !(scale > 0.0 && scale.is_finite() && loc.is_finite()) { return None }
        if params[..n].iter().any(|s| !(*s > 0.0 && s.is_finite())) { return None }
        let standard = self.standard_cdf(&params[..n])?;
        let cdf: Cdf = Box::new(move |x| standard((x - loc) / scale));
        Some(cdf)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Distribution {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s.trim()).map_err(|e| e.to_string())
    }
}

impl<'d> serde::Deserialize<'d> for Distribution {
    fn deserialize<D: serde::Deserializer<'d>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sort by name and remove duplicates
pub fn canonical(distributions: &[Distribution]) -> Vec<Distribution> {
    let mut ds = distributions.to_vec();
    ds.sort_by_key(|d| d.name());
    ds.dedup();
    ds
}
