//! Configuration file parser for `fit_priors`
//!
//! Every field is optional: values given on the command line override those
//! in the file, which override the built-in defaults.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

use units::Time;

use crate::Result;
use crate::distributions::Distribution;
use crate::fit::FitOptions;
use crate::samples::{Flavour, Param};

fn deserialize_uom_opt<'d, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Option::<&str>::deserialize(deserializer)?
        .map(str::parse::<T>)
        .transpose()
        .map_err(de::Error::custom)
}

#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Template of sample directory paths, with `{abs_flav}` and `{i}`
    pub path_proto: Option<String>,

    pub flavours: Option<Vec<Flavour>>,

    pub recos: Option<Vec<String>>,

    pub params: Option<Vec<Param>>,

    pub distributions: Option<Vec<Distribution>>,

    /// Abandon fits still running after this time, e.g. `"90 s"`
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_uom_opt")]
    pub timeout: Option<Time>,

    /// Worker threads for fitting
    pub threads: Option<usize>,

    pub max_points: Option<usize>,

    pub max_iterations: Option<u64>,
}

impl Config {
    /// Fit options from this configuration, falling back to the defaults
    pub fn fit_options(&self) -> FitOptions {
        let default = FitOptions::default();
        FitOptions {
            max_iterations: self.max_iterations.unwrap_or(default.max_iterations),
            max_points    : self.max_points    .unwrap_or(default.max_points),
            threads       : self.threads.or(default.threads),
            timeout       : self.timeout.and_then(units::duration).or(default.timeout),
            ..default
        }
    }
}

pub fn read_config_file(path: &Path) -> Result<Config> {
    let config = fs::read_to_string(path)?;
    Ok(toml::from_str(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use units::{min, s};
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    // ----- Some helpers to make the tests more concise ---------------------------------
    fn parse<'d, D: Deserialize<'d>>(input: &'d str) -> D {
        toml::from_str(input).unwrap()
    }
    fn parse_carefully(input: &str) -> std::result::Result<Config, toml::de::Error> {
        toml::from_str(input)
    }
    macro_rules! check {
        ($type:ident($text:expr).$field:ident = $expected:expr) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            assert_eq!(config.$field, $expected);
        };
        ($type:ident($text:expr) fields: $($field:ident = $expected:expr);+$(;)?) => {
            let config: $type = parse::<$type>($text);
            println!("DESERIALIZED: {config:?}");
            $(assert_eq!(config.$field, $expected);)*
        }
    }

    #[test]
    fn config_empty() {
        let config: Config = parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.fit_options(), FitOptions::default());
    }

    #[test]
    fn config_samples() {
        check!{Config(r#"
                 path_proto = "/sim/{abs_flav}/{i:04}"
                 flavours = [14, 12]
                 recos = ["LineFit", "SPEFit2"]
                 params = ["x", "time"]
               "#) fields:
               path_proto = Some("/sim/{abs_flav}/{i:04}".to_string());
               flavours   = Some(vec![Flavour::NuMu, Flavour::NuE]);
               recos      = Some(vec!["LineFit".to_string(), "SPEFit2".to_string()]);
               params     = Some(vec![Param::X, Param::Time]);
        }
    }

    #[test]
    fn config_fitting() {
        check!{Config(r#"
                 distributions = ["norm", "cauchy"]
                 timeout = "2 min"
                 threads = 6
                 max_points = 500
                 max_iterations = 300
               "#) fields:
               distributions  = Some(vec![Distribution::Norm, Distribution::Cauchy]);
               timeout        = Some(min(2.0));
               threads        = Some(6);
               max_points     = Some(500);
               max_iterations = Some(300);
        }
    }

    #[test]
    fn config_timeout_becomes_duration() {
        let config: Config = parse(r#"timeout = "90 s""#);
        assert_eq!(config.timeout, Some(s(90.0)));
        let options = config.fit_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(90)));
        assert_eq!(options.max_points, FitOptions::default().max_points);
    }

    #[test]
    fn config_reject_unknown_field() {
        assert!(parse_carefully("unknown_field = 666").is_err());
    }

    #[test]
    fn config_reject_bad_values() {
        assert!(parse_carefully("flavours = [13]"          ).is_err());
        assert!(parse_carefully(r#"params = ["energy"]"#   ).is_err());
        assert!(parse_carefully(r#"distributions = ["gauss"]"#).is_err());
        // Timeouts need units
        assert!(parse_carefully("timeout = 90").is_err());
    }

    #[test]
    fn config_file_on_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("priors.toml");
        fs::write(&path, "threads = 3\nparams = [\"z\"]\n")?;
        let config = read_config_file(&path)?;
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.params, Some(vec![Param::Z]));
        Ok(())
    }
}
