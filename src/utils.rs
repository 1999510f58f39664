use std::path::PathBuf;

use crate::Result;

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

/// Expand a leading `~` and any `$VAR` or `${VAR}` in `path`. Unset
/// variables are an error.
pub fn expand(path: impl AsRef<str>) -> Result<PathBuf> {
    Ok(PathBuf::from(&*shellexpand::full(path.as_ref())?))
}

/// Send `log` records to stderr: `info` and above by default, `debug` with
/// `verbose`. `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

pub mod timing {

    use super::group_digits;
    use std::time::Instant;
    use std::io::Write;

    pub struct Progress {
        previous: Instant,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            print!("{message} ... ");
            let _ = std::io::stdout().flush();
            self.start_timer();
        }

        /// Print message, go to next line, start timer
        pub fn startln(&mut self, message: &str) {
            self.start(message);
            println!();
            self.start_timer();
        }

        // Print message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            println!("{message}: {} ms",
                     group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/      input      ,     expected    ,
             case(         "1234",        "1,234"),
             case(     "12345678",   "12,345,678"),
             case(          "999",          "999"),
    )]
    fn grouping(input: &str, expected: &str) {
        let n: u64 = input.parse().unwrap();
        assert_eq!(group_digits(n), expected);
    }

    #[test]
    fn expand_leaves_plain_paths_alone() -> Result<()> {
        assert_eq!(expand("/data/sim/x")?, PathBuf::from("/data/sim/x"));
        assert_eq!(expand("relative/dir")?, PathBuf::from("relative/dir"));
        Ok(())
    }

    #[test]
    fn expand_home_and_vars() -> Result<()> {
        std::env::set_var("RETRO_UTILS_TEST_DIR", "/scratch/retro");
        assert_eq!(expand("$RETRO_UTILS_TEST_DIR/out"  )?, PathBuf::from("/scratch/retro/out"));
        assert_eq!(expand("${RETRO_UTILS_TEST_DIR}_x/y")?, PathBuf::from("/scratch/retro_x/y"));
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand("~/priors")?, PathBuf::from(format!("{home}/priors")));
        }
        // `~user` is not expanded
        assert_eq!(expand("~someone/priors")?, PathBuf::from("~someone/priors"));
        Ok(())
    }

    #[test]
    fn expand_rejects_unset_vars() {
        assert!(matches!(expand("$RETRO_UTILS_UNSET_VAR/y"), Err(crate::Error::Expand(_))));
    }
}
