//! Logger bootstrap for the demo binary and for tests that want output.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

const CRATE_TARGET: &str = env!("CARGO_PKG_NAME");

fn crate_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs `env_logger` as the global logger.
///
/// `verbose` raises this crate's own records to debug level; records from
/// Bevy and other dependencies stay at warnings. `RUST_LOG` overrides both
/// defaults. Calling this again once a logger is installed does nothing.
pub fn init(verbose: bool) {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module(CRATE_TARGET, crate_level(verbose))
        .target(Target::Stderr)
        .parse_env(Env::default());

    if builder.try_init().is_err() {
        log::trace!("logger already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::quiet(false, LevelFilter::Info)]
    #[case::verbose(true, LevelFilter::Debug)]
    fn verbose_flag_sets_crate_level(#[case] verbose: bool, #[case] expected: LevelFilter) {
        assert_eq!(crate_level(verbose), expected);
    }

    #[test]
    fn init_is_repeatable() {
        init(false);
        init(true);
        log::debug!("logger survives double initialisation");
    }
}
