use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Parser;

pub const DEFAULT_STATE_DIR: &str = ".taskswap";
pub const DEFAULT_LOG_FILTER: &str = "taskswap=info";

#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(name = "taskswap")]
#[command(about = "TaskSwap marketplace core, driven by line commands on stdin")]
pub struct Config {
    /// Directory holding the state snapshot
    #[arg(long, env = "TASKSWAP_STATE_DIR", default_value = DEFAULT_STATE_DIR)]
    pub state_dir: PathBuf,

    /// Force the store back to defaults before first use (also `reset=1`)
    #[arg(long, env = "TASKSWAP_RESET", value_parser = BoolishValueParser::new())]
    pub reset: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long = "log", env = "TASKSWAP_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            reset: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Parses the process arguments and environment. Exits with a usage
    /// message on invalid input.
    pub fn load() -> Self {
        Self::parse_from(with_reset_alias(env::args_os()))
    }

    /// Parses `args` (without the binary name) on top of the environment.
    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv = std::iter::once(OsString::from("taskswap")).chain(args.into_iter().map(Into::into));
        Self::try_parse_from(with_reset_alias(argv))
    }
}

/// Rewrites the query-style `reset=1` into `--reset` and drops `reset=0`.
/// Any other `reset=` value is left for clap to reject.
fn with_reset_alias<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .filter_map(|arg| match arg.to_str() {
            Some("reset=1") => Some(OsString::from("--reset")),
            Some("reset=0") => None,
            _ => Some(arg),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Config::command().debug_assert();
    }

    #[test]
    fn settings_are_bound_to_environment_variables() {
        let command = Config::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .and_then(|e| e.to_str())
                .map(str::to_string)
        };
        assert_eq!(env_of("state_dir").as_deref(), Some("TASKSWAP_STATE_DIR"));
        assert_eq!(env_of("reset").as_deref(), Some("TASKSWAP_RESET"));
        assert_eq!(env_of("log_filter").as_deref(), Some("TASKSWAP_LOG"));
    }

    #[test]
    fn args_recognise_reset_signal() {
        assert!(Config::try_from_args(["--reset"]).unwrap().reset);
        assert!(Config::try_from_args(["reset=1"]).unwrap().reset);
        assert!(!Config::try_from_args(["reset=0"]).unwrap().reset);
        let config = Config::try_from_args(["--state-dir", "data"]).unwrap();
        assert_eq!(config.state_dir, PathBuf::from("data"));
        assert!(!config.reset);
    }

    #[test]
    fn typos_and_missing_values_are_rejected() {
        let err = Config::try_from_args(["--rest"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        assert!(Config::try_from_args(["--state-dir"]).is_err());
        assert!(Config::try_from_args(["reset=maybe"]).is_err());
    }

    #[test]
    fn flag_is_not_swallowed_as_a_path() {
        assert!(Config::try_from_args(["--state-dir", "--reset"]).is_err());
        let config = Config::try_from_args(["--reset", "--state-dir", "data"]).unwrap();
        assert!(config.reset);
        assert_eq!(config.state_dir, PathBuf::from("data"));
    }
}
