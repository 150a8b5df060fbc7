//! Server configuration from command-line arguments.

use crate::connection::frame::{FrameLimits, MAX_VALUE_SIZE};
use crate::storage::engine::{EngineConfig, DEFAULT_SHARDS, DEFAULT_SHARD_CAPACITY};
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use std::str::FromStr;
use thiserror::Error;

/// Help text printed for `--help`.
pub const HELP: &str = r#"
shardcache - A sharded in-memory cache speaking the memcached text protocol

USAGE:
    shardcache [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>              Port to listen on (default: 3333)
        --shards <N>               Number of shards (default: 1024)
        --shard-capacity <N>       Maximum entries per shard (default: 1024)
        --max-value-size <BYTES>   Largest accepted SET payload (default: 1048576)
    -v, --version                  Print version information
        --help                     Print this help message

EXAMPLES:
    shardcache                     # Start on 127.0.0.1:3333
    shardcache --port 11211        # Start on port 11211
    shardcache --host 0.0.0.0      # Listen on all interfaces

CONNECTING:
    Any memcached text protocol client works, e.g. telnet:
    $ telnet 127.0.0.1 3333
    set name 0 0 4
    Ariz
    STORED
    get name
    VALUE name 0 4
    Ariz
    END
"#;

/// Errors from parsing command-line arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// What the process should do after parsing its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    Run(Config),
    Help,
    Version,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Number of shards
    pub shards: usize,
    /// Maximum entries per shard
    pub shard_capacity: usize,
    /// Largest accepted SET payload in bytes
    pub max_value_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            shards: DEFAULT_SHARDS,
            shard_capacity: DEFAULT_SHARD_CAPACITY,
            max_value_size: MAX_VALUE_SIZE,
        }
    }
}

impl Config {
    /// Parses the process arguments, skipping the program name.
    pub fn from_env() -> Result<CliAction, ConfigError> {
        Self::from_args(std::env::args().skip(1))
    }

    /// Parses configuration from command-line arguments (without the
    /// program name).
    pub fn from_args<I>(args: I) -> Result<CliAction, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => config.host = value_for(&arg, args.next())?,
                "--port" | "-p" => config.port = parse_value(&arg, args.next())?,
                "--shards" => config.shards = parse_positive(&arg, args.next())?,
                "--shard-capacity" => {
                    config.shard_capacity = parse_positive(&arg, args.next())?
                }
                "--max-value-size" => {
                    config.max_value_size = parse_positive(&arg, args.next())?
                }
                "--help" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(CliAction::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            shards: self.shards,
            shard_capacity: self.shard_capacity,
        }
    }

    pub fn frame_limits(&self) -> FrameLimits {
        FrameLimits {
            max_value: self.max_value_size,
            ..FrameLimits::default()
        }
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: FromStr>(flag: &str, value: Option<String>) -> Result<T, ConfigError> {
    let value = value_for(flag, value)?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value,
    })
}

fn parse_positive(flag: &str, value: Option<String>) -> Result<usize, ConfigError> {
    match parse_value(flag, value)? {
        0 => Err(ConfigError::Zero(flag.to_string())),
        n => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliAction, ConfigError> {
        Config::from_args(args.iter().map(|s| s.to_string()))
    }

    fn parse_config(args: &[&str]) -> Config {
        match parse(args).unwrap() {
            CliAction::Run(config) => config,
            other => panic!("expected a run action, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = parse_config(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_address(), "127.0.0.1:3333");
        assert_eq!(config.engine_config(), EngineConfig::default());
        assert_eq!(config.frame_limits(), FrameLimits::default());
    }

    #[test]
    fn test_all_flags() {
        let config = parse_config(&[
            "--host",
            "0.0.0.0",
            "-p",
            "11211",
            "--shards",
            "16",
            "--shard-capacity",
            "100",
            "--max-value-size",
            "2048",
        ]);

        assert_eq!(config.bind_address(), "0.0.0.0:11211");
        assert_eq!(
            config.engine_config(),
            EngineConfig {
                shards: 16,
                shard_capacity: 100
            }
        );
        assert_eq!(config.frame_limits().max_value, 2048);
        assert_eq!(config.frame_limits().max_line, 512);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["--help"]), Ok(CliAction::Help));
        assert_eq!(parse(&["-v"]), Ok(CliAction::Version));
        assert_eq!(parse(&["--port", "1", "--version"]), Ok(CliAction::Version));
    }

    #[test]
    fn test_missing_value() {
        assert_eq!(
            parse(&["--port"]),
            Err(ConfigError::MissingValue("--port".to_string()))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            parse(&["-p", "http"]),
            Err(ConfigError::InvalidValue {
                flag: "-p".to_string(),
                value: "http".to_string()
            })
        );
        assert!(parse(&["--port", "70000"]).is_err());
        assert!(parse(&["--shards", "-1"]).is_err());
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(
            parse(&["--shards", "0"]),
            Err(ConfigError::Zero("--shards".to_string()))
        );
        assert_eq!(
            parse(&["--shard-capacity", "0"]),
            Err(ConfigError::Zero("--shard-capacity".to_string()))
        );
    }

    #[test]
    fn test_unknown_argument() {
        assert_eq!(
            parse(&["--verbose"]),
            Err(ConfigError::UnknownArgument("--verbose".to_string()))
        );
    }
}
