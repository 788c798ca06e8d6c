//! Server configuration.
//!
//! Precedence, lowest first: built-in defaults, `NIMBUSKV_*` environment
//! variables, command-line flags. Parsing never exits the process; bad input
//! comes back as a [`ConfigError`] for `main` to report.

use crate::storage::DEFAULT_SHARDS;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_HOST: &str = "NIMBUSKV_HOST";
pub const ENV_PORT: &str = "NIMBUSKV_PORT";
pub const ENV_SHARDS: &str = "NIMBUSKV_SHARDS";
pub const ENV_LOG: &str = "NIMBUSKV_LOG";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{option} requires a value")]
    MissingValue { option: String },

    #[error("invalid value {value:?} for {option}")]
    InvalidValue { option: String, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Number of storage shards; at least 1.
    pub shards: usize,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            shards: DEFAULT_SHARDS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Serve(Config),
    Help,
    Version,
}

impl Config {
    /// Reads the process environment and arguments.
    pub fn load() -> Result<Invocation, ConfigError> {
        Self::from_sources(|name| std::env::var(name).ok(), std::env::args().skip(1))
    }

    /// Builds a configuration from an environment lookup and the arguments
    /// following the program name.
    pub fn from_sources<E, I>(env: E, args: I) -> Result<Invocation, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();

        if let Some(host) = env(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = env(ENV_PORT) {
            config.port = parse_value(ENV_PORT, &port)?;
        }
        if let Some(shards) = env(ENV_SHARDS) {
            config.shards = parse_shards(ENV_SHARDS, &shards)?;
        }
        if let Some(level) = env(ENV_LOG) {
            config.log_level = level;
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next().ok_or_else(|| ConfigError::MissingValue {
                    option: arg.clone(),
                })
            };

            match arg.as_str() {
                "--host" | "-h" => config.host = value()?,
                "--port" | "-p" => config.port = parse_value(&arg, &value()?)?,
                "--shards" => config.shards = parse_shards(&arg, &value()?)?,
                "--log-level" => config.log_level = value()?,
                "--help" => return Ok(Invocation::Help),
                "--version" | "-v" => return Ok(Invocation::Version),
                _ => return Err(ConfigError::UnknownArgument(arg.clone())),
            }
        }

        Ok(Invocation::Serve(config))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T: std::str::FromStr>(option: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
    })
}

fn parse_shards(option: &str, value: &str) -> Result<usize, ConfigError> {
    match parse_value(option, value)? {
        0 => Err(ConfigError::InvalidValue {
            option: option.to_string(),
            value: value.to_string(),
        }),
        n => Ok(n),
    }
}

pub fn usage() -> String {
    format!(
        r#"nimbuskv {version}
In-memory key-value server speaking RESP

USAGE:
    nimbuskv [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: {host}, env: {ENV_HOST})
    -p, --port <PORT>          Port to listen on (default: {port}, env: {ENV_PORT})
        --shards <N>           Storage shard count (default: {shards}, env: {ENV_SHARDS})
        --log-level <FILTER>   Log filter when RUST_LOG is unset (default: {level}, env: {ENV_LOG})
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLE:
    $ redis-cli -p {port}
    127.0.0.1:{port}> RPUSH queue job1 job2
    OK
    127.0.0.1:{port}> LPOP queue
    "job1""#,
        version = env!("CARGO_PKG_VERSION"),
        host = DEFAULT_HOST,
        port = DEFAULT_PORT,
        shards = DEFAULT_SHARDS,
        level = DEFAULT_LOG_LEVEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(env: &[(&str, &str)], args: &[&str]) -> Result<Invocation, ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(
            |name| env.get(name).cloned(),
            args.iter().map(|s| s.to_string()),
        )
    }

    fn serve(config: Config) -> Result<Invocation, ConfigError> {
        Ok(Invocation::Serve(config))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "127.0.0.1:6379");
        assert_eq!(config.shards, 64);
        assert_eq!(load(&[], &[]), serve(config));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let result = load(
            &[
                (ENV_HOST, "0.0.0.0"),
                (ENV_PORT, "7000"),
                (ENV_SHARDS, "8"),
                (ENV_LOG, "debug"),
            ],
            &[],
        );
        assert_eq!(
            result,
            serve(Config {
                host: "0.0.0.0".to_string(),
                port: 7000,
                shards: 8,
                log_level: "debug".to_string(),
            })
        );
    }

    #[test]
    fn test_flags_override_env() {
        let result = load(
            &[(ENV_PORT, "7000"), (ENV_SHARDS, "8")],
            &["-p", "7001", "--host", "::1", "--shards", "4", "--log-level", "trace"],
        );
        assert_eq!(
            result,
            serve(Config {
                host: "::1".to_string(),
                port: 7001,
                shards: 4,
                log_level: "trace".to_string(),
            })
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(load(&[], &["--help"]), Ok(Invocation::Help));
        assert_eq!(load(&[], &["-p", "1", "-v"]), Ok(Invocation::Version));
        assert!(usage().contains("--shards"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            load(&[], &["--port"]),
            Err(ConfigError::MissingValue {
                option: "--port".to_string()
            })
        );
        assert_eq!(
            load(&[], &["--port", "high"]),
            Err(ConfigError::InvalidValue {
                option: "--port".to_string(),
                value: "high".to_string()
            })
        );
        assert_eq!(
            load(&[(ENV_SHARDS, "0")], &[]),
            Err(ConfigError::InvalidValue {
                option: ENV_SHARDS.to_string(),
                value: "0".to_string()
            })
        );
        assert_eq!(
            load(&[], &["--verbose"]),
            Err(ConfigError::UnknownArgument("--verbose".to_string()))
        );
    }
}
