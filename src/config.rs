use clap::{builder::NonEmptyStringValueParser, ArgAction, Parser};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration, read from flags or the environment.
///
/// `DATABASE` and `SECRET_KEY` are required and must be non-empty; clap
/// rejects the process before anything starts when either one is missing.
#[derive(Parser, Debug, Clone)]
#[command(name = "server", about = "User portal web server", long_about = None)]
pub struct Config {
    #[arg(
        long,
        env = "DATABASE",
        value_parser = NonEmptyStringValueParser::new(),
        help = "Path to the SQLite database file"
    )]
    pub database: String,

    #[arg(
        long,
        env = "SECRET_KEY",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Secret used to sign session cookies"
    )]
    pub secret_key: String,

    #[arg(
        long,
        env = "DEBUG",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = parse_flag,
        help = "Enable debug logging (true/1/yes/on)"
    )]
    pub debug: bool,

    #[arg(long = "bind", env = "BIND_ADDR", default_value = "127.0.0.1:5000", help = "Address to listen on")]
    pub bind: SocketAddr,

    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads", help = "Directory holding uploaded files")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 16 * 1024 * 1024, help = "Maximum request body size in bytes")]
    pub max_upload_bytes: usize,

    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31),
        help = "bcrypt work factor for new passwords (4-31)"
    )]
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Loads `KEY=value` lines from `path` into the process environment.
/// Variables that are already set keep their value. Returns whether a file
/// was loaded.
pub fn load_env_file(path: &Path) -> bool {
    dotenvy::from_path(path).is_ok()
}

/// Anything that is not a recognised truthy string is `false`.
fn parse_flag(value: &str) -> Result<bool, Infallible> {
    Ok(matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("server").chain(args.iter().copied()))
    }

    #[test]
    fn truthy_strings_enable_debug() {
        for value in ["true", "TRUE", "True", "1", "yes", "on"] {
            assert!(parse_flag(value).unwrap(), "{value} should be truthy");
        }
    }

    #[test]
    fn other_strings_disable_debug() {
        for value in ["false", "0", "no", "", "maybe", "tru"] {
            assert!(!parse_flag(value).unwrap(), "{value} should be falsy");
        }
    }

    #[test]
    fn required_values_and_defaults() {
        let config = parse(&["--database", "app.db", "--secret-key", "s3cret"]).unwrap();
        assert_eq!(config.database, "app.db");
        assert_eq!(config.secret_key, "s3cret");
        assert!(!config.debug);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn debug_flag_accepts_garbage_as_false() {
        let config = parse(&["--database", "a.db", "--secret-key", "k", "--debug", "whatever"]).unwrap();
        assert!(!config.debug);

        let config = parse(&["--database", "a.db", "--secret-key", "k", "--debug", "True"]).unwrap();
        assert!(config.debug);
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(parse(&["--database", "app.db", "--secret-key", ""]).is_err());
    }

    #[test]
    fn bcrypt_cost_outside_range_is_rejected() {
        for cost in ["3", "32", "0"] {
            assert!(
                parse(&["--database", "a.db", "--secret-key", "k", "--bcrypt-cost", cost]).is_err(),
                "cost {cost} should be rejected"
            );
        }
        let config = parse(&["--database", "a.db", "--secret-key", "k", "--bcrypt-cost", "4"]).unwrap();
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn missing_database_is_rejected() {
        std::env::remove_var("DATABASE");
        let err = parse(&["--secret-key", "k"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn env_file_fills_unset_variables_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "USER_PORTAL_ENV_FILE_NEW=from-file\nUSER_PORTAL_ENV_FILE_SET=from-file\n",
        )
        .unwrap();
        std::env::set_var("USER_PORTAL_ENV_FILE_SET", "from-env");

        assert!(load_env_file(&path));
        assert_eq!(std::env::var("USER_PORTAL_ENV_FILE_NEW").unwrap(), "from-file");
        assert_eq!(std::env::var("USER_PORTAL_ENV_FILE_SET").unwrap(), "from-env");

        assert!(!load_env_file(&dir.path().join("missing.env")));
    }
}
