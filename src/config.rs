use crate::classify::{Classifier, DEFAULT_CONNECTION_ERROR_PATTERN};
use crate::core::{PsqlSessionError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default role used when no user is given.
pub const DEFAULT_USER: &str = "postgres";
/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default server port.
pub const DEFAULT_PORT: u16 = 5432;

/// Validated connection parameters for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    user: String,
    password: String,
    host: String,
    port: u16,
}

impl ConnectionParams {
    /// Applies defaults for user, host and port, then checks credentials.
    ///
    /// # Errors
    ///
    /// `PsqlSessionError::Configuration` if the user or password is empty.
    pub fn new(
        user: Option<&str>,
        password: &str,
        host: Option<&str>,
        port: Option<u16>,
    ) -> Result<Self> {
        let params = ConnectionParams {
            user: user.unwrap_or(DEFAULT_USER).to_string(),
            password: password.to_string(),
            host: host.unwrap_or(DEFAULT_HOST).to_string(),
            port: port.unwrap_or(DEFAULT_PORT),
        };

        if params.user.is_empty() {
            return Err(PsqlSessionError::Configuration("user".to_string()));
        }
        if params.password.is_empty() {
            return Err(PsqlSessionError::Configuration("password".to_string()));
        }
        Ok(params)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Connection settings as written in the file; every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub user: Option<String>,
    /// Password (prefer PGPASSWORD over storing it in the file).
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Databases queried when none are named on the command line.
    #[serde(default)]
    pub databases: Vec<String>,
}

impl ConnectionConfig {
    /// Fills unset fields from PGUSER, PGPASSWORD, PGHOST and PGPORT.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.user.is_none() {
            self.user = lookup("PGUSER");
        }
        if self.password.is_none() {
            self.password = lookup("PGPASSWORD");
        }
        if self.host.is_none() {
            self.host = lookup("PGHOST");
        }
        if self.port.is_none() {
            if let Some(port) = lookup("PGPORT") {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| PsqlSessionError::Config(format!("invalid PGPORT {port:?}: {e}")))?;
                self.port = Some(port);
            }
        }
        Ok(())
    }

    /// Converts into validated parameters.
    pub fn to_params(&self) -> Result<ConnectionParams> {
        ConnectionParams::new(
            self.user.as_deref(),
            self.password.as_deref().unwrap_or_default(),
            self.host.as_deref(),
            self.port,
        )
    }
}

/// Output classification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Regex that marks a psql connection failure in the combined output.
    #[serde(default = "default_connection_error_pattern")]
    pub connection_error_pattern: String,
}

fn default_connection_error_pattern() -> String {
    DEFAULT_CONNECTION_ERROR_PATTERN.to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            connection_error_pattern: default_connection_error_pattern(),
        }
    }
}

impl ClassifierConfig {
    /// Compiles the configured patterns.
    pub fn build(&self) -> Result<Classifier> {
        Classifier::with_connection_error_pattern(&self.connection_error_pattern)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = psql_session::config::load_config("config.toml")?;
/// println!("{:?}", config);
/// # Ok::<(), psql_session::core::PsqlSessionError>(())
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Default config file location, `<config_dir>/psql-session/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("psql-session").join("config.toml"))
}
