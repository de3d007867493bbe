use std::fmt;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{LogsError, Result};
use crate::models::ReportKind;

/// Database holding the `logs` and `cohorts` tables.
pub const DATABASE_NAME: &str = "curriculum_logs";

/// Cache file written next to the working directory after the first fetch.
pub const DEFAULT_CACHE_FILE: &str = "curriculum_logs.csv";

/// Port used when the configured host does not name one.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Exploratory reports over curriculum access logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "curriculum-logs",
    about = "Exploratory reports over curriculum access logs",
    version
)]
pub struct Settings {
    /// Database user
    #[arg(long, env = "CURRICULUM_DB_USER")]
    pub user: Option<String>,

    /// Database password
    #[arg(long, env = "CURRICULUM_DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Database host, optionally with a port (host:port)
    #[arg(long, env = "CURRICULUM_DB_HOST")]
    pub host: Option<String>,

    /// JSON file with `user`, `password` and `host` fields
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Location of the cached log table
    #[arg(long, default_value = DEFAULT_CACHE_FILE)]
    pub cache_file: PathBuf,

    /// Ignore the cache file and fetch from the database
    #[arg(long)]
    pub refresh: bool,

    /// Reports to produce (repeatable)
    #[arg(
        long,
        default_value = "all",
        value_parser = ["all", "pages-by-cohort", "least-visited", "post-graduation", "active-students"]
    )]
    pub report: Vec<String>,

    /// Maximum rows printed per table
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply `--debug`.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but over an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Reports requested on the command line, deduplicated, in canonical order.
    pub fn selected_reports(&self) -> Vec<ReportKind> {
        if self.report.iter().any(|r| r == "all") {
            return ReportKind::ALL.to_vec();
        }
        let mut kinds: Vec<ReportKind> = self
            .report
            .iter()
            .filter_map(|r| ReportKind::parse(r))
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Assemble database credentials from the credentials file and flags.
    ///
    /// Flags (and their environment variables) override file values. Returns
    /// `Ok(None)` when nothing was supplied at all, and a
    /// [`LogsError::Config`] when only some of the three values are known.
    pub fn resolve_credentials(&self) -> Result<Option<DbCredentials>> {
        let mut partial = match &self.credentials {
            Some(path) => PartialCredentials::from(DbCredentials::load_from(path)?),
            None => PartialCredentials::default(),
        };

        if let Some(user) = &self.user {
            partial.user = Some(user.clone());
        }
        if let Some(password) = &self.password {
            partial.password = Some(password.clone());
        }
        if let Some(host) = &self.host {
            partial.host = Some(host.clone());
        }

        partial.complete()
    }
}

// ── DbCredentials ──────────────────────────────────────────────────────────────

/// Connection credentials for the curriculum log database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbCredentials {
    pub user: String,
    pub password: String,
    pub host: String,
}

impl DbCredentials {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
        }
    }

    /// Load credentials from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LogsError::Config(format!(
                "cannot read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Connection URL with the password masked, for log output.
    pub fn redacted_url(&self) -> String {
        format!("mysql://{}:***@{}/{}", self.user, self.host, DATABASE_NAME)
    }

    /// Split `host` into host name and port, defaulting to
    /// [`DEFAULT_MYSQL_PORT`].
    pub fn host_and_port(&self) -> Result<(String, u16)> {
        match self.host.rsplit_once(':') {
            Some((name, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    LogsError::Config(format!("invalid port in database host {:?}", self.host))
                })?;
                Ok((name.to_string(), port))
            }
            None => Ok((self.host.clone(), DEFAULT_MYSQL_PORT)),
        }
    }
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .finish()
    }
}

// ── PartialCredentials ─────────────────────────────────────────────────────────

#[derive(Default)]
struct PartialCredentials {
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
}

impl From<DbCredentials> for PartialCredentials {
    fn from(c: DbCredentials) -> Self {
        Self {
            user: Some(c.user),
            password: Some(c.password),
            host: Some(c.host),
        }
    }
}

impl PartialCredentials {
    fn complete(self) -> Result<Option<DbCredentials>> {
        match (self.user, self.password, self.host) {
            (None, None, None) => Ok(None),
            (Some(user), Some(password), Some(host)) => {
                Ok(Some(DbCredentials::new(user, password, host)))
            }
            (user, password, host) => {
                let missing: Vec<&str> = [
                    ("user", user.is_none()),
                    ("password", password.is_none()),
                    ("host", host.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(LogsError::Config(format!(
                    "incomplete database credentials, missing: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
