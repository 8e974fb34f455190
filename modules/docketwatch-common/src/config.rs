use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// One week.
const MAX_INTERVAL_MINS: u64 = 7 * 24 * 60;
const MAX_BACKOFF: u32 = 1024;
const MAX_FETCH_TIMEOUT_SECS: u64 = 600;

/// TOML-backed configuration loaded from disk. Every field has a default, so
/// an empty file (or no file) is valid. Secrets stay as env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub schedule: ScheduleConfig,
    pub feeds: FeedsConfig,
    pub watchlist: WatchlistConfig,
    pub sinks: SinksConfig,
    pub social: SocialConfig,
    pub email: EmailConfig,
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Expected gap between feed updates for a court.
    pub scrape_interval_mins: u64,
    /// Sleep between scheduler ticks; also the unit of backoff.
    pub check_interval_mins: u64,
    /// Ceiling for the per-court backoff multiplier.
    pub max_backoff: u32,
    pub fetch_timeout_secs: u64,
    /// Per-court watermarks are saved here after every tick.
    pub checkpoint_path: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scrape_interval_mins: 35,
            check_interval_mins: 5,
            max_backoff: 64,
            fetch_timeout_secs: 10,
            checkpoint_path: PathBuf::from("docketwatch-state.json"),
        }
    }
}

impl ScheduleConfig {
    pub fn scrape_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.scrape_interval_mins as i64)
    }

    pub fn check_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.check_interval_mins as i64)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedsConfig {
    /// `{court}` is replaced with the court code.
    pub url_template: String,
    pub user_agent: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            url_template: "https://ecf.{court}.uscourts.gov/cgi-bin/rss_outside.pl".to_string(),
            user_agent: concat!("docketwatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FeedsConfig {
    pub fn feed_url(&self, court: &str) -> String {
        self.url_template.replace("{court}", court)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchlistConfig {
    /// JSON case list. Without one, nothing is watched.
    pub path: Option<PathBuf>,
    /// When this file exists with a non-blank first line, checks are paused.
    pub pause_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinksConfig {
    pub social: bool,
    pub email: bool,
    pub archive_log: bool,
    pub log: bool,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            social: false,
            email: false,
            archive_log: false,
            log: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocialConfig {
    pub endpoint: String,
    /// Hard limit enforced by the posting service.
    pub max_chars: usize,
    /// Combined budget for case name plus title before the link is appended.
    pub text_budget: usize,
    /// Case-name substitutions applied before truncation.
    pub shorten: Vec<(String, String)>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.twitter.com/2/tweets".to_string(),
            max_chars: 280,
            text_budget: 100,
            shorten: vec![
                (" v. ".to_string(), " v ".to_string()),
                ("John Doe".to_string(), "Doe".to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    /// HTTP mail-submission endpoint.
    pub endpoint: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub database_url: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://docketwatch.db?mode=rwc".to_string(),
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Complete process configuration: file settings plus secrets from env.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
    pub social_bearer_token: Option<String>,
    pub email_api_key: Option<String>,
}

impl Config {
    /// Load the TOML file (defaults when `path` is `None`), then secrets from
    /// the environment (`.env` honoured), then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(p) => load_file_config(p)?,
            None => FileConfig::default(),
        };

        let config = Self {
            file,
            social_bearer_token: non_empty_env("SOCIAL_BEARER_TOKEN"),
            email_api_key: non_empty_env("EMAIL_API_KEY"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Every enabled sink must have what it needs to deliver.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let schedule = &self.file.schedule;
        if schedule.check_interval_mins == 0 || schedule.scrape_interval_mins == 0 {
            return Err(ConfigError::Invalid(
                "schedule intervals must be at least one minute".to_string(),
            ));
        }
        if schedule.check_interval_mins > MAX_INTERVAL_MINS
            || schedule.scrape_interval_mins > MAX_INTERVAL_MINS
        {
            return Err(ConfigError::Invalid(format!(
                "schedule intervals must be at most {MAX_INTERVAL_MINS} minutes"
            )));
        }
        if schedule.max_backoff == 0 || schedule.max_backoff > MAX_BACKOFF {
            return Err(ConfigError::Invalid(format!(
                "max_backoff must be between 1 and {MAX_BACKOFF}"
            )));
        }
        if !(1..=MAX_FETCH_TIMEOUT_SECS).contains(&schedule.fetch_timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "fetch_timeout_secs must be between 1 and {MAX_FETCH_TIMEOUT_SECS}"
            )));
        }
        if !self.file.feeds.url_template.contains("{court}") {
            return Err(ConfigError::Invalid(
                "feeds.url_template must contain {court}".to_string(),
            ));
        }

        let sinks = &self.file.sinks;
        if sinks.social && self.social_bearer_token.is_none() {
            return Err(ConfigError::Missing("SOCIAL_BEARER_TOKEN"));
        }
        if sinks.email {
            if self.email_api_key.is_none() {
                return Err(ConfigError::Missing("EMAIL_API_KEY"));
            }
            let email = &self.file.email;
            if email.endpoint.is_none() || email.from.is_none() || email.to.is_empty() {
                return Err(ConfigError::Invalid(
                    "email sink requires email.endpoint, email.from and email.to".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn log_redacted(&self) {
        fn preview(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.char_indices().nth(4).map(|(i, _)| i).unwrap_or(v.len());
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        let sinks = &self.file.sinks;
        tracing::info!(
            social = sinks.social,
            email = sinks.email,
            archive_log = sinks.archive_log,
            log = sinks.log,
            "Sinks enabled"
        );
        tracing::info!("  SOCIAL_BEARER_TOKEN: {}", preview(&self.social_bearer_token));
        tracing::info!("  EMAIL_API_KEY: {}", preview(&self.email_api_key));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
