//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where and how the ranking pages are fetched
    #[serde(default)]
    pub source: SourceConfig,

    /// Poll and retry intervals
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Snapshot, archive and report locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// SMTP delivery of reports
    #[serde(default)]
    pub mail: MailConfig,

    /// Log levels and log file locations
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.source.page_size == 0 {
            return Err(AppError::validation("source.page_size must be > 0"));
        }
        if self.source.target_count == 0 {
            return Err(AppError::validation("source.target_count must be > 0"));
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(AppError::validation(
                "schedule.poll_interval_secs must be > 0",
            ));
        }
        url::Url::parse(&self.source.base_url)?;
        Ok(())
    }
}

/// Ranking source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root; the list lives under `/top250`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Browser-like User-Agent header
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Items per page; the page offset steps by this amount
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Number of items a complete snapshot must hold
    #[serde(default = "defaults::target_count")]
    pub target_count: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            target_count: defaults::target_count(),
        }
    }
}

/// Poll loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Wait between two cycles
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Wait before re-paginating after an incomplete pass
    #[serde(default = "defaults::retry_interval")]
    pub retry_interval_secs: u64,
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            retry_interval_secs: defaults::retry_interval(),
        }
    }
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Latest accepted snapshot, overwritten every cycle
    #[serde(default = "defaults::snapshot_file")]
    pub snapshot_file: String,

    /// Directory for timestamped snapshot copies
    #[serde(default = "defaults::records_dir")]
    pub records_dir: String,

    /// Directory for change reports and mail fallbacks
    #[serde(default = "defaults::logs_dir")]
    pub logs_dir: String,

    /// Whether each accepted snapshot is also archived
    #[serde(default = "defaults::archive_records")]
    pub archive_records: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snapshot_file: defaults::snapshot_file(),
            records_dir: defaults::records_dir(),
            logs_dir: defaults::logs_dir(),
            archive_records: defaults::archive_records(),
        }
    }
}

/// SMTP settings. Mail is skipped while any credential is blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "defaults::smtp_host")]
    pub smtp_host: String,

    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    /// Login and sender address
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Display name in the `From` header
    #[serde(default = "defaults::sender_name")]
    pub sender_name: String,

    #[serde(default)]
    pub recipient: String,

    /// Upgrade the connection with STARTTLS
    #[serde(default = "defaults::starttls")]
    pub starttls: bool,

    #[serde(default = "defaults::change_subject")]
    pub change_subject: String,

    #[serde(default = "defaults::failure_subject")]
    pub failure_subject: String,
}

impl MailConfig {
    /// Whether every field needed to talk to the SMTP server is set.
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.trim().is_empty()
            && self.smtp_port != 0
            && !self.username.trim().is_empty()
            && !self.password.is_empty()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: defaults::smtp_host(),
            smtp_port: defaults::smtp_port(),
            username: String::new(),
            password: String::new(),
            sender_name: defaults::sender_name(),
            recipient: String::new(),
            starttls: defaults::starttls(),
            change_subject: defaults::change_subject(),
            failure_subject: defaults::failure_subject(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn or error
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Directory of the rotating JSON log files
    #[serde(default = "defaults::log_dir")]
    pub log_dir: String,

    /// Base name of the main log file
    #[serde(default = "defaults::log_file_name")]
    pub file_name: String,

    /// Base name of the persistence log file
    #[serde(default = "defaults::db_log_file_name")]
    pub db_file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            log_dir: defaults::log_dir(),
            file_name: defaults::log_file_name(),
            db_file_name: defaults::db_log_file_name(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://movie.douban.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_5) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/79.0.3945.117 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> usize {
        25
    }
    pub fn target_count() -> usize {
        250
    }

    // Schedule defaults
    pub fn poll_interval() -> u64 {
        24 * 60 * 60
    }
    pub fn retry_interval() -> u64 {
        8 * 60 * 60
    }

    // Path defaults
    pub fn snapshot_file() -> String {
        "top250.json".into()
    }
    pub fn records_dir() -> String {
        "records".into()
    }
    pub fn logs_dir() -> String {
        "logs".into()
    }
    pub fn archive_records() -> bool {
        true
    }

    // Mail defaults
    pub fn smtp_host() -> String {
        "smtp.qq.com".into()
    }
    pub fn smtp_port() -> u16 {
        25
    }
    pub fn sender_name() -> String {
        "douban-top250-monitor".into()
    }
    pub fn starttls() -> bool {
        true
    }
    pub fn change_subject() -> String {
        "豆瓣电影Top250监测到变化".into()
    }
    pub fn failure_subject() -> String {
        "豆瓣电影Top250监测程序异常".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "debug".into()
    }
    pub fn log_dir() -> String {
        "../logs".into()
    }
    pub fn log_file_name() -> String {
        "monitor".into()
    }
    pub fn db_log_file_name() -> String {
        "monitor_db".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.source.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::default();
        config.source.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.source.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [schedule]
            poll_interval_secs = 3600

            [mail]
            recipient = "me@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.schedule.poll_interval(), Duration::from_secs(3600));
        assert_eq!(config.schedule.retry_interval(), Duration::from_secs(8 * 3600));
        assert_eq!(config.source.target_count, 250);
        assert_eq!(config.source.page_size, 25);
        assert_eq!(config.mail.recipient, "me@example.com");
        assert_eq!(config.mail.smtp_host, "smtp.qq.com");
        assert!(config.paths.archive_records);
    }

    #[test]
    fn to_toml_round_trips() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.paths.snapshot_file, "top250.json");
        assert_eq!(parsed.logging.db_file_name, "monitor_db");
    }

    #[test]
    fn mail_requires_credentials() {
        let mut mail = MailConfig::default();
        assert!(!mail.is_configured());
        mail.username = "bot@example.com".to_string();
        mail.password = "secret".to_string();
        assert!(mail.is_configured());
        mail.smtp_port = 0;
        assert!(!mail.is_configured());
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.source.target_count, 250);
    }
}
