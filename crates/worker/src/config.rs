use std::str::FromStr;
use std::time::Duration;

use screenreel_events::EmailConfig;
use screenreel_pipeline::lifecycle::LifecycleConfig;
use screenreel_pipeline::transcription::TranscriptionConfig;
use screenreel_storage::S3Config;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(other.to_string()),
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub s3: S3Config,
    /// `None` when SMTP is not configured; lifecycle emails are then off.
    pub email: Option<EmailConfig>,
    pub transcription: TranscriptionConfig,
    pub lifecycle: LifecycleConfig,
    pub cue_repair_enabled: bool,
    pub cue_repair_interval: Duration,
    pub lifecycle_email_interval: Duration,
    /// Base for links in outgoing email.
    pub app_base_url: String,
    /// How long shutdown waits for in-flight background tasks.
    pub shutdown_grace: Duration,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `DATABASE_URL`                  | required                |
    /// | `S3_BUCKET`                     | required                |
    /// | `MAX_UPLOAD_BYTES`              | `5368709120` (5 GiB)    |
    /// | `DELETE_MAX_ATTEMPTS`           | `3`                     |
    /// | `CUE_REPAIR_ENABLED`            | `true`                  |
    /// | `CUE_REPAIR_INTERVAL_SECS`      | `300`                   |
    /// | `LIFECYCLE_EMAIL_INTERVAL_SECS` | `3600`                  |
    /// | `APP_BASE_URL`                  | `http://localhost:3000` |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `30`                    |
    /// | `LOG_FORMAT`                    | `text`                  |
    ///
    /// Storage, SMTP and transcription variables are documented on
    /// [`S3Config::from_env`], [`EmailConfig::from_env`] and
    /// [`TranscriptionConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = |var: &str| std::env::var(var).ok();

        let database_url = env("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let s3 = S3Config::from_env().ok_or(ConfigError::Missing("S3_BUCKET"))?;

        let defaults = LifecycleConfig::default();
        let lifecycle = LifecycleConfig {
            max_upload_bytes: parse_or(
                "MAX_UPLOAD_BYTES",
                env("MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            )?,
            delete_max_attempts: parse_or(
                "DELETE_MAX_ATTEMPTS",
                env("DELETE_MAX_ATTEMPTS"),
                defaults.delete_max_attempts,
            )?,
            ..defaults
        };

        Ok(Self {
            database_url,
            s3,
            email: EmailConfig::from_env(),
            transcription: TranscriptionConfig::from_env(),
            lifecycle,
            cue_repair_enabled: parse_or("CUE_REPAIR_ENABLED", env("CUE_REPAIR_ENABLED"), true)?,
            cue_repair_interval: secs_or(
                "CUE_REPAIR_INTERVAL_SECS",
                env("CUE_REPAIR_INTERVAL_SECS"),
                300,
            )?,
            lifecycle_email_interval: secs_or(
                "LIFECYCLE_EMAIL_INTERVAL_SECS",
                env("LIFECYCLE_EMAIL_INTERVAL_SECS"),
                3600,
            )?,
            app_base_url: env("APP_BASE_URL")
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| "http://localhost:3000".into()),
            shutdown_grace: secs_or("SHUTDOWN_TIMEOUT_SECS", env("SHUTDOWN_TIMEOUT_SECS"), 30)?,
            log_format: parse_or("LOG_FORMAT", env("LOG_FORMAT"), LogFormat::Text)?,
        })
    }
}

/// Parse `raw` if present and non-blank, otherwise use `default`.
fn parse_or<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}

/// Positive number of seconds.
fn secs_or(var: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match parse_or(var, raw.clone(), default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: raw.unwrap_or_default(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
