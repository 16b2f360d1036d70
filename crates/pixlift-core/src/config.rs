//! Configuration module
//!
//! Configuration is read once at startup from the environment (and an optional `.env`
//! file) into an immutable [`Config`] that is handed to the pipeline and the HTTP layer.
//! Both vendor credentials are mandatory: `Config::from_env` fails when either is missing.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 3000;
const HTTP_CONCURRENCY_LIMIT: usize = 256;
const MAX_FILE_SIZE_MB: usize = 5;
const POLL_INTERVAL_MS: u64 = 2000;
const POLL_MAX_ATTEMPTS: u32 = 30;
const OUTBOUND_TIMEOUT_SECS: u64 = 60;
/// Neither development nor production: no error traces, wildcard CORS allowed.
const DEFAULT_ENVIRONMENT: &str = "local";

pub const DEFAULT_REMOVE_BG_API_URL: &str = "https://api.remove.bg/v1.0/removebg";
pub const DEFAULT_REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";
/// Real-ESRGAN (`cjwbw/real-esrgan`) model version used for enhancement.
pub const DEFAULT_REPLICATE_MODEL_VERSION: &str =
    "42fed1c4974146d4d2414e2be2c5277c7fcf05fcc3a73abf41610695738c1d7b";

/// Log output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
    pub log_format: LogFormat,
    /// Per-request timeout for calls to remove.bg and Replicate
    pub outbound_timeout: Duration,
}

/// Background removal service (remove.bg)
#[derive(Clone)]
pub struct RemoveBgConfig {
    pub api_key: String,
    pub api_url: String,
}

/// Enhancement service (Replicate)
#[derive(Clone)]
pub struct ReplicateConfig {
    pub api_token: String,
    pub api_base: String,
    pub model_version: String,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
}

/// Upload intake and temporary artifact settings
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub remove_bg: RemoveBgConfig,
    pub replicate: ReplicateConfig,
    pub uploads: UploadConfig,
}

// Credentials never show up in logs.
impl std::fmt::Debug for RemoveBgConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoveBgConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for ReplicateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicateConfig")
            .field("api_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model_version", &self.model_version)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .finish()
    }
}

/// Reads settings by key. `Config::from_env` backs it with the process environment.
struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.var(key).unwrap_or_else(|| default.to_string())
    }

    /// Unset falls back to `default`; a value that does not parse is an error.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, anyhow::Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.var(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
            None => Ok(default),
        }
    }

    fn required(&self, key: &str) -> Result<String, anyhow::Error> {
        self.var(key)
            .ok_or_else(|| anyhow::anyhow!("{} must be set", key))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, then validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = EnvReader { lookup };

        let environment = vars
            .var("ENVIRONMENT")
            .or_else(|| vars.var("APP_ENV"))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let cors_origins = vars
            .string_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: vars.parse_or("PORT", SERVER_PORT)?,
            cors_origins,
            environment,
            http_concurrency_limit: vars.parse_or("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT)?,
            log_format: vars.parse_or("LOG_FORMAT", LogFormat::Pretty)?,
            outbound_timeout: Duration::from_secs(
                vars.parse_or("OUTBOUND_TIMEOUT_SECS", OUTBOUND_TIMEOUT_SECS)?,
            ),
        };

        let remove_bg = RemoveBgConfig {
            api_key: vars.required("REMOVE_BG_API_KEY")?,
            api_url: vars.string_or("REMOVE_BG_API_URL", DEFAULT_REMOVE_BG_API_URL),
        };

        let replicate = ReplicateConfig {
            api_token: vars.required("REPLICATE_API_TOKEN")?,
            api_base: vars.string_or("REPLICATE_API_BASE", DEFAULT_REPLICATE_API_BASE),
            model_version: vars.string_or("REPLICATE_MODEL_VERSION", DEFAULT_REPLICATE_MODEL_VERSION),
            poll_interval: Duration::from_millis(
                vars.parse_or("ENHANCE_POLL_INTERVAL_MS", POLL_INTERVAL_MS)?,
            ),
            poll_max_attempts: vars.parse_or("ENHANCE_POLL_MAX_ATTEMPTS", POLL_MAX_ATTEMPTS)?,
        };

        let max_file_size_mb: usize = vars.parse_or("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB)?;
        let uploads = UploadConfig {
            upload_dir: vars.string_or("UPLOAD_DIR", "uploads"),
            public_base_url: vars.string_or("UPLOAD_BASE_URL", "/uploads"),
            max_file_size_bytes: max_file_size_mb
                .checked_mul(1024 * 1024)
                .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large"))?,
            allowed_content_types: split_list(&vars.string_or(
                "ALLOWED_CONTENT_TYPES",
                "image/jpeg,image/png,image/webp",
            )),
        };

        let config = Config {
            base,
            remove_bg,
            replicate,
            uploads,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.remove_bg.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("REMOVE_BG_API_KEY must be set"));
        }

        if self.replicate.api_token.trim().is_empty() {
            return Err(anyhow::anyhow!("REPLICATE_API_TOKEN must be set"));
        }

        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.uploads.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB cannot be 0"));
        }

        if self.uploads.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES cannot be empty"));
        }

        if self.replicate.poll_max_attempts == 0 {
            return Err(anyhow::anyhow!("ENHANCE_POLL_MAX_ATTEMPTS cannot be 0"));
        }

        if self.base.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT cannot be 0"));
        }

        if self.poll_budget().is_none() {
            return Err(anyhow::anyhow!(
                "ENHANCE_POLL_INTERVAL_MS * ENHANCE_POLL_MAX_ATTEMPTS is out of range"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Longest time a request can spend polling one enhancement job
    pub fn poll_budget(&self) -> Option<Duration> {
        self.replicate
            .poll_interval
            .checked_mul(self.replicate.poll_max_attempts)
    }

    /// Development mode exposes error chains in API responses. It must be set explicitly.
    pub fn is_development(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "development" || env == "dev"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.uploads.max_file_size_bytes
    }

    pub fn remove_bg_configured(&self) -> bool {
        !self.remove_bg.api_key.trim().is_empty()
    }

    pub fn replicate_configured(&self) -> bool {
        !self.replicate.api_token.trim().is_empty()
    }
}
