//! Configuration types for videodl
//!
//! The configuration is read once at process start, validated, and passed
//! into [`DownloadOrchestrator`](crate::DownloadOrchestrator) behind an `Arc`.
//! Nothing in the crate reads it from global state.

use crate::error::{Error, Result};
use crate::utils::BYTES_MB;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default yt-dlp format selection: prefer a single mp4, fall back to merging
pub const DEFAULT_FORMAT_SELECTION: &str =
    "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio/best/bestvideo+bestaudio";

/// Cookie file picked up automatically when present
pub const DEFAULT_COOKIE_FILE: &str = ".secrets/cookies.txt";

/// Size thresholds deciding the delivery channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest file delivered inline through the chat (default: 50 MiB)
    #[serde(default = "default_inline_limit")]
    pub inline_limit_bytes: u64,

    /// Absolute per-job ceiling; larger files are rejected (default: 500 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            inline_limit_bytes: default_inline_limit(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

/// Job supervision settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    /// Parent directory for per-job working directories (default: system temp dir)
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// How often the orchestrator samples the job (default: 500 ms)
    #[serde(default = "default_poll_interval", with = "duration_millis_serde")]
    pub poll_interval: Duration,

    /// Minimum spacing between two progress messages (default: 1.5 s)
    #[serde(default = "default_report_interval", with = "duration_millis_serde")]
    pub report_interval: Duration,

    /// Overall job timeout bounding the polling loop (default: 30 minutes)
    #[serde(default = "default_job_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            poll_interval: default_poll_interval(),
            report_interval: default_report_interval(),
            timeout: default_job_timeout(),
        }
    }
}

/// External tool paths and extraction options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for binaries if explicit paths are not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Format selection string handed to the extraction tool
    #[serde(default = "default_format")]
    pub format: String,

    /// Container used when separate audio/video streams are merged (default: "mp4")
    #[serde(default = "default_merge_format")]
    pub merge_output_format: String,

    /// Netscape-format cookie file for authenticated sources
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,

    /// Prefer IPv6 transport (default: true)
    #[serde(default = "default_true")]
    pub force_ipv6: bool,

    /// Retry count passed to the extraction tool's own retry logic (default: 10)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Socket timeout passed to the extraction tool (default: 30 seconds)
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    pub socket_timeout: Duration,

    /// Extractors whose codecs are checked against the compatibility table.
    /// Empty means every extractor. (default: ["youtube"])
    #[serde(default = "default_convert_extractors")]
    pub convert_extractors: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            format: default_format(),
            merge_output_format: default_merge_format(),
            cookie_file: None,
            force_ipv6: true,
            retries: default_retries(),
            socket_timeout: default_socket_timeout(),
            convert_extractors: default_convert_extractors(),
        }
    }
}

/// Offload storage settings (HTTP object storage)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base endpoint of the storage REST API
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Bucket name
    pub bucket: String,

    /// Bearer token used for uploads
    #[serde(default)]
    pub access_token: Option<String>,

    /// Prefix prepended to every object name (default: "videos/")
    #[serde(default = "default_object_prefix")]
    pub object_prefix: String,

    /// Request timeout for a single upload (default: 10 minutes)
    #[serde(default = "default_upload_timeout", with = "duration_serde")]
    pub upload_timeout: Duration,
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Delivery size thresholds
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Job supervision settings
    #[serde(default)]
    pub job: JobConfig,

    /// External tools and extraction options
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Offload storage (None = offload unavailable, large files fail to upload)
    #[serde(default)]
    pub storage: Option<StorageConfig>,

    /// Verbose extraction tool output
    #[serde(default)]
    pub debug: bool,
}

impl Config {
    /// Build a configuration from defaults overlaid with environment variables.
    ///
    /// Recognized variables:
    /// - `MAX_FILE_SIZE` - absolute ceiling in MiB
    /// - `DEBUG_MODE` - `true` enables verbose tool output
    /// - `COOKIE_FILE` - cookie file path (default: `.secrets/cookies.txt` if it exists)
    /// - `JOB_TIMEOUT_SECS` - overall job timeout
    /// - `VIDEODL_TEMP_DIR` - parent of job working directories
    /// - `STORAGE_BUCKET`, `STORAGE_ACCESS_TOKEN`, `STORAGE_ENDPOINT` - offload storage
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(mb) = env_var("MAX_FILE_SIZE") {
            let mb: u64 = mb.parse().map_err(|_| Error::Config {
                message: format!("MAX_FILE_SIZE must be a whole number of MiB, got '{mb}'"),
                key: Some("MAX_FILE_SIZE".to_string()),
            })?;
            let ceiling = mb.checked_mul(BYTES_MB).ok_or_else(|| Error::Config {
                message: format!("MAX_FILE_SIZE of {mb} MiB does not fit in a byte count"),
                key: Some("MAX_FILE_SIZE".to_string()),
            })?;
            config.limits.max_file_size_bytes = ceiling;
            // a ceiling below the inline limit sends everything that fits inline
            config.limits.inline_limit_bytes = config.limits.inline_limit_bytes.min(ceiling);
        }

        config.debug = env_var("DEBUG_MODE").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        config.tools.cookie_file = match env_var("COOKIE_FILE") {
            Some(path) => Some(PathBuf::from(path)),
            None => {
                let default = PathBuf::from(DEFAULT_COOKIE_FILE);
                default.exists().then_some(default)
            }
        };

        if let Some(secs) = env_var("JOB_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| Error::Config {
                message: format!("JOB_TIMEOUT_SECS must be a number of seconds, got '{secs}'"),
                key: Some("JOB_TIMEOUT_SECS".to_string()),
            })?;
            config.job.timeout = Duration::from_secs(secs);
        }

        if let Some(dir) = env_var("VIDEODL_TEMP_DIR") {
            config.job.temp_dir = PathBuf::from(dir);
        }

        if let Some(bucket) = env_var("STORAGE_BUCKET") {
            config.storage = Some(StorageConfig {
                endpoint: env_var("STORAGE_ENDPOINT").unwrap_or_else(default_storage_endpoint),
                bucket,
                access_token: env_var("STORAGE_ACCESS_TOKEN"),
                object_prefix: default_object_prefix(),
                upload_timeout: default_upload_timeout(),
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_file_size_bytes == 0 {
            return Err(config_error(
                "max file size must be greater than zero",
                "limits.max_file_size_bytes",
            ));
        }
        if self.limits.inline_limit_bytes > self.limits.max_file_size_bytes {
            return Err(config_error(
                "inline limit cannot exceed the max file size",
                "limits.inline_limit_bytes",
            ));
        }
        if self.job.poll_interval.is_zero() {
            return Err(config_error(
                "poll interval must be greater than zero",
                "job.poll_interval",
            ));
        }
        if self.job.report_interval.is_zero() {
            return Err(config_error(
                "report interval must be greater than zero",
                "job.report_interval",
            ));
        }
        if self.job.timeout.is_zero() {
            return Err(config_error(
                "job timeout must be greater than zero",
                "job.timeout",
            ));
        }
        if self.tools.format.trim().is_empty() {
            return Err(config_error("format selection is empty", "tools.format"));
        }
        if let Some(storage) = &self.storage
            && storage.bucket.trim().is_empty()
        {
            return Err(config_error("storage bucket is empty", "storage.bucket"));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_inline_limit() -> u64 {
    50 * BYTES_MB
}

fn default_max_file_size() -> u64 {
    500 * BYTES_MB
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("videodl")
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_report_interval() -> Duration {
    Duration::from_millis(1500)
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_true() -> bool {
    true
}

fn default_format() -> String {
    DEFAULT_FORMAT_SELECTION.to_string()
}

fn default_merge_format() -> String {
    "mp4".to_string()
}

fn default_retries() -> u32 {
    10
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_convert_extractors() -> Vec<String> {
    vec!["youtube".to_string()]
}

fn default_storage_endpoint() -> String {
    "https://firebasestorage.googleapis.com".to_string()
}

fn default_object_prefix() -> String {
    "videos/".to_string()
}

fn default_upload_timeout() -> Duration {
    Duration::from_secs(600)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper for sub-second intervals
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: &[&str] = &[
        "MAX_FILE_SIZE",
        "DEBUG_MODE",
        "COOKIE_FILE",
        "JOB_TIMEOUT_SECS",
        "VIDEODL_TEMP_DIR",
        "STORAGE_BUCKET",
        "STORAGE_ACCESS_TOKEN",
        "STORAGE_ENDPOINT",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            // SAFETY: tests touching the environment are #[serial]
            unsafe { std::env::remove_var(key) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: tests touching the environment are #[serial]
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    fn defaults_match_chat_limits() {
        let config = Config::default();
        assert_eq!(config.limits.inline_limit_bytes, 50 * BYTES_MB);
        assert_eq!(config.limits.max_file_size_bytes, 500 * BYTES_MB);
        assert_eq!(config.job.poll_interval, Duration::from_millis(500));
        assert_eq!(config.job.report_interval, Duration::from_millis(1500));
        assert_eq!(config.tools.format, DEFAULT_FORMAT_SELECTION);
        assert_eq!(config.tools.merge_output_format, "mp4");
        assert!(config.tools.force_ipv6);
        assert!(config.storage.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.limits, LimitsConfig::default());
        assert_eq!(config.job.timeout, Duration::from_secs(1800));
        assert_eq!(config.tools.retries, 10);
    }

    #[test]
    fn durations_serialize_in_their_declared_units() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["job"]["poll_interval"], 500);
        assert_eq!(json["job"]["report_interval"], 1500);
        assert_eq!(json["job"]["timeout"], 1800);
        assert_eq!(json["tools"]["socket_timeout"], 30);

        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back.job.report_interval, config.job.report_interval);
    }

    #[test]
    fn validate_rejects_inline_limit_above_ceiling() {
        let mut config = Config::default();
        config.limits.inline_limit_bytes = config.limits.max_file_size_bytes + 1;
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("limits.inline_limit_bytes"))
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_inline_limit_equal_to_ceiling() {
        let mut config = Config::default();
        config.limits.inline_limit_bytes = config.limits.max_file_size_bytes;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_intervals_and_empty_bucket() {
        let mut config = Config::default();
        config.job.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.job.timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.job.report_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage = Some(StorageConfig {
            endpoint: default_storage_endpoint(),
            bucket: " ".into(),
            access_token: None,
            object_prefix: default_object_prefix(),
            upload_timeout: default_upload_timeout(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear_env();
        set_env("MAX_FILE_SIZE", "1024");
        set_env("DEBUG_MODE", "TRUE");
        set_env("COOKIE_FILE", "/run/secrets/cookies.txt");
        set_env("JOB_TIMEOUT_SECS", "120");
        set_env("STORAGE_BUCKET", "my-bucket.appspot.com");
        set_env("STORAGE_ACCESS_TOKEN", "token");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.limits.max_file_size_bytes, 1024 * BYTES_MB);
        assert!(config.debug);
        assert_eq!(
            config.tools.cookie_file,
            Some(PathBuf::from("/run/secrets/cookies.txt"))
        );
        assert_eq!(config.job.timeout, Duration::from_secs(120));
        let storage = config.storage.unwrap();
        assert_eq!(storage.bucket, "my-bucket.appspot.com");
        assert_eq!(storage.access_token.as_deref(), Some("token"));
        assert_eq!(storage.object_prefix, "videos/");
    }

    #[test]
    #[serial]
    fn from_env_rejects_non_numeric_size() {
        clear_env();
        set_env("MAX_FILE_SIZE", "lots");
        let err = Config::from_env().unwrap_err();
        clear_env();

        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("MAX_FILE_SIZE")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn from_env_rejects_overflowing_size() {
        clear_env();
        set_env("MAX_FILE_SIZE", &u64::MAX.to_string());
        let err = Config::from_env().unwrap_err();
        clear_env();

        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("MAX_FILE_SIZE")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn from_env_small_ceiling_lowers_inline_limit() {
        clear_env();
        set_env("MAX_FILE_SIZE", "20");
        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.limits.max_file_size_bytes, 20 * BYTES_MB);
        assert_eq!(config.limits.inline_limit_bytes, 20 * BYTES_MB);
    }

    #[test]
    #[serial]
    fn from_env_without_variables_uses_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert!(!config.debug);
        assert_eq!(config.limits.max_file_size_bytes, 500 * BYTES_MB);
        assert!(config.storage.is_none());
    }
}
