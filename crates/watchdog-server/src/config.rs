//! Configuration loading and validation for the stream watchdog

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};
use watchdog::WatchdogSettings;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "STREAM_WATCHDOG_CONFIG";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watchdog: LoopSettings,

    #[serde(default)]
    pub icecast: IcecastSettings,

    #[serde(default)]
    pub encoder: EncoderSettings,

    #[serde(default)]
    pub segments: SegmentSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default)]
    pub check_log: CheckLogSettings,

    #[serde(default)]
    pub remediation: RemediationSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.watchdog.validate()?;
        self.icecast.validate()?;
        self.encoder.validate()?;
        self.segments.validate()?;
        self.notifications.validate()?;
        self.remediation.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

/// Driver loop timing and escalation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoopSettings {
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_at_least_one_second")]
    pub cycle_interval: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_at_least_one_second")]
    pub probe_timeout: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_at_least_one_second")]
    pub report_interval: Duration,

    #[validate(range(min = 1, max = 64))]
    pub escalation_threshold: usize,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_at_least_one_second")]
    pub cooldown: Duration,
}

/// Streaming server source-presence probe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IcecastSettings {
    #[validate(custom = "validate_http_url")]
    pub url: String,

    pub username: String,

    pub password: String,

    #[validate(range(min = 1))]
    pub threshold: u32,
}

/// Encoder CPU probe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EncoderSettings {
    #[validate(length(min = 1))]
    pub process_name: String,

    /// CPU floor in percent
    #[validate(range(min = 0.0, max = 100.0))]
    pub cpu_threshold: f64,

    #[validate(range(min = 1))]
    pub threshold: u32,
}

/// Segment backlog and staleness probes
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SegmentSettings {
    pub directory: PathBuf,

    #[validate(length(min = 1))]
    pub extension: String,

    pub max_files: usize,

    #[validate(range(min = 1))]
    pub count_threshold: u32,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_at_least_one_second")]
    pub stale_age: Duration,

    #[validate(range(min = 1))]
    pub stale_threshold: u32,

    /// File names the staleness probe ignores
    pub exclude: Vec<String>,
}

/// Webhook notifications
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,

    #[validate(custom = "validate_http_url")]
    pub webhook_url: Option<String>,

    #[validate(length(min = 1))]
    pub username: String,
}

/// Durable check history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckLogSettings {
    pub enabled: bool,
    pub path: PathBuf,
}

/// Backup instance start
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RemediationSettings {
    pub instance_id: Option<String>,
    pub aws_cli: String,
    pub region: Option<String>,

    /// Upper bound for one CLI invocation
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_at_least_one_second")]
    pub timeout: Duration,
}

/// Prometheus endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,

    #[validate(length(min = 1))]
    pub listen_addr: String,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

impl Default for LoopSettings {
    fn default() -> Self {
        let settings = WatchdogSettings::default();
        Self {
            cycle_interval: settings.cycle_interval,
            probe_timeout: settings.probe_timeout,
            report_interval: settings.report_interval,
            escalation_threshold: settings.escalation_threshold,
            cooldown: settings.cooldown,
        }
    }
}

impl Default for IcecastSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            threshold: 1,
        }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            process_name: "liquidsoap".to_string(),
            cpu_threshold: 20.0,
            threshold: 3,
        }
    }
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/var/www/hls"),
            extension: "ts".to_string(),
            max_files: 10,
            count_threshold: 1,
            stale_age: Duration::from_secs(900),
            stale_threshold: 1,
            exclude: Vec::new(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            username: "Monitoring Bot".to_string(),
        }
    }
}

impl Default for CheckLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./watchdog-checks.jsonl"),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9464".to_string(),
        }
    }
}

impl Default for RemediationSettings {
    fn default() -> Self {
        Self {
            instance_id: None,
            aws_cli: "aws".to_string(),
            region: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl RemediationSettings {
    /// CLI binary, defaulting to `aws` on the PATH
    pub fn aws_cli(&self) -> &str {
        if self.aws_cli.is_empty() {
            "aws"
        } else {
            &self.aws_cli
        }
    }
}

// Custom validators

fn validate_at_least_one_second(value: &Duration) -> Result<(), ValidationError> {
    if *value < Duration::from_secs(1) {
        return Err(ValidationError::new("duration_below_one_second"));
    }
    Ok(())
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ValidationError::new("url_invalid_scheme"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from `$STREAM_WATCHDOG_CONFIG` or the default search paths
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path));
            }
            tracing::info!("Loading configuration from: {}", path.display());
            return Self::load_from_file(&path);
        }

        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/stream-watchdog/watchdog.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./watchdog.yaml"));

        paths.into_iter().find(|p: &PathBuf| p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/stream-watchdog/watchdog.yaml"))
    }

    /// Convert to the engine's settings
    pub fn to_watchdog_settings(&self) -> WatchdogSettings {
        WatchdogSettings {
            cycle_interval: self.watchdog.cycle_interval,
            probe_timeout: self.watchdog.probe_timeout,
            report_interval: self.watchdog.report_interval,
            escalation_threshold: self.watchdog.escalation_threshold,
            cooldown: self.watchdog.cooldown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_reference_deployment() {
        let settings = Config::default().to_watchdog_settings();
        assert_eq!(settings.escalation_threshold, 2);
        assert_eq!(settings.cooldown, Duration::from_secs(300));
        assert_eq!(settings.report_interval, Duration::from_secs(300));
        assert_eq!(settings.cycle_interval, Duration::from_secs(300));

        let config = Config::default();
        assert_eq!(config.icecast.threshold, 1);
        assert_eq!(config.encoder.threshold, 3);
        assert_eq!(config.segments.count_threshold, 1);
        assert_eq!(config.segments.stale_threshold, 1);
        assert_eq!(config.segments.max_files, 10);
        assert_eq!(config.segments.stale_age, Duration::from_secs(900));
    }

    #[test]
    fn test_valid_yaml_parsing() {
        let yaml = r#"
watchdog:
  cycle_interval: 5m
  probe_timeout: 20s
  report_interval: 15m
  escalation_threshold: 3
  cooldown: 10m

icecast:
  url: "http://stream.example.org:8000"
  username: admin
  password: hackme

encoder:
  process_name: liquidsoap
  cpu_threshold: 12.5
  threshold: 4

segments:
  directory: /srv/hls
  max_files: 20
  stale_age: 10m
  exclude:
    - silence.ts

notifications:
  webhook_url: "https://discord.com/api/webhooks/1/abc"

remediation:
  instance_id: i-0123456789abcdef0
  region: eu-west-1
  timeout: 90s
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.watchdog.escalation_threshold, 3);
        assert_eq!(config.watchdog.cooldown, Duration::from_secs(600));
        assert_eq!(config.icecast.url, "http://stream.example.org:8000");
        assert_eq!(config.encoder.cpu_threshold, 12.5);
        assert_eq!(config.encoder.threshold, 4);
        assert_eq!(config.segments.directory, PathBuf::from("/srv/hls"));
        assert_eq!(config.segments.stale_age, Duration::from_secs(600));
        assert_eq!(config.segments.exclude, vec!["silence.ts".to_string()]);
        // Unspecified fields inside a section keep their defaults
        assert_eq!(config.segments.extension, "ts");
        assert!(config.notifications.enabled);
        assert_eq!(
            config.remediation.instance_id.as_deref(),
            Some("i-0123456789abcdef0")
        );
        assert_eq!(config.remediation.aws_cli(), "aws");
        assert_eq!(config.remediation.timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.encoder.process_name, "liquidsoap");
        assert!(!config.metrics.enabled);
        assert_eq!(config.remediation.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let yaml = r#"
encoder:
  threshold: 0
"#;
        assert!(matches!(
            Config::from_yaml(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_escalation_threshold_out_of_range() {
        let yaml = r#"
watchdog:
  escalation_threshold: 0
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_sub_second_interval_rejected() {
        let yaml = r#"
watchdog:
  cooldown: 500ms
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_cpu_threshold_out_of_range() {
        let yaml = r#"
encoder:
  cpu_threshold: 150.0
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_http_url("http://localhost:8000").is_ok());
        assert!(validate_http_url("https://discord.com/api/webhooks/1/abc").is_ok());
        assert!(validate_http_url("localhost:8000").is_err());
        assert!(validate_http_url("").is_err());

        let yaml = r#"
notifications:
  webhook_url: "ftp://example.org/hook"
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        assert!(matches!(
            Config::from_yaml("watchdog: [unclosed"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchdog.yaml");
        std::fs::write(&path, "segments:\n  max_files: 42\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.segments.max_files, 42);
    }
}
