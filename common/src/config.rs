use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Upper bound on `hue_bins * saturation_bins`.
pub const MAX_HISTOGRAM_BINS: usize = 1 << 16;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Snapshot endpoint returning one encoded image per GET.
    pub url: String,
    /// Delay before retrying after the camera yields no frame.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_hue_bins")]
    pub hue_bins: usize,
    #[serde(default = "default_saturation_bins")]
    pub saturation_bins: usize,
    /// Number of recent scores averaged before the threshold check.
    #[serde(default = "default_window")]
    pub window: usize,
    /// An alert fires when the smoothed similarity drops strictly below this.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_dir")]
    pub dir: String,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub to: String,
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_sendmail_path")]
    pub sendmail_path: String,
    /// Upper bound on one sendmail invocation; the child is killed past it.
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_upload_prefix")]
    pub prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Upper bound on one S3 operation, retries included.
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            hue_bins: default_hue_bins(),
            saturation_bins: default_saturation_bins(),
            window: default_window(),
            threshold: default_threshold(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: default_archive_dir(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            to: String::new(),
            from: default_from(),
            subject: default_subject(),
            body: default_body(),
            sendmail_path: default_sendmail_path(),
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: default_bucket(),
            prefix: default_upload_prefix(),
            region: default_region(),
            timeout_secs: default_upload_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.url.trim().is_empty() {
            return Err(ConfigError::Invalid("capture.url must not be empty".into()));
        }
        if self.capture.backoff_secs == 0 {
            return Err(ConfigError::Invalid("capture.backoff_secs must be at least 1".into()));
        }
        let d = &self.detection;
        if d.interval_secs == 0 {
            return Err(ConfigError::Invalid("detection.interval_secs must be at least 1".into()));
        }
        if d.window == 0 {
            return Err(ConfigError::Invalid("detection.window must be at least 1".into()));
        }
        if d.hue_bins == 0 || d.saturation_bins == 0 {
            return Err(ConfigError::Invalid(
                "detection.hue_bins and detection.saturation_bins must be at least 1".into(),
            ));
        }
        match d.hue_bins.checked_mul(d.saturation_bins) {
            Some(total) if total <= MAX_HISTOGRAM_BINS => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "detection.hue_bins * detection.saturation_bins must not exceed {MAX_HISTOGRAM_BINS}"
                )))
            }
        }
        if !d.threshold.is_finite() {
            return Err(ConfigError::Invalid("detection.threshold must be finite".into()));
        }
        if !(1..=100).contains(&self.archive.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "archive.jpeg_quality must be within 1..=100, got {}",
                self.archive.jpeg_quality
            )));
        }
        if self.notify.enabled && (self.notify.to.is_empty() || self.notify.from.is_empty()) {
            return Err(ConfigError::Invalid(
                "notify.to and notify.from are required when notify is enabled".into(),
            ));
        }
        if self.notify.enabled && self.notify.timeout_secs == 0 {
            return Err(ConfigError::Invalid("notify.timeout_secs must be at least 1".into()));
        }
        let u = &self.upload;
        if u.enabled && u.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upload.timeout_secs must be at least 1".into()));
        }
        if u.enabled && (u.endpoint.is_empty() || u.access_key.is_empty() || u.secret_key.is_empty())
        {
            return Err(ConfigError::Invalid(
                "upload.endpoint, upload.access_key and upload.secret_key are required when upload is enabled"
                    .into(),
            ));
        }
        Ok(())
    }
}

impl CaptureConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl UploadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DetectionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_backoff_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_hue_bins() -> usize {
    50
}
fn default_saturation_bins() -> usize {
    60
}
fn default_window() -> usize {
    3
}
fn default_threshold() -> f64 {
    0.7
}
fn default_interval_secs() -> u64 {
    1
}
fn default_archive_dir() -> String {
    "snapshots".into()
}
fn default_jpeg_quality() -> u8 {
    90
}
fn default_true() -> bool {
    true
}
fn default_from() -> String {
    "camera@pi".into()
}
fn default_subject() -> String {
    "Camera notification".into()
}
fn default_body() -> String {
    "The camera have detected something strange.\n".into()
}
fn default_sendmail_path() -> String {
    "/usr/sbin/sendmail".into()
}
fn default_notify_timeout_secs() -> u64 {
    30
}
fn default_upload_timeout_secs() -> u64 {
    60
}
fn default_bucket() -> String {
    "motion-snapshots".into()
}
fn default_upload_prefix() -> String {
    "alerts/".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [capture]
        url = "http://camera.local/frame"

        [notify]
        enabled = false

        [upload]
        enabled = false
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.capture.backoff(), Duration::from_secs(10));
        assert_eq!(config.detection.hue_bins, 50);
        assert_eq!(config.detection.saturation_bins, 60);
        assert_eq!(config.detection.window, 3);
        assert!((config.detection.threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.detection.interval(), Duration::from_secs(1));
        assert_eq!(config.archive.jpeg_quality, 90);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_window_rejected() {
        let toml = format!("{MINIMAL}\n[detection]\nwindow = 0\n");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_histogram_rejected() {
        let toml = format!(
            "{MINIMAL}\n[detection]\nhue_bins = 4294967296\nsaturation_bins = 4294967296\n"
        );
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("saturation_bins"), "{err}");

        let toml = format!("{MINIMAL}\n[detection]\nhue_bins = 512\nsaturation_bins = 512\n");
        assert!(matches!(Config::from_toml(&toml), Err(ConfigError::Invalid(_))));

        let toml = format!("{MINIMAL}\n[detection]\nhue_bins = 256\nsaturation_bins = 256\n");
        assert!(Config::from_toml(&toml).is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let toml = format!("{MINIMAL}\n[detection]\ninterval_secs = 0\n");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("interval_secs"), "{err}");
    }

    #[test]
    fn zero_backoff_rejected() {
        let toml = r#"
            [capture]
            url = "http://camera.local/frame"
            backoff_secs = 0

            [notify]
            enabled = false

            [upload]
            enabled = false
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("backoff_secs"), "{err}");
    }

    #[test]
    fn collaborator_timeouts_default_and_validate() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.notify.timeout(), Duration::from_secs(30));
        assert_eq!(config.upload.timeout(), Duration::from_secs(60));

        let toml = r#"
            [capture]
            url = "http://camera.local/frame"

            [notify]
            to = "owner@example.com"
            timeout_secs = 0

            [upload]
            enabled = false
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("notify.timeout_secs"), "{err}");
    }

    #[test]
    fn enabled_notify_requires_recipient() {
        let toml = r#"
            [capture]
            url = "http://camera.local/frame"

            [upload]
            enabled = false
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("notify.to"));
    }

    #[test]
    fn enabled_upload_requires_credentials() {
        let toml = r#"
            [capture]
            url = "http://camera.local/frame"

            [notify]
            to = "owner@example.com"

            [upload]
            endpoint = "http://localhost:9000"
            access_key = "key"
        "#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("upload.secret_key"));
    }

    #[test]
    fn missing_capture_section_is_parse_error() {
        let err = Config::from_toml("[detection]\nwindow = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.capture.url, "http://camera.local/frame");
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/motion-watch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile(..)));
    }
}
