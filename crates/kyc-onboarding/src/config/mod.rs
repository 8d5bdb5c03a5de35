use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::verification::capture::CaptureSettings;
use crate::workflows::verification::CorroborationConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub onboarding: OnboardingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            onboarding: OnboardingConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the verification wizard: storage roots, corroboration policy, and
/// upper bounds on calls into external engines.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    pub data_dir: PathBuf,
    pub corroboration: CorroborationConfig,
    pub ocr_timeout: Duration,
    pub capture_timeout: Duration,
    pub face_poll_interval: Duration,
    pub ocr_binary: String,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            corroboration: CorroborationConfig::default(),
            ocr_timeout: Duration::from_secs(30),
            capture_timeout: Duration::from_secs(60),
            face_poll_interval: Duration::from_millis(1000),
            ocr_binary: "tesseract".to_string(),
        }
    }
}

impl OnboardingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = env::var("KYC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let verified_threshold = match env::var("KYC_MATCH_THRESHOLD") {
            Ok(raw) => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidThreshold(raw.clone()))?;
                if !(value > 0.0 && value < 1.0) {
                    return Err(ConfigError::InvalidThreshold(raw));
                }
                value
            }
            Err(_) => defaults.corroboration.verified_threshold,
        };

        let ocr_timeout = duration_var("KYC_OCR_TIMEOUT_SECS", Duration::from_secs)?
            .unwrap_or(defaults.ocr_timeout);
        let capture_timeout = duration_var("KYC_CAPTURE_TIMEOUT_SECS", Duration::from_secs)?
            .unwrap_or(defaults.capture_timeout);
        let face_poll_interval = duration_var("KYC_FACE_POLL_MS", Duration::from_millis)?
            .unwrap_or(defaults.face_poll_interval);

        let ocr_binary = env::var("KYC_OCR_BINARY").unwrap_or(defaults.ocr_binary);

        Ok(Self {
            data_dir,
            corroboration: CorroborationConfig { verified_threshold },
            ocr_timeout,
            capture_timeout,
            face_poll_interval,
            ocr_binary,
        })
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.data_dir.join("drafts")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join("artifacts")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            authenticator_timeout: self.capture_timeout,
            face_poll_interval: self.face_poll_interval,
        }
    }
}

fn duration_var(
    name: &'static str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(Some(unit(value))),
            _ => Err(ConfigError::InvalidDuration { name, value: raw }),
        },
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThreshold(String),
    InvalidDuration { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThreshold(value) => write!(
                f,
                "KYC_MATCH_THRESHOLD must be a number strictly between 0 and 1 (found '{value}')"
            ),
            ConfigError::InvalidDuration { name, value } => {
                write!(f, "{name} must be a positive integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidThreshold(_)
            | ConfigError::InvalidDuration { .. } => None,
        }
    }
}
