use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::notify::twilio::{TwilioCredentials, DEFAULT_TWILIO_API_BASE};

const RESIDENTS_FILE_NAME: &str = "residents.csv";
const PACKAGES_FILE_NAME: &str = "packages.csv";
const DEFAULT_BUILDING_NAME: &str = "Village Liberdade";

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

/// Top-level configuration for the parcel desk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
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

        let data_dir = env::var("PARCEL_DATA_DIR").unwrap_or_else(|_| ".".to_string());
        let mut storage = StorageConfig::in_dir(&data_dir);
        if let Some(path) = non_empty_var("PARCEL_RESIDENTS_FILE") {
            storage.residents_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_var("PARCEL_PACKAGES_FILE") {
            storage.packages_path = PathBuf::from(path);
        }

        let building_name = non_empty_var("PARCEL_BUILDING_NAME")
            .unwrap_or_else(|| DEFAULT_BUILDING_NAME.to_string());
        let twilio_api_base = non_empty_var("TWILIO_API_BASE")
            .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string());
        let twilio = twilio_credentials(
            non_empty_var("TWILIO_ACCOUNT_SID"),
            non_empty_var("TWILIO_AUTH_TOKEN"),
            non_empty_var("TWILIO_PHONE_NUMBER"),
        )?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            notifications: NotificationConfig {
                building_name,
                twilio,
                twilio_api_base,
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn twilio_credentials(
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
) -> Result<Option<TwilioCredentials>, ConfigError> {
    match (account_sid, auth_token, from_number) {
        (None, None, None) => Ok(None),
        (Some(account_sid), Some(auth_token), Some(from_number)) => Ok(Some(TwilioCredentials {
            account_sid,
            auth_token,
            from_number,
        })),
        (sid, token, _) => {
            let missing = if sid.is_none() {
                "TWILIO_ACCOUNT_SID"
            } else if token.is_none() {
                "TWILIO_AUTH_TOKEN"
            } else {
                "TWILIO_PHONE_NUMBER"
            };
            Err(ConfigError::IncompleteSmsCredentials { missing })
        }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the resident and package record files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub residents_path: PathBuf,
    pub packages_path: PathBuf,
}

impl StorageConfig {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            residents_path: dir.join(RESIDENTS_FILE_NAME),
            packages_path: dir.join(PACKAGES_FILE_NAME),
        }
    }
}

/// SMS provider selection and message wording.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub building_name: String,
    /// `None` selects the dry-run gateway.
    pub twilio: Option<TwilioCredentials>,
    pub twilio_api_base: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    IncompleteSmsCredentials { missing: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::IncompleteSmsCredentials { missing } => write!(
                f,
                "{missing} is required when any TWILIO_* credential is set"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::IncompleteSmsCredentials { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const KEYS: [&str; 12] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "PARCEL_DATA_DIR",
        "PARCEL_RESIDENTS_FILE",
        "PARCEL_PACKAGES_FILE",
        "PARCEL_BUILDING_NAME",
        "TWILIO_ACCOUNT_SID",
        "TWILIO_AUTH_TOKEN",
        "TWILIO_PHONE_NUMBER",
        "TWILIO_API_BASE",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.storage, StorageConfig::in_dir("."));
        assert_eq!(config.notifications.building_name, "Village Liberdade");
        assert!(config.notifications.twilio.is_none());
        assert_eq!(config.notifications.twilio_api_base, DEFAULT_TWILIO_API_BASE);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn data_dir_and_explicit_files_set_storage_paths() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PARCEL_DATA_DIR", "/var/lib/parcels");
        env::set_var("PARCEL_PACKAGES_FILE", "/srv/ledger.csv");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.storage.residents_path,
            PathBuf::from("/var/lib/parcels/residents.csv")
        );
        assert_eq!(config.storage.packages_path, PathBuf::from("/srv/ledger.csv"));
    }

    #[test]
    fn complete_twilio_credentials_enable_provider() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TWILIO_ACCOUNT_SID", "AC123");
        env::set_var("TWILIO_AUTH_TOKEN", "token");
        env::set_var("TWILIO_PHONE_NUMBER", "+15005550006");
        let config = AppConfig::load().expect("config loads");
        let twilio = config.notifications.twilio.expect("credentials present");
        assert_eq!(twilio.account_sid, "AC123");
        assert_eq!(twilio.from_number, "+15005550006");
    }

    #[test]
    fn partial_twilio_credentials_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TWILIO_ACCOUNT_SID", "AC123");
        env::set_var("TWILIO_PHONE_NUMBER", "+15005550006");
        match AppConfig::load() {
            Err(ConfigError::IncompleteSmsCredentials { missing }) => {
                assert_eq!(missing, "TWILIO_AUTH_TOKEN")
            }
            other => panic!("expected incomplete credentials, got {other:?}"),
        }
    }

    #[test]
    fn invalid_port_is_reported() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PORT", "not-a-port");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidPort)));
    }
}
