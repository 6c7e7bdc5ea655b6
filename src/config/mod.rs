use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of tokens issued at login.
    pub login_token_hours: i64,
    /// Lifetime of tokens issued at registration.
    pub register_token_hours: i64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BillingConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub tick_seconds: u64,
    /// Sliding lookback for "recently inserted" queries. Must exceed the
    /// tick period or inserts can fall between two ticks.
    pub lookback_seconds: i64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 3,
            lookback_seconds: 5,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("auth.login_token_hours", 8)?
            .set_default("auth.register_token_hours", 24)?
            .set_default("billing.enabled", false)?
            .set_default("notifier.tick_seconds", 3)?
            .set_default("notifier.lookback_seconds", 5)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with FERROFIT__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("FERROFIT").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;

        if settings.notifier.lookback_seconds <= settings.notifier.tick_seconds as i64 {
            return Err(ConfigError::Message(
                "notifier.lookback_seconds must be greater than notifier.tick_seconds".into(),
            ));
        }

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite://ferrofit.db".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                login_token_hours: 8,
                register_token_hours: 24,
            },
            smtp: SmtpConfig::default(),
            billing: BillingConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}
