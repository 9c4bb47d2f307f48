use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

// Где хранятся документы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

// Настройки хранилища документов
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database: Option<DatabaseConfig>,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

/// A configured account that may authenticate with HTTP Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub capabilities: Vec<String>,
}

// Настройки авторизации
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    pub accounts: Vec<Account>,
}

impl AuthConfig {
    /// Parses `name:bcrypt_hash:cap1|cap2;name2:hash2:cap` into accounts.
    ///
    /// Bcrypt hashes never contain `:` or `;`, so both are safe separators.
    pub fn parse_accounts(raw: &str) -> Result<Self, ConfigError> {
        let mut accounts = Vec::new();

        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            let username = parts.next().unwrap_or_default().trim();
            let password_hash = parts.next().unwrap_or_default().trim();
            let capabilities = parts.next().unwrap_or_default();

            if username.is_empty() || password_hash.is_empty() {
                return Err(ConfigError::Invalid {
                    key: "AUTH_USERS",
                    value: username.to_string(),
                });
            }

            accounts.push(Account {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                capabilities: capabilities
                    .split('|')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect(),
            });
        }

        Ok(AuthConfig { accounts })
    }

    pub fn find(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }
}

fn var_or(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = var_or(key, default);
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: StoreBackend = parse_var("STORE_BACKEND", "postgres")?;

        // DATABASE_URL обязателен только для postgres
        let database = match backend {
            StoreBackend::Postgres => Some(DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
                pool_size: parse_var("DB_POOL_SIZE", "10")?,
            }),
            StoreBackend::Memory => None,
        };

        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0"),
                port: parse_var("PORT", "8000")?,
                environment: var_or("ENVIRONMENT", "development"),
                rust_log: var_or("RUST_LOG", "event_api=debug,tower_http=debug"),
                log_format: parse_var("LOG_FORMAT", "pretty")?,
            },
            store: StoreConfig { backend, database },
            auth: AuthConfig::parse_accounts(&var_or("AUTH_USERS", ""))?,
        })
    }
}
