/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, APP_ENV, CORS 許可など)
 * - 設定値のバリデーション (不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::AppError;
use crate::matcher::AllowListEntry;
use crate::policy::{Environment, SmartCorsOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Self {
        // Same switch as the rest of the service: `prod` is an alias, case is ignored.
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for AppError {
    fn from(_: ConfigError) -> Self {
        AppError::Internal
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub environment: Environment,

    pub cors_allow_credentials: bool,
    pub cors_debug: bool,
    // Extra regex entry on top of ALLOWED_ORIGINS
    pub cors_origin_pattern: Option<AllowListEntry>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match lookup("PORT") {
            Some(s) => s.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let environment = Environment::from_vars(&lookup);

        let cors_allow_credentials = flag(&lookup, "CORS_ALLOW_CREDENTIALS")?;
        let cors_debug = flag(&lookup, "CORS_DEBUG")?;

        let cors_origin_pattern = match lookup("CORS_ORIGIN_PATTERN") {
            Some(s) if !s.trim().is_empty() => Some(
                AllowListEntry::pattern(s.trim())
                    .map_err(|_| ConfigError::Invalid("CORS_ORIGIN_PATTERN"))?,
            ),
            _ => None,
        };

        Ok(Self {
            addr,
            environment,
            cors_allow_credentials,
            cors_debug,
            cors_origin_pattern,
        })
    }

    pub fn cors_options(&self) -> SmartCorsOptions {
        SmartCorsOptions {
            allowed_origins: self.cors_origin_pattern.iter().cloned().collect(),
            allow_credentials: self.cors_allow_credentials,
            debug: self.cors_debug,
        }
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        Some(v) => parse_flag(&v).ok_or(ConfigError::Invalid(key)),
        None => Ok(false),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
