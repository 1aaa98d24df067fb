use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub task_poll_interval_ms: u64,
    pub sse_keepalive_secs: u64,
    pub conference_api_url: Option<String>,
    pub conference_api_key: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_from: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: env::var("DATABASE_URL").ok(),
            jwt_secret: get_env("JWT_SECRET")?,
            task_poll_interval_ms: get_env_parse_or("TASK_POLL_INTERVAL_MS", 1000)?,
            sse_keepalive_secs: get_env_parse_or("SSE_KEEPALIVE_SECS", 15)?,
            conference_api_url: env::var("CONFERENCE_API_URL").ok(),
            conference_api_key: env::var("CONFERENCE_API_KEY").ok(),
            mail_api_url: env::var("MAIL_API_URL").ok(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@assessment.local".to_string()),
        })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            jwt_secret: self.jwt_secret.clone(),
            poll_interval: Duration::from_millis(self.task_poll_interval_ms.max(1)),
            keepalive: Duration::from_secs(self.sse_keepalive_secs.max(1)),
            mail_from: self.mail_from.clone(),
        }
    }
}

/// Runtime knobs handed to `AppState`; kept apart from `Config` so tests can
/// build a state without touching the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub jwt_secret: String,
    pub poll_interval: Duration,
    pub keepalive: Duration,
    pub mail_from: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jwt_secret: "dev_secret".to_string(),
            poll_interval: Duration::from_secs(1),
            keepalive: Duration::from_secs(15),
            mail_from: "no-reply@assessment.local".to_string(),
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
