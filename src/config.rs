use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub grading_base_url: String,
    pub grading_anon_key: String,
    pub agent_secret: String,
    pub paysky_merchant_id: String,
    pub paysky_terminal_id: String,
    pub paysky_secret_key: String,
    pub storage_path: String,
    pub sync_interval_secs: u64,
    pub sync_max_attempts: u32,
    pub sync_backoff_base_secs: u64,
    pub sync_backoff_cap_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            grading_base_url: get_env("GRADING_BASE_URL")?,
            grading_anon_key: get_env("GRADING_ANON_KEY")?,
            agent_secret: get_env("AGENT_SECRET")?,
            paysky_merchant_id: get_env("PAYSKY_MERCHANT_ID")?,
            paysky_terminal_id: get_env("PAYSKY_TERMINAL_ID")?,
            paysky_secret_key: get_env("PAYSKY_SECRET_KEY")?,
            storage_path: get_env("STORAGE_PATH")?,
            sync_interval_secs: get_env_parse_or("SYNC_INTERVAL_SECS", 60)?,
            sync_max_attempts: get_env_parse_or("SYNC_MAX_ATTEMPTS", 8)?,
            sync_backoff_base_secs: get_env_parse_or("SYNC_BACKOFF_BASE_SECS", 30)?,
            sync_backoff_cap_secs: get_env_parse_or("SYNC_BACKOFF_CAP_SECS", 3600)?,
        })
    }

    /// Grading edge function endpoint, as exposed by the backend.
    pub fn grading_endpoint(&self) -> String {
        format!(
            "{}/functions/v1/grade-exam",
            self.grading_base_url.trim_end_matches('/')
        )
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

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
