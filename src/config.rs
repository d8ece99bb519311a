use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::services::otp::DeliveryPolicy;

pub const DEFAULT_OTP_SENDER: &str = "Ministry of Banking <onboarding@resend.dev>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid port number, got '{value}'")]
    InvalidPort { name: &'static str, value: String },

    #[error("{name} must be true or false, got '{value}'")]
    InvalidFlag { name: &'static str, value: String },

    #[error("OTP_DELIVERY_REQUIRED is set but RESEND_API_KEY is not")]
    DeliveryUnavailable,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub resend_api_key: Option<String>,
    pub otp_email_from: String,
    pub delivery_policy: DeliveryPolicy,
    /// Full card numbers and OTP echo in responses
    pub demo_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            data_dir: PathBuf::from("data"),
            resend_api_key: None,
            otp_email_from: DEFAULT_OTP_SENDER.to_string(),
            delivery_policy: DeliveryPolicy::BestEffort,
            demo_mode: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { name: "PORT", value })?,
            None => defaults.port,
        };

        let delivery_policy = if parse_flag("OTP_DELIVERY_REQUIRED", var("OTP_DELIVERY_REQUIRED"))? {
            DeliveryPolicy::Required
        } else {
            DeliveryPolicy::BestEffort
        };

        let resend_api_key = var("RESEND_API_KEY");
        if delivery_policy == DeliveryPolicy::Required && resend_api_key.is_none() {
            return Err(ConfigError::DeliveryUnavailable);
        }

        Ok(Self {
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port,
            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            resend_api_key,
            otp_email_from: var("OTP_EMAIL_FROM").unwrap_or(defaults.otp_email_from),
            delivery_policy,
            demo_mode: parse_flag("DEMO_MODE", var("DEMO_MODE"))?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value }),
    }
}
