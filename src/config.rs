use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub customer_token_expiry_hours: i64,
    pub public_base_url: String,
    /// Provider redirects and IPN notifications are sent here.
    pub payment_callback_url: String,
    pub gateway_timeout_secs: u64,
    /// Payslip email is disabled when unset.
    pub smtp: Option<SmtpConfig>,
}

fn parse_or<T: std::str::FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{} must be a valid value", key))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port: u16 = parse_or("SERVER_PORT", "3000")?;
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
        let payment_callback_url = env::var("PAYMENT_CALLBACK_URL")
            .unwrap_or_else(|_| format!("{}/payment-callback", public_base_url));

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiry_hours: parse_or("JWT_EXPIRY_HOURS", "24")?,
            customer_token_expiry_hours: parse_or("CUSTOMER_TOKEN_EXPIRY_HOURS", "168")?,
            gateway_timeout_secs: parse_or("GATEWAY_TIMEOUT_SECS", "30")?,
            smtp: Self::smtp_from_env()?,
            server_host,
            server_port,
            public_base_url,
            payment_callback_url,
        })
    }

    fn smtp_from_env() -> Result<Option<SmtpConfig>> {
        let Ok(host) = env::var("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(SmtpConfig {
            host,
            port: parse_or("SMTP_PORT", "587")?,
            username: env::var("SMTP_USERNAME").context("SMTP_USERNAME must be set")?,
            password: env::var("SMTP_PASSWORD").context("SMTP_PASSWORD must be set")?,
            from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "ISP Backoffice".to_string()),
            from_address: env::var("EMAIL_FROM_ADDRESS")
                .context("EMAIL_FROM_ADDRESS must be set")?,
        }))
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            database_url: "postgres://localhost/isp_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            customer_token_expiry_hours: 1,
            public_base_url: "http://127.0.0.1:3000".to_string(),
            payment_callback_url: "http://127.0.0.1:3000/payment-callback".to_string(),
            gateway_timeout_secs: 5,
            smtp: None,
        }
    }
}
