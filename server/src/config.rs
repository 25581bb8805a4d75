// storefront_server/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use dotenvy::dotenv;
use std::env;
use storefront::{CheckoutSettings, Money};

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub app_base_url: String,

  /// JSON document tree loaded into the in-memory store at startup.
  pub seed_file: Option<String>,
  /// Run the slug-to-uid migration over every user profile before serving.
  pub run_migration: bool,

  /// Lowercased emails allowed on the admin routes.
  pub admin_emails: Vec<String>,
  pub min_password_length: usize,

  pub checkout: CheckoutSettings,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    let seed_file = get_env("SEED_FILE").ok().filter(|path| !path.trim().is_empty());
    let run_migration = get_env("RUN_MIGRATION")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid RUN_MIGRATION value: {}", e)))?;

    let admin_emails = parse_admin_emails(&get_env("ADMIN_EMAILS").unwrap_or_default());
    let min_password_length = get_env("MIN_PASSWORD_LENGTH")
      .unwrap_or_else(|_| "6".to_string())
      .parse::<usize>()
      .map_err(|e| AppError::Config(format!("Invalid MIN_PASSWORD_LENGTH: {}", e)))?;

    let checkout = CheckoutSettings {
      delivery_fee: parse_fee("DELIVERY_FEE", get_env("DELIVERY_FEE").ok())?,
      pickup_fee: parse_fee("PICKUP_FEE", get_env("PICKUP_FEE").ok())?,
    };

    tracing::info!(
      admins = admin_emails.len(),
      seeded = seed_file.is_some(),
      run_migration,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      app_base_url,
      seed_file,
      run_migration,
      admin_emails,
      min_password_length,
      checkout,
    })
  }

  pub fn is_admin_email(&self, email: Option<&str>) -> bool {
    email
      .map(|e| e.trim().to_lowercase())
      .is_some_and(|e| self.admin_emails.iter().any(|admin| *admin == e))
  }
}

fn parse_admin_emails(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(|e| e.trim().to_lowercase())
    .filter(|e| !e.is_empty())
    .collect()
}

fn parse_fee(var_name: &str, raw: Option<String>) -> Result<Money> {
  match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
    None => Ok(Money::default()),
    Some(value) => {
      let amount = value
        .parse::<f64>()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))?;
      if amount < 0.0 {
        return Err(AppError::Config(format!("{} cannot be negative", var_name)));
      }
      Ok(Money::from_major(amount))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn admin_emails_are_trimmed_and_lowercased() {
    assert_eq!(
      parse_admin_emails(" Owner@Shop.ph, ,staff@shop.ph "),
      vec!["owner@shop.ph".to_string(), "staff@shop.ph".to_string()]
    );
  }

  #[test]
  fn fees_parse_as_major_units() {
    assert_eq!(parse_fee("FEE", Some("49.5".into())).unwrap().cents(), 4_950);
    assert_eq!(parse_fee("FEE", None).unwrap(), Money::default());
    assert!(parse_fee("FEE", Some("-1".into())).is_err());
    assert!(parse_fee("FEE", Some("free".into())).is_err());
  }
}
