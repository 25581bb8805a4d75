// storefront_server/src/services/auth_service.rs

//! Password hashing and the in-process identity provider behind `/auth`.

use crate::errors::AppError; // Application-specific error type
use argon2::{
  password_hash::{
    rand_core::OsRng, // For generating random salts
    PasswordHash,
    PasswordHasher,
    PasswordVerifier,
    SaltString,
  },
  Argon2,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use storefront::{paths, AuthError, DocumentStore, Identity, IdentityProvider, SharedStore};
use tracing::{debug, error, info, instrument};

/// Hashes a plain-text password using Argon2 with a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    error!("Password hashing failed: Password cannot be empty.");
    return Err(AppError::Validation("Password cannot be empty for hashing.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// `Ok(false)` means the password does not match; `Err` means the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip(hashed_password_str, provided_password), err(Display), fields(hash_len = hashed_password_str.len()))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

fn is_plausible_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    }
    None => false,
  }
}

struct Account {
  uid: String,
  password_hash: String,
  display_name: Option<String>,
  email: String,
}

impl Account {
  fn identity(&self) -> Identity {
    let mut identity = Identity::new(self.uid.clone()).with_email(self.email.clone());
    identity.display_name = self.display_name.clone();
    identity
  }
}

/// Email/password accounts kept in memory. Profiles are written to `users/<uid>`.
pub struct MemoryIdentityProvider {
  store: SharedStore,
  min_password_length: usize,
  accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryIdentityProvider {
  pub fn new(store: SharedStore, min_password_length: usize) -> Self {
    MemoryIdentityProvider {
      store,
      min_password_length,
      accounts: RwLock::new(HashMap::new()),
    }
  }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
  #[instrument(name = "MemoryIdentityProvider::sign_up", skip(self, password), err(Display))]
  async fn sign_up(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<Identity, AuthError> {
    let email = email.trim().to_lowercase();
    if !is_plausible_email(&email) {
      return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < self.min_password_length {
      return Err(AuthError::WeakPassword {
        min_length: self.min_password_length,
      });
    }
    if self.accounts.read().contains_key(&email) {
      return Err(AuthError::EmailAlreadyInUse);
    }

    let password_hash = hash_password(password).map_err(|e| AuthError::Other(e.to_string()))?;
    let account = Account {
      uid: uuid::Uuid::new_v4().simple().to_string(),
      password_hash,
      display_name: display_name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
      email: email.clone(),
    };
    let identity = account.identity();

    // A concurrent sign-up may have won the race while we were hashing.
    {
      let mut accounts = self.accounts.write();
      if accounts.contains_key(&email) {
        return Err(AuthError::EmailAlreadyInUse);
      }
      accounts.insert(email.clone(), account);
    }

    let profile = json!({
      "displayName": identity.user_name(),
      "email": email,
      "createdAt": chrono::Utc::now().timestamp_millis(),
    });
    if let Err(store_err) = self.store.set(&paths::user(&identity.uid), profile).await {
      error!(error = %store_err, uid = %identity.uid, "Failed to write user profile.");
      self.accounts.write().remove(&email);
      return Err(AuthError::Other(store_err.to_string()));
    }

    info!(uid = %identity.uid, "Account created.");
    Ok(identity)
  }

  #[instrument(name = "MemoryIdentityProvider::sign_in", skip(self, password), err(Display))]
  async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
    let email = email.trim().to_lowercase();
    let (password_hash, identity) = {
      let accounts = self.accounts.read();
      let account = accounts.get(&email).ok_or(AuthError::UserNotFound)?;
      (account.password_hash.clone(), account.identity())
    };

    match verify_password(&password_hash, password) {
      Ok(true) => {
        info!(uid = %identity.uid, "Signed in.");
        Ok(identity)
      }
      Ok(false) => Err(AuthError::WrongPassword),
      Err(e) => Err(AuthError::Other(e.to_string())),
    }
  }
}
