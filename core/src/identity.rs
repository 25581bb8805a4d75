// storefront/src/identity.rs

//! Who is signed in. The provider issues identities; [`AuthState`] publishes the
//! current one to anything that follows it (the cart sync, a session).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{event, Level};

use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  pub uid: String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
}

impl Identity {
  pub fn new(uid: impl Into<String>) -> Self {
    Identity {
      uid: uid.into(),
      display_name: None,
      email: None,
    }
  }

  pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
    self.display_name = Some(name.into());
    self
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }

  /// Name shown on orders: display name, else the email local part, else "Customer".
  pub fn user_name(&self) -> String {
    if let Some(name) = self.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
      return name.to_string();
    }
    self
      .email
      .as_deref()
      .and_then(|email| email.split('@').next())
      .filter(|local| !local.is_empty())
      .unwrap_or("Customer")
      .to_string()
  }

  pub fn email_or_empty(&self) -> &str {
    self.email.as_deref().unwrap_or_default()
  }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
  async fn sign_up(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<Identity, AuthError>;

  async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
}

/// Subscribable "current user".
#[derive(Debug, Clone)]
pub struct AuthState {
  tx: watch::Sender<Option<Identity>>,
}

impl Default for AuthState {
  fn default() -> Self {
    Self::new()
  }
}

impl AuthState {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(None);
    AuthState { tx }
  }

  pub fn current(&self) -> Option<Identity> {
    self.tx.borrow().clone()
  }

  /// The current identity, or `NotSignedIn`.
  pub fn require(&self) -> Result<Identity, AuthError> {
    self.current().ok_or(AuthError::NotSignedIn)
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
    self.tx.subscribe()
  }

  pub fn set(&self, identity: Option<Identity>) {
    event!(Level::INFO, signed_in = identity.is_some(), uid = ?identity.as_ref().map(|i| &i.uid), "Auth state changed.");
    self.tx.send_replace(identity);
  }

  pub async fn sign_in(&self, provider: &dyn IdentityProvider, email: &str, password: &str) -> Result<Identity, AuthError> {
    let identity = provider.sign_in(email, password).await?;
    self.set(Some(identity.clone()));
    Ok(identity)
  }

  pub async fn sign_up(
    &self,
    provider: &dyn IdentityProvider,
    email: &str,
    password: &str,
    display_name: Option<&str>,
  ) -> Result<Identity, AuthError> {
    let identity = provider.sign_up(email, password, display_name).await?;
    self.set(Some(identity.clone()));
    Ok(identity)
  }

  pub fn sign_out(&self) {
    self.set(None);
  }
}
