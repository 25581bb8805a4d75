// storefront/src/model/user.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::tree::first_str;

/// Profile stored under `users/<uid>`. Every field is optional in stored data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
  pub photo_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub profile_picture: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub birthdate: Option<String>,
}

impl UserProfile {
  /// Tolerates records with unexpected field types by reading only the string fields.
  pub fn from_record(record: &Value) -> Self {
    let text = |keys: &[&str]| first_str(record, keys).map(str::to_string);
    UserProfile {
      display_name: text(&["displayName"]),
      name: text(&["name"]),
      email: text(&["email"]),
      photo_url: text(&["photoURL"]),
      avatar: text(&["avatar"]),
      profile_picture: text(&["profilePicture"]),
      created_at: record.get("createdAt").and_then(Value::as_i64),
      gender: text(&["gender"]),
      birthdate: text(&["birthdate"]),
    }
  }

  /// `displayName`, then `name`.
  pub fn preferred_name(&self) -> Option<&str> {
    self.display_name.as_deref().or(self.name.as_deref())
  }

  /// `photoURL`, then `avatar`, then `profilePicture`.
  pub fn preferred_avatar(&self) -> Option<&str> {
    self
      .photo_url
      .as_deref()
      .or(self.avatar.as_deref())
      .or(self.profile_picture.as_deref())
  }
}
