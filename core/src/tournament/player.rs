// storefront/src/tournament/player.rs

//! Player references as they appear in match and winner records.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::model::UserProfile;
use crate::store::tree::first_str;

static USER_ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{8,}$").ok());

const NAME_FIELDS: &[&str] = &["player1name", "player2name", "name", "displayName", "playerName"];
const AVATAR_FIELDS: &[&str] = &["avatar", "photoURL", "profilePicture"];

pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Whether a bare string is shaped like a user id and worth a directory lookup.
pub fn looks_like_user_id(raw: &str) -> bool {
  USER_ID_PATTERN.as_ref().is_some_and(|re| re.is_match(raw))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRef {
  /// Inline object carrying its own display fields.
  Profile { name: Option<String>, avatar: Option<String> },
  /// Inline object pointing at `users/<userId>`; inline fields override the profile.
  UserRef {
    user_id: String,
    name: Option<String>,
    avatar: Option<String>,
  },
  /// A user id or a literal player name.
  Bare(String),
}

impl PlayerRef {
  /// `None` for null, empty strings and values that cannot name a player.
  pub fn from_value(value: &Value) -> Option<PlayerRef> {
    match value {
      Value::String(s) if !s.is_empty() => Some(PlayerRef::Bare(s.clone())),
      Value::Number(n) => Some(PlayerRef::Bare(n.to_string())),
      Value::Object(_) => {
        let name = first_str(value, NAME_FIELDS).map(str::to_string);
        let avatar = first_str(value, AVATAR_FIELDS).map(str::to_string);
        let user_id = match value.get("userId") {
          Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
          Some(Value::Number(n)) => Some(n.to_string()),
          _ => None,
        };
        Some(match user_id {
          Some(user_id) => PlayerRef::UserRef { user_id, name, avatar },
          None => PlayerRef::Profile { name, avatar },
        })
      }
      _ => None,
    }
  }

  /// First of `keys` on `record` that holds a usable reference.
  pub fn from_fields(record: &Value, keys: &[&str]) -> Option<PlayerRef> {
    keys.iter().filter_map(|k| record.get(*k)).find_map(PlayerRef::from_value)
  }

  /// The user id to look up, if this reference has one worth trying.
  pub fn lookup_id(&self) -> Option<&str> {
    match self {
      PlayerRef::UserRef { user_id, .. } => Some(user_id),
      PlayerRef::Bare(raw) if looks_like_user_id(raw) => Some(raw),
      _ => None,
    }
  }

  /// Display info given the looked-up profile (if any).
  pub fn describe(&self, profile: Option<&UserProfile>) -> PlayerInfo {
    let from_profile_name = || profile.and_then(UserProfile::preferred_name).map(str::to_string);
    let from_profile_avatar = || profile.and_then(UserProfile::preferred_avatar).map(str::to_string);
    match self {
      PlayerRef::Profile { name, avatar } => PlayerInfo {
        name: name.clone().unwrap_or_else(|| UNKNOWN_PLAYER.to_string()),
        avatar: avatar.clone().unwrap_or_default(),
      },
      PlayerRef::UserRef { name, avatar, .. } => PlayerInfo {
        name: name
          .clone()
          .or_else(from_profile_name)
          .unwrap_or_else(|| UNKNOWN_PLAYER.to_string()),
        avatar: avatar.clone().or_else(from_profile_avatar).unwrap_or_default(),
      },
      PlayerRef::Bare(raw) => match profile {
        Some(_) => PlayerInfo {
          name: from_profile_name().unwrap_or_else(|| raw.clone()),
          avatar: from_profile_avatar().unwrap_or_default(),
        },
        None => PlayerInfo {
          name: raw.clone(),
          avatar: String::new(),
        },
      },
    }
  }
}

/// Resolved display name and avatar payload (empty when there is none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
  pub name: String,
  pub avatar: String,
}

impl PlayerInfo {
  pub fn unknown() -> Self {
    PlayerInfo {
      name: UNKNOWN_PLAYER.to_string(),
      avatar: String::new(),
    }
  }
}
