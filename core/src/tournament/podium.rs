// storefront/src/tournament/podium.rs

use serde::Serialize;
use serde_json::Value;

use super::directory::UserDirectory;
use super::player::{PlayerInfo, PlayerRef};
use crate::error::ShopResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
  First,
  Second,
  Third,
  Fourth,
}

impl Placement {
  pub const ALL: [Placement; 4] = [Placement::First, Placement::Second, Placement::Third, Placement::Fourth];

  /// Accepts FIRSTPLACE / FIRST and so on, in any case.
  pub fn from_alias(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_uppercase().as_str() {
      "FIRSTPLACE" | "FIRST" => Some(Placement::First),
      "SECONDPLACE" | "SECOND" => Some(Placement::Second),
      "THIRDPLACE" | "THIRD" => Some(Placement::Third),
      "FOURTHPLACE" | "FOURTH" => Some(Placement::Fourth),
      _ => None,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Placement::First => "Champion",
      Placement::Second => "Runner-Up",
      Placement::Third => "Third",
      Placement::Fourth => "Fourth",
    }
  }

  fn index(self) -> usize {
    self as usize
  }
}

/// Winners normalized into four fixed slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Podium {
  slots: [Option<PlayerRef>; 4],
}

impl Podium {
  /// Reads either winners shape:
  /// placement keyed (`{FIRSTPLACE: <player>}`) or player keyed (`{<uid>: "FIRSTPLACE"}`).
  /// Each entry is classified on its own; a placement key wins over a placement value.
  pub fn from_winners(winners: &Value) -> Podium {
    let mut podium = Podium::default();
    let Some(map) = winners.as_object() else {
      return podium;
    };
    for (key, value) in map {
      if let Some(placement) = Placement::from_alias(key) {
        if let Some(player) = PlayerRef::from_value(value) {
          podium.slots[placement.index()] = Some(player);
        }
        continue;
      }
      if let Some(placement) = value.as_str().and_then(Placement::from_alias) {
        if podium.slots[placement.index()].is_none() {
          podium.slots[placement.index()] = Some(PlayerRef::Bare(key.clone()));
        }
      }
    }
    podium
  }

  pub fn get(&self, placement: Placement) -> Option<&PlayerRef> {
    self.slots[placement.index()].as_ref()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.iter().all(Option::is_none)
  }

  pub async fn resolve(&self, directory: &UserDirectory) -> ShopResult<Vec<PodiumEntry>> {
    let mut entries = Vec::new();
    for placement in Placement::ALL {
      if let Some(player) = self.get(placement) {
        entries.push(PodiumEntry {
          placement,
          label: placement.label().to_string(),
          player: directory.resolve(Some(player)).await?,
        });
      }
    }
    Ok(entries)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodiumEntry {
  pub placement: Placement,
  pub label: String,
  pub player: PlayerInfo,
}
