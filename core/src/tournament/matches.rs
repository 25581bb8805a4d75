// storefront/src/tournament/matches.rs

//! Match records and the two round views built from `TBL_MATCHES/<eventId>`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::directory::UserDirectory;
use super::player::{PlayerInfo, PlayerRef};
use crate::error::ShopResult;
use crate::store::tree::{children, first_present};

static ROUND_KEY_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)^Round\d+$").ok());

const SIDE_A_FIELDS: &[&str] = &["playerA", "player1", "playerAId", "player1Id", "playerAUID", "playerAUserId"];
const SIDE_B_FIELDS: &[&str] = &["playerB", "player2", "playerBId", "player2Id", "playerBUID", "playerBUserId"];
const WINNER_FIELDS: &[&str] = &["winner", "winnerId", "winnerUID", "winnerUserId"];

pub fn is_round_key(key: &str) -> bool {
  ROUND_KEY_PATTERN.as_ref().is_some_and(|re| re.is_match(key))
}

fn round_number(key: &str) -> u64 {
  key
    .chars()
    .filter(char::is_ascii_digit)
    .collect::<String>()
    .parse()
    .unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
  A,
  B,
}

/// What a match record says about its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
  SideWins(Side),
  Draw,
}

impl ResultCode {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "player1_wins" | "p1_wins" | "player_a_wins" => Some(ResultCode::SideWins(Side::A)),
      "player2_wins" | "p2_wins" | "player_b_wins" => Some(ResultCode::SideWins(Side::B)),
      "draw" | "tie" => Some(ResultCode::Draw),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
  Completed,
  Live,
  Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
  pub player_a: PlayerInfo,
  pub player_b: PlayerInfo,
  /// Winner's display name; absent for draws and undecided matches.
  pub winner: Option<String>,
  pub winner_side: Option<Side>,
  pub is_draw: bool,
  pub score_a: Option<String>,
  pub score_b: Option<String>,
  /// Combined score text, shown only when neither side has its own score.
  pub score: Option<String>,
  pub status: MatchStatus,
}

fn score_text(value: Option<&Value>) -> Option<String> {
  match value? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

impl MatchView {
  pub async fn resolve(record: &Value, directory: &UserDirectory) -> ShopResult<MatchView> {
    let player_a = directory.resolve(PlayerRef::from_fields(record, SIDE_A_FIELDS).as_ref()).await?;
    let player_b = directory.resolve(PlayerRef::from_fields(record, SIDE_B_FIELDS).as_ref()).await?;

    let result = record.get("result").and_then(Value::as_str).and_then(ResultCode::parse);
    let (winner, winner_side, is_draw) = match result {
      Some(ResultCode::SideWins(Side::A)) => (Some(player_a.name.clone()), Some(Side::A), false),
      Some(ResultCode::SideWins(Side::B)) => (Some(player_b.name.clone()), Some(Side::B), false),
      Some(ResultCode::Draw) => (None, None, true),
      None => match PlayerRef::from_fields(record, WINNER_FIELDS) {
        Some(explicit) => {
          let name = directory.resolve(Some(&explicit)).await?.name;
          let side = if name == player_a.name {
            Some(Side::A)
          } else if name == player_b.name {
            Some(Side::B)
          } else {
            None
          };
          (Some(name), side, false)
        }
        None => (None, None, false),
      },
    };

    let score_a = score_text(first_present(record, &["scoreA", "score_a"]));
    let score_b = score_text(first_present(record, &["scoreB", "score_b"]));
    let score = if score_a.is_none() && score_b.is_none() {
      score_text(record.get("score"))
    } else {
      None
    };

    let live = record.get("live").and_then(Value::as_bool).unwrap_or(false);
    let status = if winner.is_some() {
      MatchStatus::Completed
    } else if live {
      MatchStatus::Live
    } else {
      MatchStatus::Pending
    };

    Ok(MatchView {
      player_a,
      player_b,
      winner,
      winner_side,
      is_draw,
      score_a,
      score_b,
      score,
      status,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOrder {
  /// Oldest round first, labelled by key.
  History,
  /// Final round first, labelled Finals / Semi-Finals / Quarter-Finals / Round n.
  Panel,
}

/// A round before player resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSlot<'a> {
  pub key: String,
  pub label: String,
  pub matches: Vec<&'a Value>,
}

/// Panel label for the round at `index` (0 = final) among `count` rounds.
pub fn panel_label(index: usize, count: usize) -> String {
  match index {
    0 => "Finals".to_string(),
    1 => "Semi-Finals".to_string(),
    2 => "Quarter-Finals".to_string(),
    _ => format!("Round {}", count - index),
  }
}

/// Round keys under a matches root, sorted by their number.
pub fn round_keys(root: &Value) -> Vec<String> {
  let mut keys: Vec<String> = root
    .as_object()
    .map(|map| map.keys().filter(|k| is_round_key(k)).cloned().collect())
    .unwrap_or_default();
  keys.sort_by(|a, b| round_number(a).cmp(&round_number(b)).then_with(|| a.cmp(b)));
  keys
}

pub fn rounds(root: &Value, order: RoundOrder) -> Vec<RoundSlot<'_>> {
  let mut keys = round_keys(root);
  if order == RoundOrder::Panel {
    keys.reverse();
  }
  let count = keys.len();
  keys
    .into_iter()
    .enumerate()
    .map(|(index, key)| {
      let matches = root.get(&key).map(|round| children(round).into_iter().map(|(_, m)| m).collect()).unwrap_or_default();
      let label = match order {
        RoundOrder::History => key.clone(),
        RoundOrder::Panel => panel_label(index, count),
      };
      RoundSlot { key, label, matches }
    })
    .collect()
}

/// Every match record in every round, for summary statistics.
pub fn all_match_records(root: &Value) -> Vec<&Value> {
  rounds(root, RoundOrder::History)
    .into_iter()
    .flat_map(|slot| slot.matches)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
  pub key: String,
  pub label: String,
  pub matches: Vec<MatchView>,
}

pub async fn round_views(root: &Value, order: RoundOrder, directory: &UserDirectory) -> ShopResult<Vec<RoundView>> {
  let mut views = Vec::new();
  for slot in rounds(root, order) {
    let mut matches = Vec::with_capacity(slot.matches.len());
    for record in slot.matches {
      matches.push(MatchView::resolve(record, directory).await?);
    }
    views.push(RoundView {
      key: slot.key,
      label: slot.label,
      matches,
    });
  }
  Ok(views)
}
