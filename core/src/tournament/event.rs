// storefront/src/tournament/event.rs

//! Event pages: one event's results and the listing of all events.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{event, instrument, Level};

use super::directory::UserDirectory;
use super::matches::{all_match_records, round_keys, round_views, RoundOrder, RoundView};
use super::podium::{Placement, Podium, PodiumEntry};
use crate::catalog::image_src;
use crate::error::ShopResult;
use crate::store::tree::{as_i64_lenient, children, first_str, is_vacant};
use crate::store::{paths, SharedStore};

static AM_PM_TIME: Lazy<Option<Regex>> =
  Lazy::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*([AaPp][Mm])$").ok());
static H24_TIME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").ok());

const TIME_FIELDS: &[&str] = &["tournamentTime", "eventTime", "time"];
const DATE_FIELDS: &[&str] = &["eventDate", "date"];
const LOCATION_FIELDS: &[&str] = &["location", "city", "venue"];

/// `1h 5m`, `3m 2s` or `5s`.
pub fn humanize_duration(millis: i64) -> String {
  let secs = millis.max(0) / 1000;
  let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
  if h > 0 {
    format!("{}h {}m", h, m)
  } else if m > 0 {
    format!("{}m {}s", m, s)
  } else {
    format!("{}s", s)
  }
}

fn to_12h(hour: u32, minute: u32) -> String {
  let suffix = if hour >= 12 { "PM" } else { "AM" };
  let hour = match hour % 12 {
    0 => 12,
    h => h,
  };
  format!("{}:{:02} {}", hour, minute, suffix)
}

/// Normalizes stored time text (`3pm`, `3:05 PM`, `15:05`, `15:05:00`) to `3:05 PM`.
/// Unrecognized or out-of-range text comes back unchanged.
pub fn time_label(raw: &str) -> String {
  let raw = raw.trim();
  if let Some(caps) = AM_PM_TIME.as_ref().and_then(|re| re.captures(raw)) {
    let hour: u32 = caps[1].parse().unwrap_or(0);
    let minute: u32 = caps.get(2).map_or(Ok(0), |m| m.as_str().parse()).unwrap_or(60);
    if !(1..=12).contains(&hour) || minute > 59 {
      return raw.to_string();
    }
    return format!("{}:{:02} {}", hour, minute, caps[3].to_ascii_uppercase());
  }
  if let Some(caps) = H24_TIME.as_ref().and_then(|re| re.captures(raw)) {
    let hour: u32 = caps[1].parse().unwrap_or(24);
    let minute: u32 = caps[2].parse().unwrap_or(60);
    if hour > 23 || minute > 59 {
      return raw.to_string();
    }
    return to_12h(hour, minute);
  }
  match NaiveTime::parse_from_str(raw, "%H:%M:%S") {
    Ok(t) => to_12h(t.hour(), t.minute()),
    Err(_) => raw.to_string(),
  }
}

/// Date and, for ISO timestamps, the time of day.
fn parse_event_date(raw: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
  let raw = raw.trim();
  if raw.contains('T') {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
      let local = dt.naive_local();
      return Some((local.date(), Some(local.time())));
    }
    return ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
      .map(|dt| (dt.date(), Some(dt.time())));
  }
  ["%Y-%m-%d", "%B %d, %Y", "%m/%d/%Y"]
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    .map(|d| (d, None))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
  pub id: String,
  pub name: String,
  pub status: String,
  pub status_class: &'static str,
  pub can_register: bool,
  pub date_label: String,
  pub time_label: String,
  pub location: String,
  pub image_src: String,
  pub description: String,
}

impl EventHeader {
  pub fn from_record(id: &str, record: &Value) -> Self {
    let status = first_str(record, &["status"]).unwrap_or_default().to_string();
    let lowered = status.to_ascii_lowercase();
    let status_class = match lowered.as_str() {
      "active" => "status-active",
      "ongoing" => "status-ongoing",
      "completed" => "status-completed",
      _ => "status-upcoming",
    };

    let raw_date = first_str(record, DATE_FIELDS).unwrap_or_default();
    let parsed = parse_event_date(raw_date);
    let date_label = match parsed {
      Some((date, _)) => date.format("%B %-d, %Y").to_string(),
      None => raw_date.to_string(),
    };
    let time_label = match (first_str(record, TIME_FIELDS), parsed) {
      (Some(raw_time), _) => time_label(raw_time),
      (None, Some((_, Some(t)))) => to_12h(t.hour(), t.minute()),
      _ => String::new(),
    };

    EventHeader {
      id: id.to_string(),
      name: first_str(record, &["eventName", "name"]).unwrap_or_default().to_string(),
      can_register: lowered == "open" || lowered == "active",
      status,
      status_class,
      date_label,
      time_label,
      location: first_str(record, LOCATION_FIELDS).unwrap_or_default().to_string(),
      image_src: image_src(first_str(record, &["banner", "image"])),
      description: first_str(record, &["description"]).unwrap_or_default().to_string(),
    }
  }

  pub fn is_completed(&self) -> bool {
    self.status.eq_ignore_ascii_case("completed")
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
  pub participants: u64,
  pub rounds: usize,
  /// Humanized span from the event start to its last recorded match; absent when unknown.
  pub duration: Option<String>,
}

impl EventSummary {
  pub fn compute(record: &Value, matches_root: &Value) -> Self {
    let participants = match record.get("participants") {
      Some(Value::Array(items)) => items.len() as u64,
      Some(Value::Object(map)) => map.len() as u64,
      Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
      _ => as_i64_lenient(record.get("capacity")).unwrap_or(0).max(0) as u64,
    };

    let start = ["startTimestamp", "startTime", "createdAt"]
      .iter()
      .filter_map(|k| as_i64_lenient(record.get(*k)))
      .find(|ts| *ts > 0)
      .unwrap_or(0);
    let end = all_match_records(matches_root)
      .into_iter()
      .flat_map(|m| [as_i64_lenient(m.get("updatedAt")), as_i64_lenient(m.get("timestamp"))])
      .flatten()
      .chain(as_i64_lenient(record.get("endTimestamp")))
      .fold(0, i64::max);
    let duration = (start > 0 && end > start).then(|| humanize_duration(end - start));

    EventSummary {
      participants,
      rounds: round_keys(matches_root).len(),
      duration,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResults {
  pub header: EventHeader,
  pub summary: EventSummary,
  pub history: Vec<RoundView>,
  pub panel: Vec<RoundView>,
  /// Only for completed events.
  pub podium: Option<Vec<PodiumEntry>>,
  pub share_text: Option<String>,
}

pub fn share_text(event_name: &str, podium: &[PodiumEntry]) -> String {
  let name_at = |placement: Placement| {
    podium
      .iter()
      .find(|e| e.placement == placement)
      .map(|e| e.player.name.clone())
  };
  let event_name = if event_name.is_empty() { "Tournament" } else { event_name };
  let mut text = format!(
    "Results: {}\nChampion: {}",
    event_name,
    name_at(Placement::First).unwrap_or_else(|| "Unknown".to_string())
  );
  if let Some(runner_up) = name_at(Placement::Second) {
    text.push_str(&format!("\nRunner-Up: {}", runner_up));
  }
  text
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
  #[serde(flatten)]
  pub header: EventHeader,
  pub champion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListing {
  pub events: Vec<EventCard>,
  pub past_champions: Vec<EventCard>,
}

/// Winners live under `TBL_MATCHES/<id>/WINNERS`; older events keep them on the event.
fn winners_source<'a>(record: &'a Value, matches_root: &'a Value) -> Option<&'a Value> {
  matches_root
    .get("WINNERS")
    .filter(|w| !is_vacant(w))
    .or_else(|| record.get("winners").filter(|w| !is_vacant(w)))
}

/// Builds event views. Player lookups are memoized for the life of the resolver.
pub struct EventResolver {
  store: SharedStore,
  directory: UserDirectory,
}

impl EventResolver {
  pub fn new(store: SharedStore) -> Self {
    EventResolver {
      directory: UserDirectory::new(store.clone()),
      store,
    }
  }

  pub fn directory(&self) -> &UserDirectory {
    &self.directory
  }

  /// `None` when the event does not exist.
  #[instrument(name = "EventResolver::results", skip(self))]
  pub async fn results(&self, event_id: &str) -> ShopResult<Option<EventResults>> {
    let Some(record) = self.store.get(&paths::event(event_id)).await? else {
      return Ok(None);
    };
    let matches_root = self.store.get(&paths::matches(event_id)).await?.unwrap_or(Value::Null);

    let header = EventHeader::from_record(event_id, &record);
    let summary = EventSummary::compute(&record, &matches_root);
    let history = round_views(&matches_root, RoundOrder::History, &self.directory).await?;
    let panel = round_views(&matches_root, RoundOrder::Panel, &self.directory).await?;

    let (podium, share) = if header.is_completed() {
      let entries = match winners_source(&record, &matches_root) {
        Some(winners) => Podium::from_winners(winners).resolve(&self.directory).await?,
        None => Vec::new(),
      };
      let share = share_text(&header.name, &entries);
      (Some(entries), Some(share))
    } else {
      (None, None)
    };

    event!(Level::DEBUG, rounds = summary.rounds, completed = podium.is_some(), "Event resolved.");
    Ok(Some(EventResults {
      header,
      summary,
      history,
      panel,
      podium,
      share_text: share,
    }))
  }

  #[instrument(name = "EventResolver::listing", skip(self))]
  pub async fn listing(&self) -> ShopResult<EventListing> {
    let events = self.store.get(&paths::events()).await?.unwrap_or(Value::Null);
    let all_matches = self.store.get(&paths::all_matches()).await?.unwrap_or(Value::Null);

    let mut listing = EventListing::default();
    for (id, record) in children(&events) {
      if !record.is_object() {
        continue;
      }
      let header = EventHeader::from_record(&id, record);
      let champion = if header.is_completed() {
        let matches_root = all_matches.get(&id).unwrap_or(&Value::Null);
        match winners_source(record, matches_root).map(Podium::from_winners) {
          Some(podium) => match podium.get(Placement::First) {
            Some(first) => Some(self.directory.resolve(Some(first)).await?.name),
            None => None,
          },
          None => None,
        }
      } else {
        None
      };
      let card = EventCard { header, champion };
      if card.header.is_completed() {
        listing.past_champions.push(card.clone());
      }
      listing.events.push(card);
    }
    event!(Level::DEBUG, events = listing.events.len(), "Event listing built.");
    Ok(listing)
  }
}
