// storefront/src/tournament/mod.rs

//! Read-only views over `TBL_EVENTS` and `TBL_MATCHES`: player resolution, rounds,
//! podiums and event summaries.

pub mod directory;
pub mod event;
pub mod matches;
pub mod player;
pub mod podium;

pub use directory::UserDirectory;
pub use event::{
  humanize_duration, share_text, time_label, EventCard, EventHeader, EventListing, EventResolver, EventResults,
  EventSummary,
};
pub use matches::{
  panel_label, round_keys, round_views, rounds, MatchStatus, MatchView, ResultCode, RoundOrder, RoundSlot, RoundView,
  Side,
};
pub use player::{PlayerInfo, PlayerRef};
pub use podium::{Placement, Podium, PodiumEntry};
