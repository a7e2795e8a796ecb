//! daybrief — assistant skills over the user's calendar, tasks, and
//! messages.
//!
//! Two capabilities:
//! - Fuzzy calendar lookup: resolve "my sync up tomorrow" to a concrete
//!   event via n-gram similarity plus keyword and attendee bonuses.
//! - Daily briefing: one urgency-sorted list of the day's meetings,
//!   tasks, unread email, and chat pings, with per-source failures
//!   recorded instead of aborting.
//!
//! Vendor access goes through the `providers` traits; the bundled
//! clients cover Google Calendar, Gmail, Notion, Slack, and MS Teams.

pub mod briefing;
pub mod calendar;
pub mod config;
pub mod error;
pub mod providers;
pub mod similarity;
pub mod types;

pub use briefing::{generate_daily_briefing, BriefingSources};
pub use calendar::{find_event_by_fuzzy_reference, DateHints};
pub use config::Config;
pub use error::SkillError;
