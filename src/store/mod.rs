//! Reading Claude Code's on-disk data: transcripts, per-project indexes and
//! the aggregate stats cache rebuilt by `refresh`.

mod cache;
mod error;
mod index;
mod refresh;
mod session;
mod types;

pub use cache::{load_stats_cache, save_stats_cache};
pub use index::{find_session, list_all_sessions, list_sessions_after, load_all_projects};
pub use refresh::compute_stats;
pub use session::parse_session_detail;
pub use types::{
    parse_utc, short_id, DailyActivity, LongestSession, Message, ModelUsage, Project, Role,
    SessionDetail, SessionEntry, StatsCache,
};
