use chrono::{Local, NaiveDate, SecondsFormat, TimeZone, Timelike, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::session::scan_session_stats;
use super::types::{
    DailyActivity, DailyModelTokens, LongestSession, ModelUsage, SessionStats, StatsCache,
};

pub const CACHE_VERSION: u32 = 1;

/// Scan every transcript under `projects_dir` and build a fresh cache.
///
/// Dates and hours use the local time zone. `progress` is called after each
/// file with (done, total).
pub fn compute_stats<F>(projects_dir: &Path, progress: F) -> Result<StatsCache, StoreError>
where
    F: FnMut(usize, usize),
{
    compute_stats_in(projects_dir, &Local, progress)
}

/// Same as [`compute_stats`] with an explicit time zone for day and hour buckets
pub fn compute_stats_in<Tz, F>(
    projects_dir: &Path,
    tz: &Tz,
    mut progress: F,
) -> Result<StatsCache, StoreError>
where
    Tz: TimeZone,
    F: FnMut(usize, usize),
{
    let files = collect_transcripts(projects_dir)?;
    let total = files.len();
    let mut builder = StatsBuilder::default();

    for (i, path) in files.iter().enumerate() {
        match scan_session_stats(path) {
            Ok(stats) => builder.add(&stats, tz),
            Err(e) => log::debug!("Skipping {}: {}", path.display(), e),
        }
        progress(i + 1, total);
    }

    let today = Utc::now().with_timezone(tz).date_naive();
    let cache = builder.finish(today);
    log::info!(
        "Scanned {} files: {} sessions, {} messages",
        total,
        cache.total_sessions,
        cache.total_messages
    );
    Ok(cache)
}

/// All `*.jsonl` files one level below each project directory, in name order
pub fn collect_transcripts(projects_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files = Vec::new();
    for project in list_project_dirs(projects_dir)? {
        files.extend(jsonl_files(&project));
    }
    Ok(files)
}

/// Project directories under `projects_dir`, sorted by name
pub(crate) fn list_project_dirs(projects_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = fs::read_dir(projects_dir).map_err(|source| StoreError::ProjectsDir {
        path: projects_dir.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Transcript files directly inside one project dir; unreadable dirs yield none
pub(crate) fn jsonl_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        log::debug!("Cannot list {}", dir.display());
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "jsonl"))
        .collect();
    files.sort();
    files
}

/// Running totals folded from each session, materialised once by `finish`
#[derive(Default)]
struct StatsBuilder {
    daily: BTreeMap<NaiveDate, DailyActivity>,
    daily_tokens: BTreeMap<NaiveDate, BTreeMap<String, u64>>,
    models: BTreeMap<String, ModelUsage>,
    hours: BTreeMap<u32, u64>,
    total_sessions: u64,
    total_messages: u64,
    first_date: Option<NaiveDate>,
    longest: LongestSession,
}

impl StatsBuilder {
    fn add<Tz: TimeZone>(&mut self, stats: &SessionStats, tz: &Tz) {
        let messages = stats.total_messages();
        if messages == 0 {
            return;
        }

        self.total_sessions += 1;
        self.total_messages += messages;

        let start = stats.started_at.map(|t| t.with_timezone(tz));
        let date = start.as_ref().map(|t| t.date_naive());

        if let Some(start) = &start {
            *self.hours.entry(start.hour()).or_insert(0) += 1;
        }

        if let Some(date) = date {
            if self.first_date.map_or(true, |first| date < first) {
                self.first_date = Some(date);
            }

            let day = self.daily.entry(date).or_insert_with(|| DailyActivity {
                date: date.format("%Y-%m-%d").to_string(),
                ..Default::default()
            });
            day.session_count += 1;
            day.message_count += messages;
            day.tool_call_count += stats.tool_calls;
        }

        for (model, usage) in &stats.tokens {
            if let Some(date) = date {
                *self
                    .daily_tokens
                    .entry(date)
                    .or_default()
                    .entry(model.clone())
                    .or_insert(0) += usage.output_tokens;
            }
            self.models.entry(model.clone()).or_default().merge(usage);
        }

        // Strictly greater: the first session scanned wins a tie
        if let (Some(started), Some(duration)) = (stats.started_at, stats.duration_ms()) {
            if duration > 0 && duration as u64 > self.longest.duration {
                self.longest = LongestSession {
                    session_id: stats.session_id.clone(),
                    duration: duration as u64,
                    message_count: messages,
                    timestamp: started
                        .with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                };
            }
        }
    }

    fn finish(self, computed_on: NaiveDate) -> StatsCache {
        let daily_model_tokens = self
            .daily_tokens
            .into_iter()
            .map(|(date, tokens_by_model)| DailyModelTokens {
                date: date.format("%Y-%m-%d").to_string(),
                tokens_by_model,
            })
            .collect();

        StatsCache {
            version: CACHE_VERSION,
            last_computed_date: computed_on.format("%Y-%m-%d").to_string(),
            daily_activity: self.daily.into_values().collect(),
            daily_model_tokens,
            model_usage: self.models,
            total_sessions: self.total_sessions,
            total_messages: self.total_messages,
            longest_session: self.longest,
            first_session_date: self
                .first_date
                .map(|d| format!("{}T00:00:00Z", d.format("%Y-%m-%d")))
                .unwrap_or_default(),
            hour_counts: self
                .hours
                .into_iter()
                .map(|(hour, count)| (hour.to_string(), count))
                .collect(),
        }
    }
}
