use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::refresh::{jsonl_files, list_project_dirs};
use super::session::session_stem;
use super::types::{parse_utc, Project, SessionEntry, SessionIndex};
use crate::config::SESSION_INDEX_FILE;

/// A session located by id prefix
#[derive(Debug, Clone)]
pub struct SessionMatch {
    pub path: PathBuf,
    /// Index metadata; `None` when only the transcript filename matched
    pub entry: Option<SessionEntry>,
}

/// Read a project's `sessions-index.json`, `None` when absent or unreadable
pub fn load_session_index(project_dir: &Path) -> Option<SessionIndex> {
    let path = project_dir.join(SESSION_INDEX_FILE);
    let data = fs::read(&path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(index) => Some(index),
        Err(e) => {
            log::debug!("Ignoring malformed index {}: {}", path.display(), e);
            None
        }
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Every project with at least one session.
///
/// Without an index each `*.jsonl` file is counted as one session and file
/// mtimes stand in for activity; message counts are then unknown (zero).
pub fn load_all_projects(projects_dir: &Path) -> Result<Vec<Project>, StoreError> {
    let mut projects = Vec::new();

    for dir in list_project_dirs(projects_dir)? {
        let mut project = Project {
            dir_name: dir_name(&dir),
            path: String::new(),
            session_count: 0,
            message_count: 0,
            last_active: None,
            has_index: false,
        };

        if let Some(index) = load_session_index(&dir) {
            project.has_index = true;
            project.path = index.original_path;
            project.session_count = index.entries.len();
            for entry in &index.entries {
                project.message_count += entry.message_count;
                if let Some(modified) = parse_utc(&entry.modified) {
                    bump(&mut project.last_active, modified);
                }
            }
        } else {
            log::debug!("No index for {}, counting transcripts", project.dir_name);
            let files = jsonl_files(&dir);
            project.session_count = files.len();
            for file in &files {
                if let Ok(mtime) = fs::metadata(file).and_then(|m| m.modified()) {
                    bump(&mut project.last_active, DateTime::<Utc>::from(mtime));
                }
            }
        }

        if project.session_count > 0 {
            projects.push(project);
        }
    }

    Ok(projects)
}

fn bump(latest: &mut Option<DateTime<Utc>>, candidate: DateTime<Utc>) {
    if latest.map_or(true, |l| candidate > l) {
        *latest = Some(candidate);
    }
}

/// Index entries from all projects, newest first.
///
/// `project_filter` is a case-insensitive substring matched against the
/// directory name or the index's original path.
pub fn list_all_sessions(
    projects_dir: &Path,
    project_filter: Option<&str>,
) -> Result<Vec<SessionEntry>, StoreError> {
    let filter = project_filter
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase);
    let mut sessions = Vec::new();

    for dir in list_project_dirs(projects_dir)? {
        let Some(index) = load_session_index(&dir) else {
            continue;
        };
        if let Some(filter) = &filter {
            let by_dir = dir_name(&dir).to_lowercase().contains(filter.as_str());
            let by_path = index.original_path.to_lowercase().contains(filter.as_str());
            if !by_dir && !by_path {
                continue;
            }
        }
        sessions.extend(index.entries);
    }

    // ISO-8601 timestamps are fixed width, so string order is time order
    sessions.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(sessions)
}

/// Sessions created at or after `cutoff`, newest first
pub fn list_sessions_after(
    projects_dir: &Path,
    cutoff: DateTime<Utc>,
) -> Result<Vec<SessionEntry>, StoreError> {
    let cutoff = cutoff.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut sessions = list_all_sessions(projects_dir, None)?;
    sessions.retain(|s| s.created.as_str() >= cutoff.as_str());
    Ok(sessions)
}

/// Find a session by case-insensitive id prefix.
///
/// All indexes are searched before falling back to transcript filenames.
pub fn find_session(projects_dir: &Path, id_prefix: &str) -> Result<SessionMatch, StoreError> {
    let prefix = id_prefix.to_lowercase();
    let dirs = list_project_dirs(projects_dir)?;

    if !prefix.is_empty() {
        for dir in &dirs {
            let Some(index) = load_session_index(dir) else {
                continue;
            };
            if let Some(entry) = index
                .entries
                .into_iter()
                .find(|e| e.session_id.to_lowercase().starts_with(&prefix))
            {
                let path = if entry.full_path.is_empty() {
                    dir.join(format!("{}.jsonl", entry.session_id))
                } else {
                    PathBuf::from(&entry.full_path)
                };
                return Ok(SessionMatch {
                    path,
                    entry: Some(entry),
                });
            }
        }

        for dir in &dirs {
            if let Some(path) = jsonl_files(dir)
                .into_iter()
                .find(|f| session_stem(f).to_lowercase().starts_with(&prefix))
            {
                return Ok(SessionMatch { path, entry: None });
            }
        }
    }

    Err(StoreError::SessionNotFound(id_prefix.to_string()))
}
