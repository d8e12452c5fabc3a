use std::fs;
use std::io::Write;
use std::path::Path;

use super::error::StoreError;
use super::types::StatsCache;

/// Read and parse the stats cache
pub fn load_stats_cache(path: &Path) -> Result<StatsCache, StoreError> {
    let data = fs::read(path).map_err(|source| StoreError::CacheRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| StoreError::CacheParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the stats cache atomically.
///
/// The snapshot is written to a temp file next to the target and renamed over
/// it, so a failed write leaves the previous cache intact.
pub fn save_stats_cache(path: &Path, stats: &StatsCache) -> Result<(), StoreError> {
    let wrap = |source| StoreError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(wrap)?;

    let mut json = serde_json::to_vec_pretty(stats).map_err(|e| wrap(e.into()))?;
    json.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(&json).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}
