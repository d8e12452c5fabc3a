pub mod all;
pub mod help;
pub mod period;
pub mod projects;
pub mod refresh;
pub mod session;
pub mod sessions;
pub mod summary;
pub mod tokens;

use anyhow::{Context as _, Result};

use super::Context;
use crate::store::{self, StatsCache};

/// Read the stats cache written by the last `refresh`
pub(crate) fn load_cache(ctx: &Context) -> Result<StatsCache> {
    let path = ctx.paths.stats_cache();
    store::load_stats_cache(&path)
        .context("loading stats cache (run `ccs refresh` to build it)")
}
