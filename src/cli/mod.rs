pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{load_config, ClaudePaths, Config};
use crate::display::{self, OutputFormat};

const AFTER_HELP: &str = "\
Data source: ~/.claude/ (override with --claude-dir or CCS_CLAUDE_DIR)
Run `ccs refresh` to rebuild the stats cache from session transcripts.";

#[derive(Parser)]
#[command(
    name = "ccs",
    version,
    about = "Claude Code Summary - usage reports from local session logs",
    disable_help_subcommand = true,
    after_help = AFTER_HELP
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true, conflicts_with = "md")]
    pub json: bool,

    /// Output as Markdown
    #[arg(long, global = true)]
    pub md: bool,

    /// Claude Code data directory
    #[arg(long, global = true, env = "CCS_CLAUDE_DIR", value_name = "DIR")]
    pub claude_dir: Option<PathBuf>,

    /// Config file to load instead of the default location
    #[arg(long, global = true, env = "CCS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full report (summary + projects + sessions + tokens)
    All,

    /// Dashboard overview (default)
    Summary,

    /// Today's activity
    Today,

    /// This week's activity (since Monday)
    Week,

    /// This month's activity
    Month,

    /// Project ranking by activity
    Projects,

    /// List recent sessions
    Sessions {
        /// Filter by project name or path
        #[arg(long, value_name = "X")]
        project: Option<String>,

        /// Limit number of results
        #[arg(short = 'n', value_name = "N")]
        limit: Option<usize>,
    },

    /// Session detail view
    Session {
        /// Session id or unique prefix
        id: String,
    },

    /// Token usage breakdown
    Tokens,

    /// Rebuild the stats cache from session transcripts
    Refresh,

    /// Show version
    Version,

    /// Show this help
    Help,
}

/// Settings shared by every command for one invocation
pub struct Context {
    pub config: Config,
    pub paths: ClaudePaths,
    pub format: OutputFormat,
}

pub fn run(cli: Cli) -> Result<()> {
    let format = OutputFormat::from_flags(cli.json, cli.md);
    display::init_color(format);

    let command = cli.command.unwrap_or(Commands::Summary);
    match command {
        Commands::Version => {
            println!("ccs {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Help => return commands::help::run(),
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let paths = ClaudePaths::resolve(&config, cli.claude_dir.as_deref())?;
    log::debug!("Claude data dir: {}", paths.root().display());
    let ctx = Context {
        config,
        paths,
        format,
    };

    match command {
        Commands::All => commands::all::run(&ctx),
        Commands::Summary => commands::summary::run(&ctx),
        Commands::Today => commands::period::run(&ctx, commands::period::Period::Today),
        Commands::Week => commands::period::run(&ctx, commands::period::Period::Week),
        Commands::Month => commands::period::run(&ctx, commands::period::Period::Month),
        Commands::Projects => commands::projects::run(&ctx),
        Commands::Sessions { project, limit } => {
            commands::sessions::run(&ctx, project.as_deref(), limit)
        }
        Commands::Session { id } => commands::session::run(&ctx, &id),
        Commands::Tokens => commands::tokens::run(&ctx),
        Commands::Refresh => commands::refresh::run(&ctx),
        Commands::Version | Commands::Help => Ok(()),
    }
}
