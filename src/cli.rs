use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "credwalk", about = "Incremental credential scanning of repository history")]
pub struct Cli {
    /// SQLite database file (defaults to the user data directory)
    #[arg(long, env = "CREDWALK_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long, env = "CREDWALK_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or upgrade the database schema
    Init,

    /// List repositories due for a fetch
    Due {
        /// Repositories fetched within this many minutes are skipped
        #[arg(long, default_value_t = 60)]
        minutes: i64,
    },

    /// List repositories without a scan under a rules version
    Unscanned {
        #[arg(long)]
        rules_version: i64,
    },

    /// Expand one commit's ancestry into scan tasks (printed as JSON lines)
    Walk {
        /// Directory holding clones as <owner>/<repo>
        #[arg(long)]
        repos_root: PathBuf,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        #[arg(long)]
        sha: String,

        /// Generations to walk before falling back to a full ref scan
        #[arg(long, default_value_t = 10)]
        depth: i64,

        /// Drain ancestry follow-ups in-process; only scan tasks are printed
        #[arg(long)]
        local: bool,
    },
}
