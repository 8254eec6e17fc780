use clap::{Args, Parser, Subcommand};
use ghrm::{
    clone::CloneMethod, config::OnConflict, filter::FilterCriterion, PartialRepositoryId, Secret,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalArgs,

    #[clap(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Account whose repositories are operated on.
    #[clap(long, global = true, env = "GHRM_OWNER")]
    pub owner: Option<String>,

    /// Access token, required for private repositories and for create or delete.
    #[clap(long, global = true, env = "GHRM_TOKEN", hide_env_values = true)]
    pub token: Option<Secret<String>>,

    /// GitHub API base URL, for GitHub Enterprise.
    #[clap(long, global = true, env = "GHRM_API_URL")]
    pub api_url: Option<String>,

    /// Directory that holds `<owner>/<name>` checkouts.
    #[clap(long, global = true, env = "GHRM_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Config file, instead of the one in the platform config directory.
    #[clap(long, global = true, env = "GHRM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log debug messages to stderr.
    #[clap(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Repository related operations.
    Repos {
        #[clap(subcommand)]
        cmd: self::repos::Command,
    },
    /// Alias for repos.
    R {
        #[clap(subcommand)]
        cmd: self::repos::Command,
    },
}

pub mod repos {
    use super::*;

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Print list of the owner's repositories.
        Ls {
            /// Which repositories to print: all, skip-forks, only-forks, only-public, only-private.
            #[clap(long)]
            filter: Option<FilterCriterion>,
        },
        /// Clone every repository of the owner into the workspace.
        CloneAll {
            /// Which repositories to clone: all, skip-forks, only-forks, only-public, only-private.
            #[clap(long)]
            filter: Option<FilterCriterion>,

            /// Transport, https or ssh.
            #[clap(long)]
            method: Option<CloneMethod>,

            /// Number of recent commits to fetch, 0 for full history.
            #[clap(long)]
            depth: Option<u32>,

            /// What to do with an existing checkout: skip, overwrite, abort, or ask.
            #[clap(long)]
            on_conflict: Option<OnConflict>,
        },
        /// Create repository owned by the authenticated user.
        Create {
            /// Repository name.
            name: String,

            #[clap(long)]
            private: bool,

            #[clap(long)]
            description: Option<String>,
        },
        /// Delete repository.
        Delete {
            /// Repository identifier.
            repo: PartialRepositoryId,

            /// Skip confirmation.
            #[clap(long, short)]
            yes: bool,
        },
    }
}

pub fn cmd() -> Cli {
    Cli::parse()
}
