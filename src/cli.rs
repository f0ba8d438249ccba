use crate::github::DEFAULT_ENDPOINT;
use crate::profile::DEFAULT_FIRST;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "github-profile")]
#[command(about = "GitHub Profile - Lists the viewer's top repositories and stars or watches them")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub GraphQL endpoint
    #[arg(long, env = "GITHUB_GRAPHQL_URL", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Number of repositories to list
    #[arg(long, env = "GITHUB_PROFILE_FIRST", default_value_t = DEFAULT_FIRST)]
    pub first: u32,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the repository list (default)
    Profile,
    /// Star a repository from the list, by node id or name
    Star { repo: String },
    /// Unstar a repository from the list, by node id or name
    Unstar { repo: String },
    /// Toggle watching a repository from the list, by node id or name
    Watch { repo: String },
}
