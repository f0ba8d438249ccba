use anyhow::Context;
use clap::Parser;
use colored::*;
use github_profile::cli::{Cli, Command};
use github_profile::error::GitHubProfileError;
use github_profile::render::render_profile;
use github_profile::{GitHubApi, GitHubClient, NormalizedCache, ProfileController, ProfileRender};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let token = cli
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| GitHubProfileError::AuthError("GITHUB_TOKEN is not set".to_string()))?;

    let client = Arc::new(
        GitHubClient::with_endpoint(token, &cli.endpoint).context("Failed to create GitHub client")?,
    );
    info!(endpoint = %client.endpoint(), "GitHub client ready");

    let cache = Arc::new(NormalizedCache::new());
    let api: Arc<dyn GitHubApi> = client.clone();
    let mut profile = ProfileController::new(api, cache.clone(), cli.first);

    println!("{}", "GitHub Profile".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    profile.load().await;

    let command = cli.command.clone().unwrap_or(Command::Profile);
    if command != Command::Profile {
        if let ProfileRender::Error(_) = profile.render() {
            println!("{}", render_profile(&profile.render(), &cache));
            anyhow::bail!("Profile failed to load, not running {:?}", command);
        }
        run_action(&profile, &command).await?;
        println!();
    }

    println!("{}", render_profile(&profile.render(), &cache));

    let rate_limit = client.rate_limit();
    debug!(remaining = rate_limit.remaining, limit = rate_limit.limit, "Rate limit");
    println!(
        "\n{}",
        format!("Rate limit: {} / {}", rate_limit.remaining, rate_limit.limit).dimmed()
    );

    Ok(())
}

async fn run_action(profile: &ProfileController, command: &Command) -> anyhow::Result<()> {
    let repo = match command {
        Command::Star { repo } | Command::Unstar { repo } | Command::Watch { repo } => repo,
        Command::Profile => return Ok(()),
    };

    let item = profile
        .find_item(repo)
        .ok_or_else(|| GitHubProfileError::NotFound(format!("Repository {} is not in the list", repo)))?;

    let result = match command {
        Command::Star { .. } => item.star().await,
        Command::Unstar { .. } => item.unstar().await,
        _ => item.toggle_watch().await,
    };

    match result {
        Ok(repository) => {
            println!(
                "✅ {}: {} stars, {} watchers",
                repository.name.bold(),
                repository.stargazers.total_count,
                repository.watchers.total_count
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {}", e.to_string().red());
            Err(e).context(format!("{:?} failed", command))
        }
    }
}
