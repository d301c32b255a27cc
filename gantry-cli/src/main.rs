//! Gantry CLI
//!
//! Operator commands for the Gantry autoscaler: mint a registration
//! token by hand, or mint one and launch a runner container directly,
//! bypassing the webhook path.

use anyhow::Result;
use clap::{Parser, Subcommand};

use gantry_core::provider::{CredentialBroker, RunnerProvider, registration_url};
use gantry_docker::{DockerClient, DockerSettings};
use gantry_github::{DEFAULT_API_URL, GithubClient};

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Operator CLI for the Gantry runner autoscaler", long_about = None)]
struct Cli {
    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a runner registration token and print it
    CreateToken {
        /// Owner login (repository owner or organization)
        #[arg(long)]
        owner: String,

        /// Repository name; omit for an organization-scoped token
        #[arg(long)]
        repo: Option<String>,
    },

    /// Mint a token and launch one runner container
    CreateRunner {
        /// Owner login (repository owner or organization)
        #[arg(long)]
        owner: String,

        /// Repository name; omit for an organization-scoped runner
        #[arg(long)]
        repo: Option<String>,

        /// Base URL the runner registers against
        #[arg(long, env = "RUNNER_BASE_URL", default_value = "https://github.com")]
        base_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = GithubClient::with_base_url(cli.github_token, cli.api_url);

    match cli.command {
        Commands::CreateToken { owner, repo } => {
            let token = client.create_runner_token(&owner, repo.as_deref()).await?;
            println!("{token}");
        }
        Commands::CreateRunner {
            owner,
            repo,
            base_url,
        } => {
            let provider = DockerClient::initialize(&DockerSettings::from_env())?;
            let token = client.create_runner_token(&owner, repo.as_deref()).await?;
            let url = registration_url(&base_url, &owner, repo.as_deref());

            provider.start_runner(&url, &token)?;
            println!("Started runner for {url}");
        }
    }

    Ok(())
}
