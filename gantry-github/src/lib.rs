//! Gantry GitHub Client
//!
//! A small, type-safe client for the slice of the GitHub REST API the
//! autoscaler needs: minting self-hosted runner registration tokens.
//!
//! The client is constructed once at process startup with a personal
//! access token and shared behind an `Arc` by every provisioning task.
//! It performs no retries; a rejected token request is terminal for
//! the request that made it.
//!
//! # Example
//!
//! ```no_run
//! use gantry_github::GithubClient;
//! use gantry_core::provider::CredentialBroker;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GithubClient::new("ghp_example");
//!
//!     let token = client.create_runner_token("acme", Some("widgets")).await?;
//!     println!("registration token: {}", token);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use gantry_core::dto::RegistrationTokenResponse;
use gantry_core::provider::{CredentialBroker, CredentialError};

/// Default base URL for the GitHub REST API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Client for the GitHub registration-token endpoints
#[derive(Debug, Clone)]
pub struct GithubClient {
    /// Base URL of the API (overridable for tests and GHES)
    base_url: String,
    /// Personal access token with `repo` / `admin:org` scope
    token: String,
    /// HTTP client instance
    client: Client,
}

impl GithubClient {
    /// Create a new client against the public GitHub API
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Create a new client against a custom API base URL
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path of the registration-token endpoint for the given target
    ///
    /// A present repository selects the repo-scoped endpoint, an
    /// absent one the org-scoped endpoint.
    fn token_endpoint(owner: &str, repo: Option<&str>) -> String {
        match repo {
            Some(repo) => format!("/repos/{owner}/{repo}/actions/runners/registration-token"),
            None => format!("/orgs/{owner}/actions/runners/registration-token"),
        }
    }
}

#[async_trait]
impl CredentialBroker for GithubClient {
    async fn create_runner_token(
        &self,
        owner: &str,
        repo: Option<&str>,
    ) -> Result<String, CredentialError> {
        let url = format!("{}{}", self.base_url, Self::token_endpoint(owner, repo));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            // The GitHub API rejects requests without a User-Agent.
            .header("User-Agent", "gantry")
            .send()
            .await
            .map_err(|e| CredentialError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CredentialError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: RegistrationTokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::ParseError(e.to_string()))?;

        debug!(owner, repo, expires_at = %body.expires_at, "Minted registration token");

        Ok(body.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_token_endpoint() {
        assert_eq!(
            GithubClient::token_endpoint("acme", Some("widgets")),
            "/repos/acme/widgets/actions/runners/registration-token"
        );
    }

    #[test]
    fn org_token_endpoint() {
        assert_eq!(
            GithubClient::token_endpoint("acme", None),
            "/orgs/acme/actions/runners/registration-token"
        );
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = GithubClient::with_base_url("t", "https://ghes.example.com/api/v3/");
        assert_eq!(client.base_url(), "https://ghes.example.com/api/v3");
    }
}
