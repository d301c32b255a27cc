//! Provider traits
//!
//! The capability seams between the provisioning loop and the outside
//! world. The loop only ever talks to these traits, so tests (and any
//! future non-Docker runtime) can substitute their own implementations
//! without touching the admission logic.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a runner provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The container runtime could not be reached or executed
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    /// A runtime command exited with a non-zero status
    #[error("{command} failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        /// The command that failed, e.g. `docker pull`
        command: String,
        /// Exit code reported by the runtime, -1 if killed by signal
        exit_code: i32,
        /// Captured stderr, trimmed
        stderr: String,
    },

    /// The managed image could not be resolved after build/pull
    #[error("failed to resolve image identity for {0}")]
    ImageUnresolved(String),
}

/// Errors from a credential broker
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The request never completed (connection, TLS, timeout)
    #[error("token request failed: {0}")]
    RequestFailed(String),

    /// The remote API answered with a non-success status
    #[error("token request rejected (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body from the API
        message: String,
    },

    /// The response body could not be parsed
    #[error("failed to parse token response: {0}")]
    ParseError(String),
}

/// A source of ephemeral runner instances
///
/// Implementations report how many managed runners are currently
/// running and can launch a new one. `count_runners` must only count
/// instances carrying the managed image identity; unrelated containers
/// on the same host are invisible to the autoscaler.
pub trait RunnerProvider: Send + Sync {
    /// Number of currently running managed runner instances
    fn count_runners(&self) -> Result<usize, ProviderError>;

    /// Launch one new ephemeral runner that registers itself at `url`
    /// using `token`. Not idempotent: every call creates one instance.
    fn start_runner(&self, url: &str, token: &str) -> Result<(), ProviderError>;
}

/// A source of short-lived runner registration tokens
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    /// Exchange an owner (and optionally a repository) for a
    /// registration token. Repo present selects the repository-scoped
    /// endpoint, absent the organization-scoped one.
    async fn create_runner_token(
        &self,
        owner: &str,
        repo: Option<&str>,
    ) -> Result<String, CredentialError>;
}

/// Build the URL a new runner registers against
///
/// Org-scoped requests omit the repository segment.
pub fn registration_url(base_url: &str, owner: &str, repo: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match repo {
        Some(repo) => format!("{base}/{owner}/{repo}"),
        None => format!("{base}/{owner}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_registration_url() {
        assert_eq!(
            registration_url("https://github.com", "acme", Some("widgets")),
            "https://github.com/acme/widgets"
        );
    }

    #[test]
    fn org_registration_url() {
        assert_eq!(
            registration_url("https://github.com", "acme", None),
            "https://github.com/acme"
        );
    }

    #[test]
    fn trims_trailing_slash_from_base() {
        assert_eq!(
            registration_url("https://github.com/", "acme", None),
            "https://github.com/acme"
        );
    }
}
