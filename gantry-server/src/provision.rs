//! Provisioning loop
//!
//! The admission-controlled core of the autoscaler. Each dispatched
//! queued event becomes one `ScaleRequest`, driven through a single
//! pass of `provision`: poll the runner provider until the observed
//! count drops below the ceiling, mint a registration token, launch
//! one runner. Every request reaches exactly one terminal outcome and
//! is never retried.
//!
//! Admission is check-then-act against a per-poll snapshot. There is
//! no reservation, so concurrent requests that each observe free
//! capacity can transiently overshoot the ceiling by the number of
//! requests admitted together. Single-process, best-effort enforcement
//! is the accepted tradeoff here.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use gantry_core::provider::{CredentialBroker, RunnerProvider, registration_url};

/// One request to provision a runner
///
/// Owned exclusively by the provisioning task driving it; dropped when
/// the loop reaches a terminal outcome.
#[derive(Debug, Clone)]
pub struct ScaleRequest {
    /// Owner login (repository owner or organization)
    pub owner: String,

    /// Repository name; absent for organization-scoped requests
    pub repo: Option<String>,

    /// When the webhook gate dispatched the request
    pub created_at: DateTime<Utc>,
}

impl ScaleRequest {
    /// Request targeting a single repository
    pub fn repo_scoped(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: Some(repo.into()),
            created_at: Utc::now(),
        }
    }

    /// Request targeting a whole organization
    pub fn org_scoped(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: None,
            created_at: Utc::now(),
        }
    }

    /// `owner/repo` or bare owner, for log lines
    fn target(&self) -> String {
        match &self.repo {
            Some(repo) => format!("{}/{}", self.owner, repo),
            None => self.owner.clone(),
        }
    }
}

/// Capacity and timing policy for the provisioning loop
#[derive(Debug, Clone)]
pub struct ScalePolicy {
    /// Ceiling on concurrently running managed runners
    pub max_runners: usize,

    /// How long to wait between capacity polls
    pub poll_interval: Duration,

    /// Give up waiting for capacity after this much accumulated
    /// polling time. Kept under GitHub's 24 h job-claim deadline so a
    /// runner launched at the last poll can still pick up its job.
    pub autoscale_timeout: Duration,

    /// Base URL runners register against
    pub base_url: String,
}

/// Terminal outcome of one provisioning request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A runner was launched
    Provisioned,

    /// Capacity never freed up within the timeout; no token was
    /// requested and no launch attempted
    TimedOut,

    /// The credential broker rejected the token request
    CredentialFailed,

    /// The runner provider failed, either counting or launching
    LaunchFailed,
}

/// Drives one scale request to its terminal outcome
///
/// The capacity check runs before the first sleep, so a request that
/// arrives with capacity already free launches without any delay.
/// Timeout is measured in accumulated poll intervals, not
/// drift-corrected wall time; an interval that does not evenly divide
/// the timeout runs one extra interval before the guard trips.
pub async fn provision(
    request: ScaleRequest,
    policy: ScalePolicy,
    provider: Arc<dyn RunnerProvider>,
    broker: Arc<dyn CredentialBroker>,
) -> Outcome {
    let target = request.target();
    let mut elapsed = Duration::ZERO;

    let admitted = loop {
        if elapsed >= policy.autoscale_timeout {
            break false;
        }

        match provider.count_runners() {
            Ok(count) if count < policy.max_runners => break true,
            Ok(count) => {
                info!(
                    "Runner limit reached ({count}/{}), waiting for runners to terminate",
                    policy.max_runners
                );
            }
            Err(e) => {
                error!("Failed to count runners for {target}: {e}");
                return Outcome::LaunchFailed;
            }
        }

        tokio::time::sleep(policy.poll_interval).await;
        elapsed += policy.poll_interval;
    };

    if !admitted {
        error!(
            "Timed out waiting for runner capacity for {target} (requested at {})",
            request.created_at
        );
        return Outcome::TimedOut;
    }

    let token = match broker
        .create_runner_token(&request.owner, request.repo.as_deref())
        .await
    {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to create registration token for {target}: {e}");
            return Outcome::CredentialFailed;
        }
    };

    let url = registration_url(&policy.base_url, &request.owner, request.repo.as_deref());

    info!("Starting runner for {target}");

    match provider.start_runner(&url, &token) {
        Ok(()) => {
            info!("Provisioned runner for {target}");
            Outcome::Provisioned
        }
        Err(e) => {
            error!("Failed to launch runner for {target}: {e}");
            Outcome::LaunchFailed
        }
    }
}
