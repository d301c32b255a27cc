//! Shared application state
//!
//! One instance per process, constructed in `main` before the listener
//! binds and handed to the router behind an `Arc`. Holds the two
//! process-wide clients (runner provider, credential broker) and the
//! set of in-flight provisioning tasks.
//!
//! Provisioning tasks are fire-and-forget relative to the webhook
//! response, but they are tracked here so shutdown can attempt a
//! bounded drain instead of silently abandoning them.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::provision::{ScaleRequest, provision};
use gantry_core::provider::{CredentialBroker, RunnerProvider};

/// Process-wide shared state
pub struct AppState {
    /// Server configuration
    pub config: Config,

    /// The runner provider, shared by all provisioning tasks
    pub provider: Arc<dyn RunnerProvider>,

    /// The credential broker, shared by all provisioning tasks
    pub broker: Arc<dyn CredentialBroker>,

    /// In-flight provisioning tasks
    tasks: Mutex<JoinSet<()>>,
}

impl AppState {
    /// Creates the shared state
    pub fn new(
        config: Config,
        provider: Arc<dyn RunnerProvider>,
        broker: Arc<dyn CredentialBroker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            provider,
            broker,
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    /// Spawns a provisioning task for the given request
    ///
    /// Returns immediately; the task's outcome is observable only in
    /// the logs.
    pub fn spawn_provision(&self, request: ScaleRequest) {
        let policy = self.config.scaling.clone();
        let provider = Arc::clone(&self.provider);
        let broker = Arc::clone(&self.broker);

        self.tasks
            .lock()
            .unwrap()
            .spawn(async move {
                provision(request, policy, provider, broker).await;
            });
    }

    /// Number of tracked provisioning tasks, including finished ones
    /// not yet reaped
    pub fn in_flight(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Waits up to `timeout` for in-flight provisioning tasks, then
    /// aborts whatever is still running
    ///
    /// In-flight loops have no cancellation mechanism of their own;
    /// anything still polling for capacity after the deadline is
    /// abandoned.
    pub async fn drain(&self, timeout: Duration) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap());

        if tasks.is_empty() {
            return;
        }

        info!(
            "Waiting up to {:?} for {} in-flight provisioning task(s)",
            timeout,
            tasks.len()
        );

        let drained = tokio::time::timeout(timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                "Abandoning {} provisioning task(s) still in flight",
                tasks.len()
            );
            tasks.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gantry_core::provider::{CredentialError, ProviderError};

    struct NullProvider;

    impl RunnerProvider for NullProvider {
        fn count_runners(&self) -> Result<usize, ProviderError> {
            Ok(0)
        }

        fn start_runner(&self, _url: &str, _token: &str) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    struct NullBroker;

    #[async_trait]
    impl CredentialBroker for NullBroker {
        async fn create_runner_token(
            &self,
            _owner: &str,
            _repo: Option<&str>,
        ) -> Result<String, CredentialError> {
            Ok("AABBCC".to_string())
        }
    }

    #[tokio::test]
    async fn tracks_spawned_tasks_and_drains() {
        let state = AppState::new(
            Config::default(),
            Arc::new(NullProvider),
            Arc::new(NullBroker),
        );

        assert_eq!(state.in_flight(), 0);

        state.spawn_provision(ScaleRequest::repo_scoped("acme", "widgets"));
        assert_eq!(state.in_flight(), 1);

        state.drain(Duration::from_secs(1)).await;
        assert_eq!(state.in_flight(), 0);
    }

    #[tokio::test]
    async fn drain_with_no_tasks_returns_immediately() {
        let state = AppState::new(
            Config::default(),
            Arc::new(NullProvider),
            Arc::new(NullBroker),
        );

        state.drain(Duration::from_secs(1)).await;
    }
}
