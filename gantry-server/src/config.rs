//! Server configuration
//!
//! All settings come from environment variables; only the shared
//! webhook secret and the GitHub token are required. The autoscale
//! timeout defaults to 23 hours, just under GitHub's 24 hour window
//! for a queued job to be claimed.

use anyhow::{Result, bail};
use std::time::Duration;

use crate::provision::ScalePolicy;
use gantry_docker::DockerSettings;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment name (e.g. "dev", "prod")
    pub env: String,

    /// Lower the default log filter to debug
    pub debug: bool,

    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Shared secret for webhook HMAC signatures
    pub secret_token: String,

    /// GitHub personal access token for minting registration tokens
    pub github_token: String,

    /// GitHub API base URL
    pub github_api_url: String,

    /// Docker runner provider settings
    pub docker: DockerSettings,

    /// Capacity and timing policy for the provisioning loop
    pub scaling: ScalePolicy,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SECRET_TOKEN (required)
    /// - GITHUB_TOKEN (required)
    /// - ENV (optional, default: dev)
    /// - DEBUG (optional, default: false)
    /// - BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - GITHUB_API_URL (optional, default: https://api.github.com)
    /// - MAX_RUNNERS (optional, default: 5)
    /// - SCALE_POLLING_INTERVAL (optional, seconds, default: 60)
    /// - AUTOSCALE_TIMEOUT (optional, seconds, default: 82800)
    /// - RUNNER_BASE_URL (optional, default: https://github.com)
    ///
    /// plus the Docker provider variables read by
    /// [`DockerSettings::from_env`].
    pub fn from_env() -> Result<Self> {
        let secret_token = std::env::var("SECRET_TOKEN")
            .map_err(|_| anyhow::anyhow!("SECRET_TOKEN environment variable not set"))?;

        let github_token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| anyhow::anyhow!("GITHUB_TOKEN environment variable not set"))?;

        let defaults = Self::default();

        let max_runners = std::env::var("MAX_RUNNERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.scaling.max_runners);

        let poll_interval = std::env::var("SCALE_POLLING_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.scaling.poll_interval);

        let autoscale_timeout = std::env::var("AUTOSCALE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.scaling.autoscale_timeout);

        let base_url =
            std::env::var("RUNNER_BASE_URL").unwrap_or_else(|_| defaults.scaling.base_url.clone());

        Ok(Self {
            env: std::env::var("ENV").unwrap_or(defaults.env),
            debug: std::env::var("DEBUG")
                .ok()
                .and_then(|s| s.parse::<bool>().ok())
                .unwrap_or(defaults.debug),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            secret_token,
            github_token,
            github_api_url: std::env::var("GITHUB_API_URL").unwrap_or(defaults.github_api_url),
            docker: DockerSettings::from_env(),
            scaling: ScalePolicy {
                max_runners,
                poll_interval,
                autoscale_timeout,
                base_url,
            },
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.secret_token.is_empty() {
            bail!("secret_token cannot be empty");
        }

        if self.github_token.is_empty() {
            bail!("github_token cannot be empty");
        }

        if self.scaling.max_runners == 0 {
            bail!("max_runners must be greater than 0");
        }

        if self.scaling.poll_interval.is_zero() {
            bail!("scale polling interval must be greater than 0");
        }

        if self.scaling.autoscale_timeout < self.scaling.poll_interval {
            bail!("autoscale timeout must be at least one polling interval");
        }

        if !self.scaling.base_url.starts_with("http://")
            && !self.scaling.base_url.starts_with("https://")
        {
            bail!("runner base url must start with http:// or https://");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            debug: false,
            bind_addr: "0.0.0.0:8080".to_string(),
            secret_token: "secret".to_string(),
            github_token: "secret".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            docker: DockerSettings::default(),
            scaling: ScalePolicy {
                max_runners: 5,
                poll_interval: Duration::from_secs(60),
                // Github drops any job not picked up within 24 hours.
                autoscale_timeout: Duration::from_secs(60 * 60 * 23),
                base_url: "https://github.com".to_string(),
            },
        }
    }
}
