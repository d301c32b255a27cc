//! Gantry Docker Provider
//!
//! Runner provider backed by the `docker` CLI.
//!
//! At startup the provider establishes the managed runner image
//! identity: it either builds the image from a local context or pulls
//! a pre-built one, then resolves the image ID. Counting only ever
//! looks at containers descended from that exact ID, so unrelated
//! containers on the host never influence admission decisions.
//!
//! Launched runners are detached, auto-removed containers that receive
//! their registration URL and token via `URL` and `TOKEN` environment
//! variables, with the Docker socket mounted so the runner can itself
//! run containerized job steps.

mod settings;

pub use settings::DockerSettings;

use std::process::{Command, Output};
use tracing::{debug, info};

use gantry_core::provider::{ProviderError, RunnerProvider};

/// Checks that the docker CLI is installed and responding
pub fn check_docker_available() -> Result<(), ProviderError> {
    let output = Command::new("docker")
        .arg("--version")
        .output()
        .map_err(|e| {
            ProviderError::Unavailable(format!(
                "failed to execute 'docker --version', is docker installed? ({e})"
            ))
        })?;

    check_status("docker --version", &output)?;

    let version = String::from_utf8_lossy(&output.stdout);
    info!("Docker is available: {}", version.trim());

    Ok(())
}

/// Runner provider backed by a local Docker daemon
#[derive(Debug, Clone)]
pub struct DockerClient {
    /// `name:tag` reference of the managed image
    image_ref: String,

    /// Resolved image ID, the managed runner image identity.
    /// None only when the provider is disabled.
    image_id: Option<String>,

    /// Whether the provider talks to a live daemon
    enabled: bool,
}

impl DockerClient {
    /// Initializes the provider, one time per process
    ///
    /// Builds or pulls the managed runner image according to the
    /// settings and resolves its image ID. Any failure here should be
    /// treated as fatal to process startup. A disabled provider skips
    /// all of it and comes up inert.
    pub fn initialize(settings: &DockerSettings) -> Result<Self, ProviderError> {
        let image_ref = settings.image_ref();

        if !settings.enabled {
            debug!("Docker provider disabled");
            return Ok(Self {
                image_ref,
                image_id: None,
                enabled: false,
            });
        }

        check_docker_available()?;

        if settings.build_image {
            debug!(
                "Building runner image {} from {} in {}",
                image_ref, settings.dockerfile, settings.build_path
            );
            build_image(settings)?;
        } else {
            debug!("Pulling runner image {}", image_ref);
            pull_image(&image_ref)?;
        }

        let image_id = inspect_image_id(&image_ref)?;

        debug!("Docker provider initialized");
        debug!("Runner image ID: {}", image_id);

        Ok(Self {
            image_ref,
            image_id: Some(image_id),
            enabled: true,
        })
    }

    /// The `name:tag` reference of the managed image
    pub fn image_ref(&self) -> &str {
        &self.image_ref
    }

    /// Whether the provider is live
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// IDs of currently running managed runner containers
    fn list_runners(&self) -> Result<Vec<String>, ProviderError> {
        let image_id = match &self.image_id {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let output = run_docker(&[
            "ps",
            "-q",
            "--no-trunc",
            "--filter",
            &format!("ancestor={image_id}"),
        ])?;
        check_status("docker ps", &output)?;

        Ok(parse_container_ids(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl RunnerProvider for DockerClient {
    fn count_runners(&self) -> Result<usize, ProviderError> {
        if !self.enabled {
            return Ok(0);
        }

        Ok(self.list_runners()?.len())
    }

    fn start_runner(&self, url: &str, token: &str) -> Result<(), ProviderError> {
        if !self.enabled {
            info!("Docker provider disabled, skipping runner launch for {url}");
            return Ok(());
        }

        let image = self
            .image_id
            .as_deref()
            .ok_or_else(|| ProviderError::ImageUnresolved(self.image_ref.clone()))?;

        let output = run_docker(&[
            "run",
            "-d",
            "--rm",
            "-e",
            &format!("URL={url}"),
            "-e",
            &format!("TOKEN={token}"),
            "-v",
            "/var/run/docker.sock:/var/run/docker.sock",
            image,
        ])?;
        check_status("docker run", &output)?;

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Started runner container {container_id} for {url}");

        Ok(())
    }
}

fn run_docker(args: &[&str]) -> Result<Output, ProviderError> {
    Command::new("docker")
        .args(args)
        .output()
        .map_err(|e| ProviderError::Unavailable(format!("failed to execute docker: {e}")))
}

/// Turns a failed command into a `CommandFailed` with its stderr
fn check_status(command: &str, output: &Output) -> Result<(), ProviderError> {
    if output.status.success() {
        return Ok(());
    }

    Err(ProviderError::CommandFailed {
        command: command.to_string(),
        exit_code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn build_image(settings: &DockerSettings) -> Result<(), ProviderError> {
    let image_ref = settings.image_ref();

    let mut args = vec![
        "build",
        "-t",
        image_ref.as_str(),
        "-f",
        settings.dockerfile.as_str(),
    ];
    if settings.no_cache {
        args.push("--no-cache");
    }
    args.push(settings.build_path.as_str());

    let output = run_docker(&args)?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!("docker build: {}", line.trim());
    }

    check_status("docker build", &output)
}

fn pull_image(image_ref: &str) -> Result<(), ProviderError> {
    let output = run_docker(&["pull", image_ref])?;
    check_status("docker pull", &output)
}

/// Resolves the image ID for a `name:tag` reference
fn inspect_image_id(image_ref: &str) -> Result<String, ProviderError> {
    let output = run_docker(&["image", "inspect", "--format", "{{.Id}}", image_ref])?;
    check_status("docker image inspect", &output)?;

    let image_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if image_id.is_empty() {
        return Err(ProviderError::ImageUnresolved(image_ref.to_string()));
    }

    Ok(image_id)
}

fn parse_container_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_client() -> DockerClient {
        let settings = DockerSettings {
            enabled: false,
            ..DockerSettings::default()
        };
        DockerClient::initialize(&settings).unwrap()
    }

    #[test]
    fn disabled_provider_counts_zero() {
        let client = disabled_client();
        assert!(!client.is_enabled());
        assert_eq!(client.count_runners().unwrap(), 0);
    }

    #[test]
    fn disabled_provider_skips_launch() {
        let client = disabled_client();
        client
            .start_runner("https://github.com/acme/widgets", "AABBCC")
            .unwrap();
    }

    #[test]
    fn parses_container_id_lines() {
        let stdout = "sha256:aaa\nsha256:bbb\n\n";
        assert_eq!(parse_container_ids(stdout), vec!["sha256:aaa", "sha256:bbb"]);
    }

    #[test]
    fn parses_empty_output() {
        assert!(parse_container_ids("").is_empty());
        assert!(parse_container_ids("\n").is_empty());
    }
}
