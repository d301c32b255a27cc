//! Docker provider settings
//!
//! Controls whether the provider is live, and where the managed runner
//! image comes from (built from a local context or pulled by name).

/// Settings for the Docker runner provider
#[derive(Debug, Clone)]
pub struct DockerSettings {
    /// Whether the provider talks to a live Docker daemon at all.
    /// When false the provider is inert: counts are zero and launches
    /// are skipped, which lets the rest of the service run without a
    /// runtime dependency.
    pub enabled: bool,

    /// Build the runner image from `build_path` + `dockerfile` at
    /// startup; when false the image is pulled instead
    pub build_image: bool,

    /// Build context directory
    pub build_path: String,

    /// Path to the runner dockerfile
    pub dockerfile: String,

    /// Name of the managed runner image
    pub image_name: String,

    /// Tag of the managed runner image
    pub image_tag: String,

    /// Disable the build cache when building
    pub no_cache: bool,
}

impl DockerSettings {
    /// Creates settings from environment variables
    ///
    /// Recognized variables, all optional:
    /// - DOCKER_ENABLED (default: true)
    /// - BUILD_IMAGE (default: true)
    /// - BUILD_PATH (default: /app)
    /// - RUNNER_DOCKERFILE (default: /app/devstack/runner.dockerfile)
    /// - RUNNER_IMAGE (default: runner)
    /// - RUNNER_TAG (default: latest)
    /// - NO_CACHE (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_bool("DOCKER_ENABLED", defaults.enabled),
            build_image: env_bool("BUILD_IMAGE", defaults.build_image),
            build_path: env_string("BUILD_PATH", defaults.build_path),
            dockerfile: env_string("RUNNER_DOCKERFILE", defaults.dockerfile),
            image_name: env_string("RUNNER_IMAGE", defaults.image_name),
            image_tag: env_string("RUNNER_TAG", defaults.image_tag),
            no_cache: env_bool("NO_CACHE", defaults.no_cache),
        }
    }

    /// The `name:tag` reference of the managed runner image
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image_name, self.image_tag)
    }
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            build_image: true,
            build_path: "/app".to_string(),
            dockerfile: "/app/devstack/runner.dockerfile".to_string(),
            image_name: "runner".to_string(),
            image_tag: "latest".to_string(),
            no_cache: false,
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<bool>().ok())
        .unwrap_or(default)
}
