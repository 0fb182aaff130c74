use anyhow::{Context, ensure};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub public_endpoint: PublicEndpoint,
    #[serde(default)]
    pub downloads: Downloads,
    #[serde(default)]
    pub generation: Generation,
    #[serde(default)]
    pub registry: Registry,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let generation = &self.generation;
        ensure!(
            (1..=MAX_STEPS).contains(&generation.steps),
            "generation.steps must lie in [1, {MAX_STEPS}], got {}",
            generation.steps
        );
        ensure!(
            (0.0..=MAX_TIME_SCALE).contains(&generation.time_scale),
            "generation.time_scale must lie in [0, {MAX_TIME_SCALE}], got {}",
            generation.time_scale
        );
        if let Some(step) = generation.fail_at_step {
            ensure!(
                (1..=generation.steps).contains(&step),
                "generation.fail_at_step must lie in [1, {}], got {step}",
                generation.steps
            );
        }
        ensure!(
            (0.0..=1.0).contains(&generation.failure_rate),
            "generation.failure_rate must lie in [0, 1], got {}",
            generation.failure_rate
        );
        ensure!(
            generation.max_prompt_chars > 0,
            "generation.max_prompt_chars must be at least 1"
        );
        ensure!(
            self.registry.sweep_interval_secs > 0,
            "registry.sweep_interval_secs must be at least 1"
        );
        if let Some(secs) = self.registry.retention_secs {
            ensure!(
                secs <= MAX_RETENTION_SECS,
                "registry.retention_secs must be at most {MAX_RETENTION_SECS}, got {secs}"
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            http: HttpConfig::default(),
            public_endpoint: PublicEndpoint::default(),
            downloads: Downloads::default(),
            generation: Generation::default(),
            registry: Registry::default(),
        }
    }
}

fn default_version() -> u32 {
    1
}

const MAX_STEPS: u32 = 1000;
const MAX_TIME_SCALE: f64 = 1000.0;
/// ten years
const MAX_RETENTION_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Value of `Access-Control-Allow-Origin`; CORS headers are omitted when unset.
    #[serde(default = "default_cors_allow_origin")]
    pub cors_allow_origin: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            cors_allow_origin: default_cors_allow_origin(),
        }
    }
}

fn default_cors_allow_origin() -> Option<String> {
    Some("*".to_string())
}

/// Address under which clients reach this service.
///
/// Download urls are relative when no base url is configured.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PublicEndpoint {
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Downloads {
    #[serde(default)]
    pub in_memory: bool,
    #[serde(default = "default_downloads_dir")]
    pub dir: PathBuf,
}

impl Default for Downloads {
    fn default() -> Self {
        Self {
            in_memory: false,
            dir: default_downloads_dir(),
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Generation {
    /// Number of progress increments per simulated generation.
    pub steps: u32,
    /// Multiplier applied to the estimated processing time; 0 finishes immediately.
    pub time_scale: f64,
    /// Probability that a simulation fails before reaching 100%.
    pub failure_rate: f64,
    /// Fail every simulation right before this step; takes precedence over `failure_rate`.
    pub fail_at_step: Option<u32>,
    pub max_prompt_chars: usize,
}

impl Default for Generation {
    fn default() -> Self {
        Self {
            steps: 10,
            time_scale: 1.0,
            failure_rate: 0.0,
            fail_at_step: None,
            max_prompt_chars: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Registry {
    /// How long finished tracks are kept. Tracks live for the whole process when unset.
    pub retention_secs: Option<u64>,
    pub sweep_interval_secs: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            retention_secs: None,
            sweep_interval_secs: 60,
        }
    }
}
