use serde::{Deserialize, Serialize};
use std::path::Path;
use config::{Config, ConfigError, Environment, File, Source};

/// Default config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "token-harness.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub runtime: RuntimeConfig,
    pub node: NodeConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub chain_id: u64,
    /// Per-call gas limit; calls exceeding it revert
    pub gas_limit: u64,
    /// Number of deterministic signer accounts
    pub signer_count: usize,
    pub signer_seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub api_port: u16,
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            gas_limit: 1_000_000,
            signer_count: 20,
            signer_seed: "token-harness".to_string(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            node: NodeConfig {
                api_port: 8545,
                db_path: "./harness_data".to_string(),
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 9090,
            },
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file (with optional environment variable overrides)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::layered(File::from(path.as_ref()))
    }

    /// Defaults, then `file`, then `HARNESS__` environment variables
    fn layered<S>(file: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            // e.g. HARNESS__RUNTIME__GAS_LIMIT=50000
            .add_source(
                Environment::with_prefix("HARNESS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration with CLI overrides
    pub fn load_with_overrides(
        config_file: Option<String>,
        api_port: Option<u16>,
        db_path: Option<String>,
        gas_limit: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::layered(File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false))?,
        };

        if let Some(port) = api_port {
            config.node.api_port = port;
        }
        if let Some(path) = db_path {
            config.node.db_path = path;
        }
        if let Some(limit) = gas_limit {
            config.runtime.gas_limit = limit;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, toml_string)
    }

    /// Validate configuration for sanity
    pub fn validate(&self) -> Result<(), String> {
        if self.runtime.gas_limit == 0 {
            return Err("Gas limit must be > 0".into());
        }
        if self.runtime.signer_count == 0 {
            return Err("At least one signer is required".into());
        }
        if self.runtime.signer_seed.is_empty() {
            return Err("Signer seed must not be empty".into());
        }
        if self.metrics.enabled && self.metrics.port == self.node.api_port {
            return Err("API port and metrics port must differ".into());
        }
        Ok(())
    }

    pub fn print_effective_config(&self) {
        tracing::info!("Runtime: chain_id={} gas_limit={} signers={}",
            self.runtime.chain_id, self.runtime.gas_limit, self.runtime.signer_count);
        tracing::info!("Node: api_port={} db_path={}", self.node.api_port, self.node.db_path);
        tracing::info!("Metrics: enabled={} port={}", self.metrics.enabled, self.metrics.port);
    }
}
