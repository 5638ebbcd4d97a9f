//! Shared helper functions used across CLI subcommands.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

pub fn load_runtime_config(path: Option<&str>) -> anyhow::Result<agentcore_agent::RuntimeConfig> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("failed to read {path}: {e}"))?;
            agentcore_agent::RuntimeConfig::from_toml_str(&contents).map_err(|e| anyhow::anyhow!("failed to parse {path}: {e}"))
        }
        None => Ok(agentcore_agent::RuntimeConfig::default()),
    }
}
