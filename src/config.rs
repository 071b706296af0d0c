//! Gateway configuration files.
//!
//! ```toml
//! addresses = ["127.0.0.1:9092"]
//! datasets = ["scholars"]
//!
//! client_id = "admin"
//! hosts = ["127.0.0.2"]
//! port = 9093
//! required_acks = 1
//! ```
//!
//! `addresses` and `datasets` are read here; every other key is handed to
//! [`Gateway::new`] as an option.

use crate::gateway::Gateway;
use anyhow::Context;
use dataset_attributes::AttributeMap;
use kafka_session::Connector;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GatewayConfig {
    /// Positional `host[:port]` broker lines.
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Topics registered as datasets at startup.
    #[serde(default)]
    pub datasets: Vec<String>,

    #[serde(flatten)]
    pub options: AttributeMap,
}

impl GatewayConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse gateway configuration")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Set an option, replacing the file's value.
    pub fn set_option(&mut self, name: &str, value: impl Into<Value>) {
        self.options.insert(name.to_string(), value.into());
    }

    /// Build the gateway and register the configured datasets.
    pub fn build(&self, connector: Arc<dyn Connector>) -> anyhow::Result<Gateway> {
        let mut gateway = Gateway::new(self.addresses.iter().cloned(), &self.options, connector)
            .context("Failed to create gateway")?;
        for topic in &self.datasets {
            gateway
                .dataset(topic)
                .with_context(|| format!("Failed to register dataset {topic}"))?;
        }
        Ok(gateway)
    }
}
