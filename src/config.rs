//! Operator configuration loaded from the environment

use crate::error::{Error, Result};

/// Default port for the metrics and health server
pub const DEFAULT_METRICS_PORT: u16 = 8080;

const METRICS_PORT_VAR: &str = "METRICS_PORT";
const WATCH_NAMESPACE_VAR: &str = "WATCH_NAMESPACE";

/// Runtime configuration for the operator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Port the metrics/health server listens on
    pub metrics_port: u16,
    /// Namespace to watch; None watches all namespaces
    pub watch_namespace: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            watch_namespace: None,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let metrics_port = match lookup(METRICS_PORT_VAR) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                Error::config(format!("Invalid {} '{}': {}", METRICS_PORT_VAR, raw, e))
            })?,
            None => DEFAULT_METRICS_PORT,
        };

        let watch_namespace = lookup(WATCH_NAMESPACE_VAR)
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        Ok(Self {
            metrics_port,
            watch_namespace,
        })
    }
}
