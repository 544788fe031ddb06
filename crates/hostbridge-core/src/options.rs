//! Adapter tunables.

use serde::{Deserialize, Serialize};

/// Data-shaped adapter configuration.
///
/// Everything code-shaped (the handler, plugins, fallback factories)
/// lives on the adapter builder instead; these are the few knobs hosts
/// may want to load from a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// Scheme used when synthesizing an absolute URL for a host that
    /// supplies none.
    #[serde(default = "default_scheme")]
    pub default_scheme: String,

    /// Authority used when neither the host nor a `host` header names
    /// one.
    #[serde(default = "default_authority")]
    pub default_authority: String,

    /// How many unconsumed chunks the push→pull bridge buffers before
    /// the upstream source is paused.
    #[serde(default = "default_bridge_capacity")]
    pub bridge_capacity: usize,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_authority() -> String {
    "localhost".to_string()
}

fn default_bridge_capacity() -> usize {
    1
}

impl Default for AdapterOptions {
    fn default() -> Self {
        AdapterOptions {
            default_scheme: default_scheme(),
            default_authority: default_authority(),
            bridge_capacity: default_bridge_capacity(),
        }
    }
}

impl AdapterOptions {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let options: AdapterOptions = toml::from_str(content)?;
        Ok(options)
    }
}
