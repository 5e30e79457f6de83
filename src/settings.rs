//! Headless settings (`config` crate).
//!
//! Sources, lowest precedence first:
//!
//! | source                 | example                                  |
//! |------------------------|------------------------------------------|
//! | built-in defaults      | `send_rate_hz = 20`                      |
//! | optional TOML file     | `[bridge]\nsend_rate_hz = 30`            |
//! | `SPACES_*` environment | `SPACES_BRIDGE__SEND_RATE_HZ=30`         |
//!
//! Command-line flags are applied on top by the replay binary.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BridgeResult;
use crate::spaces::SpacesConfig;
use crate::types::{BridgeConfig, IngressConfig};

pub const ENV_PREFIX: &str = "SPACES";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bridge: BridgeConfig,
    pub ingress: IngressConfig,
    /// Texture request timeout in milliseconds. `None` leaves it to the
    /// transport.
    pub load_timeout_ms: Option<u64>,
    /// Simulated render frame rate.
    pub frame_rate_hz: f32,
    /// Extra simulated time after the last recorded line.
    pub tail_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            ingress: IngressConfig::default(),
            load_timeout_ms: None,
            frame_rate_hz: 60.0,
            tail_ms: 500,
        }
    }
}

impl Settings {
    /// Load defaults, then `file` (if given and present), then the
    /// environment.
    pub fn load(file: Option<&Path>) -> BridgeResult<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        let settings: Settings = builder.build()?.try_deserialize()?;
        log::debug!("[settings] {:?}", settings);
        Ok(settings)
    }

    pub fn frame_dt(&self) -> f32 {
        if self.frame_rate_hz > 0.0 {
            1.0 / self.frame_rate_hz
        } else {
            1.0 / 60.0
        }
    }

    pub fn spaces_config(&self) -> SpacesConfig {
        SpacesConfig {
            bridge: self.bridge.clone(),
            ingress: self.ingress.clone(),
            load_timeout: self.load_timeout_ms.map(Duration::from_millis),
        }
    }
}
