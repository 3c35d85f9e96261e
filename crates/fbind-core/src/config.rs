#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! Configuration is loaded from TOML and installed per thread (the engine is
//! single-threaded; every thread that drives bindings owns its own settings).
//!
//! ```
//! use fbind_core::{DepthPolicy, EngineConfig};
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     max_dispatch_depth = 64
//!     on_depth_exceeded = "panic"
//! "#).unwrap();
//! assert_eq!(config.max_dispatch_depth, 64);
//! assert_eq!(config.on_depth_exceeded, DepthPolicy::Panic);
//! ```

use std::cell::RefCell;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do when nested dispatch exceeds [`EngineConfig::max_dispatch_depth`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Apply the mutation without notifying listeners and log a warning.
    #[default]
    Skip,
    /// Panic. Useful in tests to surface unguarded listener cycles.
    Panic,
}

/// Settings for the change-notification engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngineConfig {
    /// Maximum number of nested content/property dispatches on one thread.
    pub max_dispatch_depth: usize,
    pub on_depth_exceeded: DepthPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 256,
            on_depth_exceeded: DepthPolicy::Skip,
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<EngineConfig> = RefCell::new(EngineConfig::default());
}

impl EngineConfig {
    /// Parse configuration from a TOML string. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dispatch_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_dispatch_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Install this configuration for the current thread, returning the previous one.
    pub fn install(self) -> Self {
        tracing::debug!(
            max_dispatch_depth = self.max_dispatch_depth,
            policy = ?self.on_depth_exceeded,
            "installing engine config"
        );
        ACTIVE.with(|active| active.replace(self))
    }
}

/// The configuration active on the current thread.
#[must_use]
pub fn current() -> EngineConfig {
    ACTIVE.with(|active| active.borrow().clone())
}
