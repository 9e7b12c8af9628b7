//! Engine configuration
//!
//! `asynchronous` selects how deferred keyword results are handled:
//! rejected as errors in synchronous mode, awaited concurrently in
//! asynchronous mode.

use serde::{Deserialize, Serialize};

/// Default limit on schema nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Evaluation mode of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every validator must answer immediately
    Synchronous,
    /// Validators may return deferred results
    Asynchronous,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Synchronous => write!(f, "synchronous"),
            Mode::Asynchronous => write!(f, "asynchronous"),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Allow and await deferred keyword results
    pub asynchronous: bool,

    /// Maximum nesting of schemas inside schemas
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asynchronous: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            asynchronous: std::env::var("SCHEMAV_ASYNC")
                .map(|v| v.parse().unwrap_or(false))
                .unwrap_or(false),
            max_depth: std::env::var("SCHEMAV_MAX_DEPTH")
                .map(|v| v.parse().unwrap_or(DEFAULT_MAX_DEPTH))
                .unwrap_or(DEFAULT_MAX_DEPTH),
        }
    }

    /// Shorthand for an asynchronous configuration
    pub fn asynchronous() -> Self {
        Self {
            asynchronous: true,
            ..Self::default()
        }
    }

    /// The evaluation mode selected by this config
    pub fn mode(&self) -> Mode {
        if self.asynchronous {
            Mode::Asynchronous
        } else {
            Mode::Synchronous
        }
    }
}

/// Builder for engine configuration
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Select asynchronous mode
    pub fn asynchronous(mut self, enabled: bool) -> Self {
        self.config.asynchronous = enabled;
        self
    }

    /// Set the nesting limit
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Build the configuration
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
