//! Dispatch configuration.
//!
//! ```toml
//! max-sends = 20
//! ```

use serde::Deserialize;
use thiserror::Error;

/// Send budget used when nothing else is configured.
pub const DEFAULT_MAX_SENDS: u32 = 20;

/// Errors that can occur when loading a [`DispatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML document could not be parsed into a config.
	#[error("invalid dispatch config: {0}")]
	Toml(#[from] toml::de::Error),

	/// A session must be allowed at least its initial send.
	#[error("max-sends must be at least 1")]
	ZeroBudget,
}

/// Per-dispatcher configuration shared by all of its sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DispatchConfig {
	/// Maximum number of transport sends per session, including the initial one.
	pub max_sends: u32,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			max_sends: DEFAULT_MAX_SENDS,
		}
	}
}

impl DispatchConfig {
	/// Parses and validates a config from TOML. Missing fields take defaults.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(src)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects configs no session could satisfy.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_sends == 0 {
			return Err(ConfigError::ZeroBudget);
		}
		Ok(())
	}
}
