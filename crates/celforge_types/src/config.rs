//! Engine configuration.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `CELFORGE_*` environment variables.
//!
//! ```toml
//! canvas_width = 64
//! canvas_height = 64
//! default_frame_duration_ms = 83
//! append_missing_colors = true
//! ```

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{error::CelError, timeline::DEFAULT_FRAME_DURATION_MS};

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Canvas width in pixels
	pub canvas_width: u32,
	/// Canvas height in pixels
	pub canvas_height: u32,
	/// Duration given to new frames
	pub default_frame_duration_ms: u32,
	/// Whether encoding RGBA edits appends unseen colours to the palette
	pub append_missing_colors: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			canvas_width: 64,
			canvas_height: 64,
			default_frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
			append_missing_colors: false,
		}
	}
}

impl EngineConfig {
	/// Prefix of the environment variables that override settings
	pub const ENV_PREFIX: &'static str = "CELFORGE";

	/// Creates a default configuration with the given canvas size.
	pub fn with_canvas(width: u32, height: u32) -> Self {
		Self {
			canvas_width: width,
			canvas_height: height,
			..Self::default()
		}
	}

	/// Loads defaults, the optional TOML file at `path`, then environment overrides.
	///
	/// # Errors
	///
	/// Returns [`CelError::Config`] if the file cannot be read or a value is
	/// invalid.
	pub fn load(path: Option<&Path>) -> Result<Self, CelError> {
		let mut builder = Config::builder();
		if let Some(path) = path {
			builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
		}
		builder = builder.add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true));

		let config: Self = builder.build()?.try_deserialize()?;
		config.validated()
	}

	/// Parses a TOML document on top of the defaults.
	pub fn from_toml_str(text: &str) -> Result<Self, CelError> {
		let config: Self = Config::builder().add_source(File::from_str(text, FileFormat::Toml)).build()?.try_deserialize()?;
		config.validated()
	}

	fn validated(self) -> Result<Self, CelError> {
		if self.canvas_width == 0 || self.canvas_height == 0 {
			return Err(config::ConfigError::Message(format!(
				"canvas must not be empty, got {}x{}",
				self.canvas_width, self.canvas_height
			))
			.into());
		}
		Ok(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = EngineConfig::default();
		assert_eq!(config.default_frame_duration_ms, 100);
		assert!(!config.append_missing_colors);
	}

	#[test]
	fn test_partial_toml_keeps_defaults() {
		let config = EngineConfig::from_toml_str("canvas_width = 32\nappend_missing_colors = true\n").unwrap();
		assert_eq!(config.canvas_width, 32);
		assert_eq!(config.canvas_height, 64);
		assert!(config.append_missing_colors);
	}

	#[test]
	fn test_rejects_empty_canvas() {
		let result = EngineConfig::from_toml_str("canvas_height = 0");
		assert!(matches!(result, Err(CelError::Config(_))));
	}

	#[test]
	fn test_load_file() {
		let path = std::env::temp_dir().join(format!("celforge-config-{}.toml", std::process::id()));
		std::fs::write(&path, "canvas_width = 16\ncanvas_height = 8\ndefault_frame_duration_ms = 40\n").unwrap();

		let config = EngineConfig::load(Some(&path)).unwrap();
		std::fs::remove_file(&path).unwrap();

		assert_eq!((config.canvas_width, config.canvas_height), (16, 8));
		assert_eq!(config.default_frame_duration_ms, 40);
	}

	#[test]
	fn test_load_missing_file_fails() {
		let path = std::env::temp_dir().join("celforge-config-does-not-exist.toml");
		assert!(EngineConfig::load(Some(&path)).is_err());
	}
}
