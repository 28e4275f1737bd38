//! Error types for the cel engine.
//!
//! Most store operations report structural rejection through `Option`/`bool`
//! results. `CelError` covers the cases that carry a reason: buffer dimension
//! checks, configuration loading and snapshot restoration.

use thiserror::Error;

/// Errors produced by the cel engine
#[derive(Debug, Error)]
pub enum CelError {
	/// Buffer length does not match the canvas dimensions
	#[error("Dimension mismatch: expected {expected} pixels, got {actual}")]
	DimensionMismatch {
		/// Expected number of pixels (`width * height`)
		expected: usize,
		/// Actual number of entries in the buffer
		actual: usize,
	},

	/// Colour string could not be parsed
	#[error("Invalid colour: {0:?}")]
	InvalidColor(String),

	/// Cel key string could not be parsed
	#[error("Invalid cel key: {0:?}")]
	InvalidCelKey(String),

	/// Snapshot is internally inconsistent
	#[error("Invalid snapshot: {0}")]
	InvalidSnapshot(String),

	/// Configuration could not be loaded
	#[error(transparent)]
	Config(#[from] config::ConfigError),
}
