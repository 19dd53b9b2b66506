//! # Filesystem Actions Module.
//!
//! This module provides functionalities for filesystem actions.

use log::warn;
use serde::{Deserialize, Serialize};
use std::{env::current_dir, path::PathBuf, time::Duration};
use trust_propagation::{
	config::EngineConfig,
	error::TrustError,
	overrides::ScoreOverrides,
	storage::{AllocationRecord, CSVFileStorage, JSONFileStorage, Storage},
};

/// CLI configuration file name.
pub const CONFIG_FILENAME: &str = "config";
/// Allocations file name.
pub const ALLOCATIONS_FILENAME: &str = "allocations";
/// Score overrides file name.
pub const OVERRIDES_FILENAME: &str = "overrides";
/// Published scores file name.
pub const SCORES_FILENAME: &str = "scores";

/// Enum representing the possible file extensions.
pub enum FileType {
	/// CSV file.
	Csv,
	/// JSON file.
	Json,
}

impl FileType {
	/// Converts the enum variant into its corresponding file extension.
	fn as_str(&self) -> &'static str {
		match self {
			FileType::Csv => "csv",
			FileType::Json => "json",
		}
	}
}

/// Persisted CLI configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	/// Pretrusted participant seeding every computation.
	pub anchor_id: String,
	/// Wall-clock limit for `scores` and `compute`, in milliseconds. Zero means none.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
	/// Engine defaults.
	#[serde(default)]
	pub engine: EngineConfig,
}

impl ClientConfig {
	/// Drops a zero timeout, which means no limit.
	pub fn normalized(mut self) -> Self {
		self.timeout_ms = self.timeout_ms.filter(|&ms| ms > 0);
		self
	}

	/// Wall-clock limit for a computation, if any.
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_ms.filter(|&ms| ms > 0).map(Duration::from_millis)
	}
}

/// Retrieves the path to the `assets` directory.
pub fn get_assets_path() -> Result<PathBuf, TrustError> {
	current_dir().map_err(TrustError::IOError).map(|current_dir| {
		// Workaround for the tests running in the crate directory.
		#[cfg(test)]
		{
			current_dir.join("assets")
		}

		#[cfg(not(test))]
		{
			current_dir.join("trust-propagation-cli/assets")
		}
	})
}

/// Helper function to get the path of a file in the `assets` directory.
pub fn get_file_path(file_name: &str, file_type: FileType) -> Result<PathBuf, TrustError> {
	let assets_path = get_assets_path()?;
	Ok(assets_path.join(format!("{}.{}", file_name, file_type.as_str())))
}

/// Loads the configuration file.
pub fn load_config() -> Result<ClientConfig, TrustError> {
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	JSONFileStorage::<ClientConfig>::new(filepath).load().map(ClientConfig::normalized)
}

/// Saves the configuration file.
pub fn save_config(config: ClientConfig) -> Result<(), TrustError> {
	let filepath = get_file_path(CONFIG_FILENAME, FileType::Json)?;
	JSONFileStorage::<ClientConfig>::new(filepath).save(config)
}

/// Loads the saved allocations, or none if the file does not exist yet.
pub fn load_allocations() -> Result<Vec<AllocationRecord>, TrustError> {
	let filepath = get_file_path(ALLOCATIONS_FILENAME, FileType::Csv)?;
	if !filepath.exists() {
		warn!("No allocations file at \"{}\".", filepath.display());
		return Ok(Vec::new());
	}

	CSVFileStorage::<AllocationRecord>::new(filepath).load()
}

/// Loads the score overrides, or an empty set if the file does not exist.
pub fn load_overrides() -> Result<ScoreOverrides, TrustError> {
	let filepath = get_file_path(OVERRIDES_FILENAME, FileType::Json)?;
	if !filepath.exists() {
		return Ok(ScoreOverrides::new());
	}

	JSONFileStorage::<ScoreOverrides>::new(filepath).load()
}

/// Saves the score overrides.
pub fn save_overrides(overrides: ScoreOverrides) -> Result<(), TrustError> {
	let filepath = get_file_path(OVERRIDES_FILENAME, FileType::Json)?;
	JSONFileStorage::<ScoreOverrides>::new(filepath).save(overrides)
}
