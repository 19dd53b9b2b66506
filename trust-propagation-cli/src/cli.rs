//! # CLI Module.
//!
//! This module contains all CLI related data handling and conversions.

use crate::fs::{
	get_file_path, load_allocations, load_overrides, save_config, save_overrides,
	ClientConfig, FileType, ALLOCATIONS_FILENAME, SCORES_FILENAME,
};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use trust_propagation::{
	error::TrustError,
	participant::ParticipantId,
	request::{ComputeRequest, ComputeResponse},
	storage::{
		request_from_records, AllocationRecord, CSVFileStorage, JSONFileStorage, ScoreRecord,
		Storage,
	},
	TrustEngine,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Mode {
	/// Record an allocation. Requires 'AllocateData'.
	Allocate(AllocateData),
	/// Run a single computation from a request file. Requires 'ComputeData'.
	Compute(ComputeData),
	/// Pin or unpin a published score. Requires 'OverrideData'.
	Override(OverrideData),
	/// Calculate and publish the scores from the saved allocations.
	Scores,
	/// Display the current configuration.
	Show,
	/// Update the configuration. Requires 'UpdateData'.
	Update(UpdateData),
}

/// Allocation subcommand input.
#[derive(Args, Debug)]
pub struct AllocateData {
	/// Allocating participant.
	#[clap(long = "from")]
	from: Option<String>,
	/// Receiving participant.
	#[clap(long = "to")]
	to: Option<String>,
	/// Allocated weight, in budget units.
	#[clap(long = "weight")]
	weight: Option<String>,
}

/// Compute subcommand input.
#[derive(Args, Debug)]
pub struct ComputeData {
	/// Path to a JSON compute request.
	#[clap(long = "input")]
	input: Option<String>,
}

/// Override subcommand input.
#[derive(Args, Debug)]
pub struct OverrideData {
	/// Participant to pin.
	#[clap(long = "participant")]
	participant: Option<String>,
	/// Pinned score. Removes the pin when omitted.
	#[clap(long = "score")]
	score: Option<String>,
}

/// Configuration update subcommand input.
#[derive(Args, Debug)]
pub struct UpdateData {
	/// Decay factor, in (0, 1).
	#[clap(long = "alpha")]
	alpha: Option<String>,
	/// Pretrusted anchor participant.
	#[clap(long = "anchor")]
	anchor: Option<String>,
	/// Allocation budget.
	#[clap(long = "budget")]
	budget: Option<String>,
	/// Route each participant's own row to the anchor when scoring them (true, false). On by default.
	#[clap(long = "isolate")]
	isolate: Option<String>,
	/// Maximum number of iterations.
	#[clap(long = "max-iterations")]
	max_iterations: Option<String>,
	/// Convergence threshold.
	#[clap(long = "threshold")]
	threshold: Option<String>,
	/// Scores timeout in milliseconds, 0 to disable.
	#[clap(long = "timeout-ms")]
	timeout_ms: Option<String>,
}

impl AllocateData {
	pub fn to_record(&self) -> Result<AllocationRecord, TrustError> {
		let from = self
			.from
			.as_ref()
			.ok_or_else(|| TrustError::ValidationError("Missing source.".to_string()))?;
		let to = self
			.to
			.as_ref()
			.ok_or_else(|| TrustError::ValidationError("Missing target.".to_string()))?;

		// Parse weight
		let weight = self
			.weight
			.as_ref()
			.ok_or_else(|| TrustError::ValidationError("Missing weight.".to_string()))
			.and_then(|weight| {
				weight.parse::<f64>().map_err(|e| TrustError::ParsingError(e.to_string()))
			})?;

		if !weight.is_finite() || weight < 0.0 {
			return Err(TrustError::ValidationError(format!(
				"Weight must be a non-negative number, got {}.",
				weight
			)));
		}

		Ok(AllocationRecord::new(from.as_str(), to.as_str(), weight))
	}
}

/// Parses an optional flag value.
fn parse_flag<T: std::str::FromStr>(value: Option<String>) -> Result<Option<T>, TrustError>
where
	T::Err: std::fmt::Display,
{
	value.map(|v| v.parse::<T>().map_err(|e| TrustError::ParsingError(e.to_string()))).transpose()
}

/// Handles the `allocate` command.
pub fn handle_allocate(data: AllocateData) -> Result<(), TrustError> {
	let record = data.to_record()?;
	debug!("Allocating: {:?}", record);

	let mut records = load_allocations()?;
	records.push(record);

	let filepath = get_file_path(ALLOCATIONS_FILENAME, FileType::Csv)?;
	let mut storage = CSVFileStorage::<AllocationRecord>::new(filepath);
	storage.save(records)?;

	info!("Allocation saved at \"{}\".", storage.filepath().display());

	Ok(())
}

/// Handles the `compute` command.
pub async fn handle_compute(config: ClientConfig, data: ComputeData) -> Result<(), TrustError> {
	let input = data
		.input
		.ok_or_else(|| TrustError::ValidationError("Missing input file.".to_string()))?;
	let request = JSONFileStorage::<ComputeRequest>::new(PathBuf::from(input)).load()?;

	let timeout = config.timeout();
	let engine = TrustEngine::new(config.engine);
	let response = engine.compute_blocking(request, timeout).await?;

	let filepath = get_file_path("response", FileType::Json)?;
	let mut storage = JSONFileStorage::<ComputeResponse>::new(filepath);
	storage.save(response)?;

	info!("Response saved at \"{}\".", storage.filepath().display());

	Ok(())
}

/// Handles the `override` command.
pub fn handle_override(data: OverrideData) -> Result<(), TrustError> {
	let participant = data
		.participant
		.map(ParticipantId::new)
		.ok_or_else(|| TrustError::ValidationError("Missing participant.".to_string()))?;

	let mut overrides = load_overrides()?;
	match parse_flag::<f64>(data.score)? {
		Some(score) => {
			info!("Pinning {} to {}.", participant, score);
			overrides.pin(participant, score);
		},
		None => {
			if overrides.unpin(&participant).is_none() {
				return Err(TrustError::ValidationError(format!(
					"No override for '{}'.",
					participant
				)));
			}
			info!("Removed override for {}.", participant);
		},
	}

	save_overrides(overrides)
}

/// Handles the `scores` command.
pub async fn handle_scores(config: ClientConfig) -> Result<(), TrustError> {
	let records = load_allocations()?;

	// Verify there are allocations
	if records.is_empty() {
		return Err(TrustError::ValidationError("No allocations found.".to_string()));
	}

	let request = request_from_records(config.anchor_id.as_str(), records);
	let anchor = request.anchor_id.clone();

	// Calculate scores
	let timeout = config.timeout();
	let engine = TrustEngine::new(config.engine);
	let response = engine.compute_blocking(request, timeout).await?;

	// Layer the manual pins
	let published = load_overrides()?.apply(&response, &anchor)?;
	let score_records: Vec<ScoreRecord> = (&published).into();

	let scores_fp = get_file_path(SCORES_FILENAME, FileType::Csv)?;

	// Save scores
	let mut records_storage = CSVFileStorage::<ScoreRecord>::new(scores_fp);

	records_storage.save(score_records)?;

	info!(
		"Scores saved at \"{}\".",
		records_storage.filepath().display()
	);

	Ok(())
}

/// Handles the CLI project configuration update.
pub fn handle_update(config: &mut ClientConfig, data: UpdateData) -> Result<(), TrustError> {
	apply_update(config, data)?;
	save_config(config.clone())
}

/// Applies the update flags and validates the result.
fn apply_update(config: &mut ClientConfig, data: UpdateData) -> Result<(), TrustError> {
	if let Some(alpha) = parse_flag(data.alpha)? {
		config.engine.alpha = alpha;
	}

	if let Some(anchor) = data.anchor {
		if anchor.trim().is_empty() {
			return Err(TrustError::ValidationError("Empty anchor.".to_string()));
		}
		config.anchor_id = anchor;
	}

	if let Some(budget) = parse_flag(data.budget)? {
		config.engine.allocation_budget = budget;
	}

	if let Some(isolate) = parse_flag(data.isolate)? {
		config.engine.isolate_self_influence = isolate;
	}

	if let Some(max_iterations) = parse_flag(data.max_iterations)? {
		config.engine.max_iterations = max_iterations;
	}

	if let Some(threshold) = parse_flag(data.threshold)? {
		config.engine.convergence_threshold = threshold;
	}

	if let Some(timeout_ms) = parse_flag::<u64>(data.timeout_ms)? {
		config.timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
	}

	config.engine.validate()
}
