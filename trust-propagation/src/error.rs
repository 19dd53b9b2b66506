//! # Error Module.
//!
//! This module features the `TrustError` enum for error handling throughout the project.

use thiserror::Error;

/// The crate-wide error variants.
#[derive(Debug, Error)]
pub enum TrustError {
	/// Configuration error
	#[error("ConfigurationError: {0}")]
	ConfigurationError(String),

	/// Score vector became non-finite during iteration
	#[error("DivergedComputation: non-finite score at iteration {iteration} for '{participant}'")]
	DivergedComputation {
		/// Iteration (1-based) at which the value was detected.
		iteration: usize,
		/// Participant holding the non-finite score.
		participant: String,
	},

	/// File read/write error
	#[error("FileIOError: {0}")]
	FileIOError(String),

	/// Invalid allocation weight or budget
	#[error("InvalidAllocation: {0}")]
	InvalidAllocation(String),

	/// Input/output error
	#[error("IOError: {0}")]
	IOError(std::io::Error),

	/// Anchor not present in the participant set
	#[error("MissingAnchor: '{0}' is not a participant")]
	MissingAnchor(String),

	/// Parsing error
	#[error("ParsingError: {0}")]
	ParsingError(String),

	/// Blocking task failed or was cancelled
	#[error("TaskError: {0}")]
	TaskError(String),

	/// Wall-clock timeout around a computation
	#[error("TimeoutError: computation exceeded {0} ms")]
	TimeoutError(u128),

	/// Allocation target not present in the participant set
	#[error("UnknownParticipant: '{target}' (allocated by '{from}')")]
	UnknownParticipant {
		/// Participant that made the allocation.
		from: String,
		/// Unknown target identity.
		target: String,
	},

	/// Validation error
	#[error("ValidationError: {0}")]
	ValidationError(String),
}
