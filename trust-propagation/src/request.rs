//! # Request Module.
//!
//! Request and response shapes of a computation run, independent of
//! transport. Both serialize with camelCase keys.

use crate::participant::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw allocations: `source -> { target -> weight }`.
pub type AllocationGraph = BTreeMap<ParticipantId, BTreeMap<ParticipantId, f64>>;

/// A computation request.
///
/// The keys of `graph` form the participant set of the run; a participant
/// without outgoing allocations is present with an empty map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputeRequest {
	/// Decay factor override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alpha: Option<f64>,
	/// Iteration cap override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_iterations: Option<usize>,
	/// Convergence threshold override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub convergence_threshold: Option<f64>,
	/// Default allocation budget override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub allocation_budget: Option<f64>,
	/// Self-influence isolation override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub isolate_self_influence: Option<bool>,
	/// Per-participant allocation budgets.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub budgets: BTreeMap<ParticipantId, f64>,
	/// Raw allocations.
	#[serde(default)]
	pub graph: AllocationGraph,
	/// The pretrusted participant.
	pub anchor_id: ParticipantId,
}

impl ComputeRequest {
	/// Constructs an empty request around an anchor.
	pub fn new(anchor_id: impl Into<ParticipantId>) -> Self {
		Self {
			alpha: None,
			max_iterations: None,
			convergence_threshold: None,
			allocation_budget: None,
			isolate_self_influence: None,
			budgets: BTreeMap::new(),
			graph: AllocationGraph::new(),
			anchor_id: anchor_id.into(),
		}
	}

	/// Registers a participant without touching its allocations.
	pub fn add_participant(&mut self, id: impl Into<ParticipantId>) {
		self.graph.entry(id.into()).or_default();
	}

	/// Adds an allocation, summing it into any existing weight for the same pair.
	///
	/// Only `source` is registered as a participant; the target must be
	/// registered separately.
	pub fn add_allocation(
		&mut self, source: impl Into<ParticipantId>, target: impl Into<ParticipantId>, weight: f64,
	) {
		let row = self.graph.entry(source.into()).or_default();
		*row.entry(target.into()).or_insert(0.0) += weight;
	}

	/// Number of participants in the snapshot.
	pub fn participant_count(&self) -> usize {
		self.graph.len()
	}
}

/// A computation response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResponse {
	/// Global trust score per participant, anchor included.
	pub scores: BTreeMap<ParticipantId, f64>,
	/// Percentile per non-anchor participant.
	pub percentiles: BTreeMap<ParticipantId, u8>,
	/// Number of iterations performed.
	pub iterations: usize,
	/// Whether the solver reached the convergence threshold.
	pub converged: bool,
	/// Wall-clock duration of the run.
	pub elapsed_ms: u64,
}

impl ComputeResponse {
	/// Response for a snapshot with no participants.
	pub fn empty() -> Self {
		Self {
			scores: BTreeMap::new(),
			percentiles: BTreeMap::new(),
			iterations: 0,
			converged: true,
			elapsed_ms: 0,
		}
	}
}
