//! # Normalizer Module.
//!
//! Turns one participant's raw outgoing allocations into a stochastic row.
//!
//! Self-loops are removed before anything else is computed. A participant's
//! allocation to themselves therefore never enters the matrix, which is what
//! keeps their own previous-round score out of their next-round score.

use crate::{error::TrustError, participant::ParticipantId};
use log::warn;
use std::collections::BTreeMap;

/// Normalized outgoing trust of a single participant: `target -> probability`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedRow {
	entries: BTreeMap<ParticipantId, f64>,
}

impl NormalizedRow {
	/// Probability assigned to `target`, zero if absent.
	pub fn get(&self, target: &ParticipantId) -> f64 {
		self.entries.get(target).copied().unwrap_or(0.0)
	}

	/// Iterates the entries in target order.
	pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, f64)> {
		self.entries.iter().map(|(target, &p)| (target, p))
	}

	/// Sum of all probabilities.
	pub fn sum(&self) -> f64 {
		self.entries.values().sum()
	}

	/// Number of targets.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether the row has no targets.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Checks that every allocation weight is finite and non-negative.
pub fn validate_allocations(
	source: &ParticipantId, allocations: &BTreeMap<ParticipantId, f64>,
) -> Result<(), TrustError> {
	for (target, &weight) in allocations {
		if !weight.is_finite() || weight < 0.0 {
			return Err(TrustError::InvalidAllocation(format!(
				"'{}' -> '{}' has weight {}",
				source, target, weight
			)));
		}
	}

	Ok(())
}

/// Normalizes the outgoing allocations of `source` against `budget`.
///
/// Each remaining weight becomes `weight / budget`. A row that does not use
/// its whole budget sends the remainder to the anchor, and a row with nothing
/// left after self-loop removal goes entirely to the anchor. A row over budget
/// is rescaled to sum to one.
///
/// The anchor's own row gets no remainder routing, and an anchor without
/// allocations yields an empty row.
pub fn normalize_allocations(
	source: &ParticipantId, allocations: &BTreeMap<ParticipantId, f64>, anchor: &ParticipantId,
	budget: f64,
) -> Result<NormalizedRow, TrustError> {
	if !(budget.is_finite() && budget > 0.0) {
		return Err(TrustError::InvalidAllocation(format!(
			"'{}' has budget {}",
			source, budget
		)));
	}
	validate_allocations(source, allocations)?;

	let is_anchor = source == anchor;

	// Self-loops go before the total is taken
	let outgoing: Vec<(&ParticipantId, f64)> = allocations
		.iter()
		.filter(|&(target, &weight)| target != source && weight > 0.0)
		.map(|(target, &weight)| (target, weight))
		.collect();

	let total: f64 = outgoing.iter().map(|(_, weight)| weight).sum();
	if total == 0.0 {
		let mut entries = BTreeMap::new();
		if !is_anchor {
			entries.insert(anchor.clone(), 1.0);
		}
		return Ok(NormalizedRow { entries });
	}

	let mut entries: BTreeMap<ParticipantId, f64> =
		outgoing.into_iter().map(|(target, weight)| (target.clone(), weight / budget)).collect();

	let allocated: f64 = entries.values().sum();
	if allocated > 1.0 {
		warn!(
			"'{}' allocated {:.4} of its budget, rescaling to 1",
			source, allocated
		);
		entries.values_mut().for_each(|p| *p /= allocated);
	} else if allocated < 1.0 && !is_anchor {
		*entries.entry(anchor.clone()).or_insert(0.0) += 1.0 - allocated;
	}

	Ok(NormalizedRow { entries })
}
