//! # Overrides Module.
//!
//! Operator-pinned scores, applied to a finished computation to produce the
//! published view. The computed response is left untouched and pins are
//! never turned into allocations, so they cannot leak into the next run.

use crate::{
	error::TrustError, participant::ParticipantId, percentile::rank_percentiles,
	request::ComputeResponse,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manually pinned scores.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ScoreOverrides {
	pins: BTreeMap<ParticipantId, f64>,
}

/// One published score.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublishedScore {
	/// Final score.
	pub score: f64,
	/// Percentile, absent for the anchor.
	pub percentile: Option<u8>,
	/// Whether the score was pinned by an operator.
	pub overridden: bool,
}

/// Scores as handed to the persistence sink.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PublishedScores {
	/// Published entry per participant.
	pub entries: BTreeMap<ParticipantId, PublishedScore>,
}

impl ScoreOverrides {
	/// Constructs an empty set of overrides.
	pub fn new() -> Self {
		Self { pins: BTreeMap::new() }
	}

	/// Pins `participant` to `score`, replacing any earlier pin.
	pub fn pin(&mut self, participant: impl Into<ParticipantId>, score: f64) {
		self.pins.insert(participant.into(), score);
	}

	/// Removes a pin.
	pub fn unpin(&mut self, participant: &ParticipantId) -> Option<f64> {
		self.pins.remove(participant)
	}

	/// Number of pins.
	pub fn len(&self) -> usize {
		self.pins.len()
	}

	/// Whether there are no pins.
	pub fn is_empty(&self) -> bool {
		self.pins.is_empty()
	}

	/// Layers the pins over `response`.
	///
	/// Percentiles are re-ranked over the published scores. Pinning the
	/// anchor, a participant missing from the response, or a negative or
	/// non-finite score is rejected.
	pub fn apply(
		&self, response: &ComputeResponse, anchor: &ParticipantId,
	) -> Result<PublishedScores, TrustError> {
		for (participant, &score) in &self.pins {
			if participant == anchor {
				return Err(TrustError::ValidationError(format!(
					"The anchor '{}' cannot be overridden",
					participant
				)));
			}
			if !response.scores.contains_key(participant) {
				return Err(TrustError::ValidationError(format!(
					"No computed score for '{}'",
					participant
				)));
			}
			if !score.is_finite() || score < 0.0 {
				return Err(TrustError::ValidationError(format!(
					"Invalid override {} for '{}'",
					score, participant
				)));
			}
		}

		let scores: BTreeMap<ParticipantId, f64> = response
			.scores
			.iter()
			.map(|(id, &score)| (id.clone(), self.pins.get(id).copied().unwrap_or(score)))
			.collect();
		let percentiles = rank_percentiles(&scores, anchor);

		let entries = scores
			.into_iter()
			.map(|(id, score)| {
				let published = PublishedScore {
					score,
					percentile: percentiles.get(&id).copied(),
					overridden: self.pins.contains_key(&id),
				};
				(id, published)
			})
			.collect();

		if !self.is_empty() {
			info!("Applied {} score override(s)", self.len());
		}

		Ok(PublishedScores { entries })
	}
}
