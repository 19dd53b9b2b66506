//! # Percentile Module.
//!
//! Rank-order percentiles over the non-anchor participants.
//!
//! Ties are resolved by position: equal scores keep identity order and each
//! gets the percentile of its own position, not an averaged rank.

use crate::participant::ParticipantId;
use std::collections::BTreeMap;

/// Percentile given to the only ranked participant.
pub const SINGLE_PARTICIPANT_PERCENTILE: u8 = 50;

/// Computes `round(position / (count - 1) * 100)` for every participant except
/// the anchor, ascending by score.
pub fn rank_percentiles(
	scores: &BTreeMap<ParticipantId, f64>, anchor: &ParticipantId,
) -> BTreeMap<ParticipantId, u8> {
	let mut ranked: Vec<(&ParticipantId, f64)> = scores
		.iter()
		.filter(|&(id, _)| id != anchor)
		.map(|(id, &score)| (id, score))
		.collect();

	// Stable, so ties stay in identity order
	ranked.sort_by(|(_, a), (_, b)| a.total_cmp(b));

	let count = ranked.len();
	if count == 1 {
		return ranked
			.into_iter()
			.map(|(id, _)| (id.clone(), SINGLE_PARTICIPANT_PERCENTILE))
			.collect();
	}

	let last = count.saturating_sub(1) as f64;
	ranked
		.into_iter()
		.enumerate()
		.map(|(position, (id, _))| {
			let percentile = (position as f64 / last * 100.0).round() as u8;
			(id.clone(), percentile)
		})
		.collect()
}
