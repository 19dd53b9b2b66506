//! # Matrix Module.
//!
//! Assembles normalized rows into the square transition matrix `C`, where
//! `C[i][j]` is participant `i`'s normalized trust in participant `j`.

use crate::{
	config::EngineConfig,
	error::TrustError,
	normalizer::{normalize_allocations, NormalizedRow},
	participant::{ParticipantId, ParticipantIndex},
	request::ComputeRequest,
};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Dense row-major trust matrix with the anchor column forced to zero.
///
/// Mass a row sends to the anchor is kept in `anchor_mass` instead of the
/// anchor column, so `row_sum(i) + anchor_mass(i) == 1` for every non-anchor
/// row.
#[derive(Clone, Debug, PartialEq)]
pub struct TrustMatrix {
	index: ParticipantIndex,
	anchor: usize,
	rows: Vec<Vec<f64>>,
	anchor_mass: Vec<f64>,
}

impl TrustMatrix {
	/// Assembles the matrix from normalized rows.
	///
	/// Participants without a row are treated as sending everything to the
	/// anchor. An anchor with an empty row spreads its trust uniformly over
	/// every other participant.
	pub fn from_rows(
		index: ParticipantIndex, anchor: &ParticipantId,
		rows: &BTreeMap<ParticipantId, NormalizedRow>,
	) -> Result<Self, TrustError> {
		let anchor_pos =
			index.position(anchor).ok_or_else(|| TrustError::MissingAnchor(anchor.to_string()))?;
		let n = index.len();

		let mut matrix = vec![vec![0.0; n]; n];
		let mut anchor_mass = vec![0.0; n];

		for (i, source) in index.ids().iter().enumerate() {
			let row = match rows.get(source) {
				Some(row) => row,
				None => {
					if i != anchor_pos {
						anchor_mass[i] = 1.0;
					}
					continue;
				},
			};

			for (target, p) in row.iter() {
				let j = index.position(target).ok_or_else(|| TrustError::UnknownParticipant {
					from: source.to_string(),
					target: target.to_string(),
				})?;

				// Nobody trusts into the anchor
				if j == anchor_pos {
					anchor_mass[i] += p;
				} else {
					matrix[i][j] += p;
				}
			}
		}

		let anchor_row_empty = rows.get(anchor).map_or(true, NormalizedRow::is_empty);
		if anchor_row_empty && n > 1 {
			let share = 1.0 / (n - 1) as f64;
			for j in (0..n).filter(|&j| j != anchor_pos) {
				matrix[anchor_pos][j] = share;
			}
		}

		Ok(Self { index, anchor: anchor_pos, rows: matrix, anchor_mass })
	}

	/// Number of participants.
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	/// Whether the matrix has no participants.
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Index of the anchor.
	pub fn anchor_index(&self) -> usize {
		self.anchor
	}

	/// The identity/index table.
	pub fn index(&self) -> &ParticipantIndex {
		&self.index
	}

	/// `C[i][j]`.
	pub fn get(&self, i: usize, j: usize) -> f64 {
		self.rows[i][j]
	}

	/// Row `i` of the matrix.
	pub fn row(&self, i: usize) -> &[f64] {
		&self.rows[i]
	}

	/// Sum of row `i`.
	pub fn row_sum(&self, i: usize) -> f64 {
		self.rows[i].iter().sum()
	}

	/// Mass row `i` routed to the anchor.
	pub fn anchor_mass(&self, i: usize) -> f64 {
		self.anchor_mass[i]
	}

	/// Computes `transpose(C) . t`.
	pub fn transpose_mul(&self, t: &[f64]) -> Vec<f64> {
		let n = self.len();
		let mut out = vec![0.0; n];
		for i in 0..n {
			let t_i = t[i];
			if t_i == 0.0 {
				continue;
			}
			for j in 0..n {
				out[j] += self.rows[i][j] * t_i;
			}
		}
		out
	}

	/// Copy of the matrix with row `i` routed entirely to the anchor.
	pub fn with_row_routed_to_anchor(&self, i: usize) -> Self {
		let mut isolated = self.clone();
		if i != self.anchor {
			isolated.rows[i].iter_mut().for_each(|c| *c = 0.0);
			isolated.anchor_mass[i] = 1.0;
		}
		isolated
	}
}

/// Validates the request snapshot and builds its trust matrix.
///
/// Fails with `MissingAnchor` before looking at any allocation, then with
/// `InvalidAllocation` or `UnknownParticipant` before any row is assembled.
pub fn build_matrix(
	request: &ComputeRequest, config: &EngineConfig,
) -> Result<TrustMatrix, TrustError> {
	let anchor = &request.anchor_id;
	if !request.graph.contains_key(anchor) {
		return Err(TrustError::MissingAnchor(anchor.to_string()));
	}

	for (source, allocations) in &request.graph {
		for target in allocations.keys() {
			if !request.graph.contains_key(target) {
				return Err(TrustError::UnknownParticipant {
					from: source.to_string(),
					target: target.to_string(),
				});
			}
		}
	}

	let mut rows = BTreeMap::new();
	for (source, allocations) in &request.graph {
		let budget = request.budgets.get(source).copied().unwrap_or(config.allocation_budget);
		let row = normalize_allocations(source, allocations, anchor, budget)?;
		rows.insert(source.clone(), row);
	}

	let participants: BTreeSet<ParticipantId> = request.graph.keys().cloned().collect();
	let matrix = TrustMatrix::from_rows(ParticipantIndex::new(&participants), anchor, &rows)?;
	debug!(
		"Built {}x{} trust matrix, anchor '{}' at index {}",
		matrix.len(),
		matrix.len(),
		anchor,
		matrix.anchor_index()
	);

	Ok(matrix)
}
