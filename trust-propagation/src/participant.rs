//! # Participant Module.
//!
//! Participant identities and the stable identity/index table built once per
//! computation run.

use serde::{Deserialize, Serialize};
use std::{
	collections::{BTreeSet, HashMap},
	fmt,
};

/// Opaque participant identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
	/// Constructs a new participant id.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the id as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ParticipantId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ParticipantId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for ParticipantId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<u64> for ParticipantId {
	fn from(id: u64) -> Self {
		Self(id.to_string())
	}
}

/// Bidirectional `ParticipantId <-> index` table.
///
/// Indices follow the sorted order of the ids, so two runs over the same
/// participant set always address the same rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticipantIndex {
	ids: Vec<ParticipantId>,
	positions: HashMap<ParticipantId, usize>,
}

impl ParticipantIndex {
	/// Builds the table from a set of participants.
	pub fn new(participants: &BTreeSet<ParticipantId>) -> Self {
		let ids: Vec<ParticipantId> = participants.iter().cloned().collect();
		let positions = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();

		Self { ids, positions }
	}

	/// Index of the participant, if known.
	pub fn position(&self, id: &ParticipantId) -> Option<usize> {
		self.positions.get(id).copied()
	}

	/// Participant at `index`.
	pub fn id(&self, index: usize) -> &ParticipantId {
		&self.ids[index]
	}

	/// All participants in index order.
	pub fn ids(&self) -> &[ParticipantId] {
		&self.ids
	}

	/// Number of participants.
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	/// Whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}
}
