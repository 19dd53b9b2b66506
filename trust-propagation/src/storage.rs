//! # Storage Module.
//!
//! This module contains generic storage traits and implementations, plus the
//! allocation and score records exchanged with them.

use crate::{
	error::TrustError,
	overrides::{PublishedScore, PublishedScores},
	participant::ParticipantId,
	request::ComputeRequest,
};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{from_reader, to_string_pretty};
use std::{
	fs::File,
	io::{BufReader, Write},
	marker::PhantomData,
	path::PathBuf,
};

/// The main trait to be implemented by different storage types.
pub trait Storage<T> {
	/// The error type.
	type Err;

	/// Loads data from storage.
	fn load(&self) -> Result<T, Self::Err>;
	/// Saves data to storage.
	fn save(&mut self, data: T) -> Result<(), Self::Err>;
}

/// The `CSVFileStorage` struct provides a mechanism for persisting
/// and retrieving structured data to and from CSV files.
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use trust_propagation::storage::{AllocationRecord, CSVFileStorage, Storage};
///
/// let filepath = PathBuf::from("/path/to/allocations.csv");
/// let mut storage = CSVFileStorage::<AllocationRecord>::new(filepath);
///
/// let data = vec![AllocationRecord::new("alice", "bob", 40.0)];
///
/// // Save the data to the CSV file.
/// storage.save(data.clone()).unwrap();
///
/// // Load the data from the CSV file.
/// let loaded_data = storage.load().unwrap();
/// assert_eq!(data, loaded_data);
/// ```
pub struct CSVFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> CSVFileStorage<T> {
	/// Creates a new CSVFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned> Storage<Vec<T>> for CSVFileStorage<T> {
	type Err = TrustError;

	fn load(&self) -> Result<Vec<T>, TrustError> {
		let file = File::open(&self.filepath).map_err(TrustError::IOError)?;
		let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(BufReader::new(file));

		reader
			.deserialize()
			.map(|result| result.map_err(|e| TrustError::FileIOError(e.to_string())))
			.collect()
	}

	fn save(&mut self, data: Vec<T>) -> Result<(), TrustError> {
		let mut writer = WriterBuilder::new()
			.from_path(&self.filepath)
			.map_err(|e| TrustError::FileIOError(e.to_string()))?;

		for record in &data {
			writer.serialize(record).map_err(|e| TrustError::FileIOError(e.to_string()))?;
		}

		writer.flush().map_err(TrustError::IOError)
	}
}

/// The `JSONFileStorage` struct provides a mechanism for persisting
/// and retrieving structured data to and from JSON files.
pub struct JSONFileStorage<T> {
	filepath: PathBuf,
	phantom: PhantomData<T>,
}

impl<T> JSONFileStorage<T> {
	/// Creates a new JSONFileStorage.
	pub fn new(filepath: PathBuf) -> Self {
		Self { filepath, phantom: PhantomData }
	}

	/// Returns the path to the file.
	pub fn filepath(&self) -> &PathBuf {
		&self.filepath
	}
}

impl<T: Serialize + DeserializeOwned> Storage<T> for JSONFileStorage<T> {
	type Err = TrustError;

	fn load(&self) -> Result<T, Self::Err> {
		let file = File::open(&self.filepath).map_err(TrustError::IOError)?;
		from_reader(BufReader::new(file)).map_err(|e| TrustError::ParsingError(e.to_string()))
	}

	fn save(&mut self, data: T) -> Result<(), Self::Err> {
		let json_str =
			to_string_pretty(&data).map_err(|e| TrustError::ParsingError(e.to_string()))?;

		let mut file = File::create(&self.filepath).map_err(TrustError::IOError)?;
		file.write_all(json_str.as_bytes()).map_err(TrustError::IOError)
	}
}

/// A single allocation row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
	/// Allocating participant.
	pub source: String,
	/// Receiving participant.
	pub target: String,
	/// Allocated weight, in budget units.
	pub weight: f64,
}

impl AllocationRecord {
	/// Creates a new allocation record.
	pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
		Self { source: source.into(), target: target.into(), weight }
	}
}

/// Builds a request snapshot from allocation records.
///
/// Every source and target becomes a participant, as does the anchor.
/// Repeated `(source, target)` rows are summed.
pub fn request_from_records(
	anchor: impl Into<ParticipantId>, records: Vec<AllocationRecord>,
) -> ComputeRequest {
	let mut request = ComputeRequest::new(anchor);
	request.add_participant(request.anchor_id.clone());

	for AllocationRecord { source, target, weight } in records {
		request.add_participant(target.as_str());
		request.add_allocation(source, target, weight);
	}

	request
}

/// Score record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
	/// The participant.
	participant: String,
	/// Published score.
	score: f64,
	/// Percentile, empty for the anchor.
	percentile: Option<u8>,
	/// Whether the score was pinned by an operator.
	overridden: bool,
}

impl ScoreRecord {
	/// Creates a new score record from a published score.
	pub fn from_published(participant: &ParticipantId, published: &PublishedScore) -> Self {
		Self {
			participant: participant.to_string(),
			score: published.score,
			percentile: published.percentile,
			overridden: published.overridden,
		}
	}

	/// Returns the participant.
	pub fn participant(&self) -> &String {
		&self.participant
	}

	/// Returns the score.
	pub fn score(&self) -> f64 {
		self.score
	}

	/// Returns the percentile.
	pub fn percentile(&self) -> Option<u8> {
		self.percentile
	}

	/// Returns whether the score was overridden.
	pub fn overridden(&self) -> bool {
		self.overridden
	}
}

impl From<&PublishedScores> for Vec<ScoreRecord> {
	fn from(published: &PublishedScores) -> Self {
		published
			.entries
			.iter()
			.map(|(participant, entry)| ScoreRecord::from_published(participant, entry))
			.collect()
	}
}
