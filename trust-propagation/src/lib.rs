//! # Trust Propagation
//!
//! A library for computing global trust scores over a referral network.
//!
//! Participants allocate trust to each other out of a fixed budget. The
//! engine turns these allocations into a row-stochastic trust matrix and runs
//! an EigenTrust-style power iteration seeded by a single pretrusted anchor,
//! whose score stays pinned at 1.
//!
//! ## Main characteristics:
//!
//! **Anchored** - all trust originates at the anchor and decays as it moves
//! through the network. Nobody can allocate trust into the anchor.
//!
//! **Self-neutral** - a participant's allocation to themselves is removed
//! before normalization, and by default each participant is scored with their
//! own outgoing row routed to the anchor, so nothing they allocate can come
//! back to them through a cycle.
//!
//! **Deterministic** - participants are indexed in sorted order, so identical
//! snapshots always produce identical score vectors.
//!
//! ## Pipeline
//!
//! [`normalizer`] -> [`matrix`] -> [`solver`] -> [`percentile`], wrapped by
//! [`TrustEngine::compute`]. Manual pins are layered afterwards by
//! [`overrides`].

// Rustc
#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
// Clippy
#![allow(clippy::tabs_in_doc_comments, clippy::needless_range_loop, clippy::new_without_default)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	clippy::clone_on_copy,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

pub mod config;
pub mod error;
pub mod matrix;
pub mod normalizer;
pub mod overrides;
pub mod participant;
pub mod percentile;
pub mod request;
pub mod solver;
pub mod storage;

use config::EngineConfig;
use error::TrustError;
use log::{info, warn};
use matrix::build_matrix;
use percentile::rank_percentiles;
use request::{ComputeRequest, ComputeResponse};
use solver::{solve, solve_isolated, SolverParams};
use std::time::{Duration, Instant};

/// Trust engine holding the stored configuration defaults.
#[derive(Clone, Debug, Default)]
pub struct TrustEngine {
	config: EngineConfig,
}

impl TrustEngine {
	/// Creates a new engine around stored defaults.
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}

	/// Gets config.
	pub fn get_config(&self) -> &EngineConfig {
		&self.config
	}

	/// Runs a full computation over the request snapshot.
	///
	/// Request fields override the stored defaults for this call only. A
	/// snapshot without participants yields an empty, converged response.
	pub fn compute(&self, request: &ComputeRequest) -> Result<ComputeResponse, TrustError> {
		let start = Instant::now();
		let config = self.config.with_overrides(request)?;

		if request.graph.is_empty() {
			info!("Empty graph, nothing to compute");
			return Ok(ComputeResponse::empty());
		}

		let matrix = build_matrix(request, &config)?;
		let params = SolverParams::from(&config);
		let result = if config.isolate_self_influence {
			solve_isolated(&matrix, params)?
		} else {
			solve(&matrix, params)?
		};

		if !result.converged {
			warn!(
				"Scores did not converge within {} iterations (threshold {:e})",
				config.max_iterations, config.convergence_threshold
			);
		}

		let percentiles = rank_percentiles(&result.scores, &request.anchor_id);
		let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

		info!(
			"Computed scores for {} participants: {} iterations, converged: {}, {} ms",
			result.scores.len(),
			result.iterations,
			result.converged,
			elapsed_ms
		);

		Ok(ComputeResponse {
			scores: result.scores,
			percentiles,
			iterations: result.iterations,
			converged: result.converged,
			elapsed_ms,
		})
	}

	/// Runs [`TrustEngine::compute`] on a blocking task, optionally bounded by
	/// a wall-clock timeout.
	///
	/// On timeout the error is returned right away while the detached run
	/// finishes in the background.
	pub async fn compute_blocking(
		&self, request: ComputeRequest, timeout: Option<Duration>,
	) -> Result<ComputeResponse, TrustError> {
		let engine = self.clone();
		let task = tokio::task::spawn_blocking(move || engine.compute(&request));

		let joined = match timeout {
			Some(limit) => tokio::time::timeout(limit, task)
				.await
				.map_err(|_| TrustError::TimeoutError(limit.as_millis()))?,
			None => task.await,
		};

		joined.map_err(|e| TrustError::TaskError(e.to_string()))?
	}
}

#[cfg(test)]
mod lib_tests {
	use crate::{
		config::EngineConfig,
		error::TrustError,
		participant::ParticipantId,
		request::{ComputeRequest, ComputeResponse},
		TrustEngine,
	};
	use std::time::Duration;

	fn mutual_trust() -> ComputeRequest {
		let mut request = ComputeRequest::new("A");
		request.add_participant("A");
		request.add_allocation("B", "C", 100.0);
		request.add_allocation("C", "B", 100.0);
		request
	}

	fn chain(self_loop: Option<f64>, b_to_c: f64) -> ComputeRequest {
		let mut request = ComputeRequest::new("A");
		request.add_allocation("A", "B", 100.0);
		request.add_allocation("B", "C", b_to_c);
		if let Some(weight) = self_loop {
			request.add_allocation("B", "B", weight);
		}
		request.add_allocation("C", "D", 70.0);
		request.add_participant("D");
		request
	}

	fn plain() -> TrustEngine {
		TrustEngine::new(EngineConfig { isolate_self_influence: false, ..Default::default() })
	}

	#[test]
	fn test_mutual_trust() {
		let engine = TrustEngine::default();
		let response = engine.compute(&mutual_trust()).unwrap();

		assert!(response.converged);
		assert_eq!(response.scores[&"A".into()], 1.0);

		let (b, c) = (response.scores[&"B".into()], response.scores[&"C".into()]);
		assert!((b - c).abs() < 1e-6);
		assert!(b > 0.0 && b < 1.0);

		// Equal scores tie, so identity order decides
		assert_eq!(response.percentiles[&"B".into()], 0);
		assert_eq!(response.percentiles[&"C".into()], 100);
		assert!(!response.percentiles.contains_key(&"A".into()));
	}

	#[test]
	fn test_mutual_trust_isolated_closed_form() {
		let engine = TrustEngine::default();
		let mut previous = 0.0;

		for alpha in [0.5, 0.3, 0.15] {
			let request = ComputeRequest { alpha: Some(alpha), ..mutual_trust() };
			let response = engine.compute(&request).unwrap();
			let b = response.scores[&"B".into()];

			// B's row goes to the anchor, so C only holds the anchor's share
			let c_share = (1.0 - alpha) * 0.5;
			assert!((b - (1.0 - alpha) * (0.5 + c_share)).abs() < 1e-6);
			assert!(b < 1.0);
			assert!(b > previous);
			previous = b;
		}
	}

	#[test]
	fn test_mutual_trust_plain_closed_form() {
		let engine = plain();
		let mut previous = 0.0;

		for alpha in [0.5, 0.3, 0.15] {
			let request = ComputeRequest { alpha: Some(alpha), ..mutual_trust() };
			let response = engine.compute(&request).unwrap();
			let b = response.scores[&"B".into()];

			// Closed form of x = (1 - alpha) * (1/2 + x)
			assert!((b - (1.0 - alpha) * 0.5 / alpha).abs() < 1e-4);
			assert!(b > previous);
			previous = b;
		}
	}

	#[test]
	fn test_anchor_only() {
		let mut request = ComputeRequest::new("A");
		request.add_participant("A");
		let response = TrustEngine::default().compute(&request).unwrap();

		assert_eq!(response.scores.len(), 1);
		assert_eq!(response.scores[&"A".into()], 1.0);
		assert_eq!(response.iterations, 0);
		assert!(response.converged);
		assert!(response.percentiles.is_empty());
	}

	#[test]
	fn test_empty_graph() {
		let response = TrustEngine::default().compute(&ComputeRequest::new("A")).unwrap();
		assert_eq!(response, ComputeResponse::empty());
	}

	#[test]
	fn test_self_loop_vanishes() {
		let engine = TrustEngine::default();

		// 50 to self and 50 to C, against 50 to C alone
		let with_loop = engine.compute(&chain(Some(50.0), 50.0)).unwrap();
		let without_loop = engine.compute(&chain(None, 50.0)).unwrap();
		assert_eq!(with_loop.scores, without_loop.scores);

		// Against 100 to C, B's own score is unchanged
		let full = engine.compute(&chain(None, 100.0)).unwrap();
		let b = ParticipantId::from("B");
		assert!((with_loop.scores[&b] - full.scores[&b]).abs() < 1e-6);
	}

	#[test]
	fn test_self_loop_on_cycle() {
		// C hands everything back to B
		let build = |self_loop: Option<f64>, b_to_c: f64| {
			let mut request = ComputeRequest::new("A");
			request.add_participant("A");
			request.add_allocation("B", "C", b_to_c);
			if let Some(weight) = self_loop {
				request.add_allocation("B", "B", weight);
			}
			request.add_allocation("C", "B", 100.0);
			request
		};
		let b = ParticipantId::from("B");

		let engine = TrustEngine::default();
		let with_loop = engine.compute(&build(Some(50.0), 50.0)).unwrap();
		let full = engine.compute(&build(None, 100.0)).unwrap();
		assert_eq!(with_loop.scores[&b], full.scores[&b]);
		assert!((full.scores[&b] - 0.85 * (0.5 + 0.85 * 0.5)).abs() < 1e-6);

		for weight in [10.0, 95.0, 1e6] {
			let response = engine.compute(&build(Some(weight), 5.0)).unwrap();
			assert_eq!(response.scores[&b], full.scores[&b]);
		}

		// A single solve lets B's own allocation return through C
		let with_loop = plain().compute(&build(Some(50.0), 50.0)).unwrap();
		let full = plain().compute(&build(None, 100.0)).unwrap();
		assert!((with_loop.scores[&b] - full.scores[&b]).abs() > 1e-3);
	}

	#[test]
	fn test_dominant_self_loop() {
		let engine = TrustEngine::default();
		let b = ParticipantId::from("B");
		let baseline = engine.compute(&chain(None, 5.0)).unwrap();

		for weight in [95.0, 1_000.0, 1e9] {
			let response = engine.compute(&chain(Some(weight), 5.0)).unwrap();
			assert_eq!(response.scores[&b], baseline.scores[&b]);
		}
	}

	#[test]
	fn test_plain_solve_opt_out() {
		let request = ComputeRequest { isolate_self_influence: Some(false), ..mutual_trust() };
		let response = TrustEngine::default().compute(&request).unwrap();

		// Mutual trust compounds without isolation
		assert!(response.scores[&"B".into()] > 1.0);
		assert_eq!(response.scores[&"A".into()], 1.0);
	}

	#[test]
	fn test_isolation_covers_cycles() {
		// B -> C -> B lets B's allocations return to B
		let build = |b_to_c: f64| {
			let mut request = ComputeRequest::new("A");
			request.add_allocation("A", "B", 50.0);
			request.add_allocation("A", "C", 50.0);
			request.add_allocation("B", "C", b_to_c);
			request.add_allocation("C", "B", 80.0);
			request
		};
		let b = ParticipantId::from("B");

		let plain_low = plain().compute(&build(10.0)).unwrap();
		let plain_high = plain().compute(&build(90.0)).unwrap();
		assert!((plain_low.scores[&b] - plain_high.scores[&b]).abs() > 1e-3);

		let isolated = TrustEngine::default();
		let isolated_low = isolated.compute(&build(10.0)).unwrap();
		let isolated_high = isolated.compute(&build(90.0)).unwrap();
		assert_eq!(isolated_low.scores[&b], isolated_high.scores[&b]);
		assert_eq!(isolated_low.scores[&"A".into()], 1.0);
	}

	#[test]
	fn test_unknown_participant() {
		let mut request = mutual_trust();
		request.add_allocation("C", "ghost", 10.0);

		let res = TrustEngine::default().compute(&request);
		assert!(matches!(res, Err(TrustError::UnknownParticipant { .. })));
	}

	#[test]
	fn test_missing_anchor() {
		let mut request = mutual_trust();
		request.anchor_id = "Z".into();

		let res = TrustEngine::default().compute(&request);
		assert!(matches!(res, Err(TrustError::MissingAnchor(_))));
	}

	#[test]
	fn test_invalid_config_override() {
		let request = ComputeRequest { convergence_threshold: Some(-1.0), ..mutual_trust() };
		let res = TrustEngine::default().compute(&request);
		assert!(matches!(res, Err(TrustError::ConfigurationError(_))));
	}

	#[test]
	fn test_single_iteration() {
		let request = ComputeRequest {
			max_iterations: Some(1),
			convergence_threshold: Some(1e-12),
			..mutual_trust()
		};
		let response = TrustEngine::default().compute(&request).unwrap();

		assert!(!response.converged);
		assert_eq!(response.iterations, 1);
		assert_eq!(response.scores.len(), 3);
		assert_eq!(response.percentiles.len(), 2);
	}

	#[tokio::test]
	async fn test_compute_blocking() {
		let engine = TrustEngine::default();
		let response = engine.compute_blocking(mutual_trust(), None).await.unwrap();
		assert!(response.converged);

		let direct = engine.compute(&mutual_trust()).unwrap();
		assert_eq!(response.scores, direct.scores);
	}

	#[tokio::test]
	async fn test_compute_blocking_timeout() {
		// A ring large enough that isolated solves cannot finish in a millisecond
		let size = 150;
		let mut request = ComputeRequest::new("p0");
		for i in 0..size {
			request.add_allocation(format!("p{}", i), format!("p{}", (i + 1) % size), 90.0);
		}

		let engine = TrustEngine::default();
		let res = engine.compute_blocking(request, Some(Duration::from_millis(1))).await;
		assert!(matches!(res, Err(TrustError::TimeoutError(1))));
	}
}
