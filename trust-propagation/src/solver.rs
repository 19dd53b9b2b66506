//! # Solver Module.
//!
//! Power iteration over a [`TrustMatrix`]:
//!
//! ```text
//! t_{k+1}         = (1 - alpha) * transpose(C) . t_k + alpha * p
//! t_{k+1}[anchor] = 1
//! ```
//!
//! `t_0` and the pretrust vector `p` are both the unit vector on the anchor.
//! Iteration stops once no entry moves by `convergence_threshold` or more, or
//! when `max_iterations` is reached.

use crate::{
	config::EngineConfig, error::TrustError, matrix::TrustMatrix, participant::ParticipantId,
};
use log::debug;
use std::collections::BTreeMap;

/// Solver lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
	/// Vectors set up, no iteration performed yet.
	Initialized,
	/// At least one iteration performed, not yet stable.
	Iterating,
	/// The last iteration moved no entry by the threshold or more.
	Converged,
	/// The iteration cap was hit before convergence.
	MaxIterationsReached,
}

impl SolverState {
	/// Whether iteration has stopped.
	pub fn is_terminal(&self) -> bool {
		matches!(self, SolverState::Converged | SolverState::MaxIterationsReached)
	}
}

/// Parameters of a single solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverParams {
	/// Decay factor.
	pub alpha: f64,
	/// Iteration cap.
	pub max_iterations: usize,
	/// Convergence threshold.
	pub convergence_threshold: f64,
}

impl From<&EngineConfig> for SolverParams {
	fn from(config: &EngineConfig) -> Self {
		Self {
			alpha: config.alpha,
			max_iterations: config.max_iterations,
			convergence_threshold: config.convergence_threshold,
		}
	}
}

/// Power iteration over one matrix.
pub struct PowerIteration<'a> {
	matrix: &'a TrustMatrix,
	params: SolverParams,
	pretrust: Vec<f64>,
	scores: Vec<f64>,
	iterations: usize,
	state: SolverState,
}

impl<'a> PowerIteration<'a> {
	/// Sets up the initial and pretrust vectors.
	///
	/// A matrix with no participant besides the anchor has nothing to
	/// compute and starts out converged.
	pub fn new(matrix: &'a TrustMatrix, params: SolverParams) -> Self {
		let mut pretrust = vec![0.0; matrix.len()];
		if !matrix.is_empty() {
			pretrust[matrix.anchor_index()] = 1.0;
		}

		let state =
			if matrix.len() <= 1 { SolverState::Converged } else { SolverState::Initialized };

		Self { matrix, params, scores: pretrust.clone(), pretrust, iterations: 0, state }
	}

	/// Current state.
	pub fn state(&self) -> SolverState {
		self.state
	}

	/// Iterations performed so far.
	pub fn iterations(&self) -> usize {
		self.iterations
	}

	/// Current score vector, in matrix index order.
	pub fn scores(&self) -> &[f64] {
		&self.scores
	}

	/// Performs one iteration and returns the largest per-entry change.
	///
	/// Does nothing once the solver is in a terminal state.
	pub fn step(&mut self) -> Result<f64, TrustError> {
		if self.state.is_terminal() {
			return Ok(0.0);
		}

		let alpha = self.params.alpha;
		let anchor = self.matrix.anchor_index();
		let network_trust = self.matrix.transpose_mul(&self.scores);

		let mut next: Vec<f64> = network_trust
			.iter()
			.zip(self.pretrust.iter())
			.map(|(&network, &pre)| (1.0 - alpha) * network + alpha * pre)
			.collect();
		next[anchor] = 1.0;
		self.iterations += 1;

		if let Some(i) = next.iter().position(|score| !score.is_finite()) {
			return Err(TrustError::DivergedComputation {
				iteration: self.iterations,
				participant: self.matrix.index().id(i).to_string(),
			});
		}

		let delta = next
			.iter()
			.zip(self.scores.iter())
			.map(|(new, old)| (new - old).abs())
			.fold(0.0, f64::max);
		self.scores = next;

		self.state = if delta < self.params.convergence_threshold {
			SolverState::Converged
		} else if self.iterations >= self.params.max_iterations {
			SolverState::MaxIterationsReached
		} else {
			SolverState::Iterating
		};

		debug!(
			"Iteration {}: max delta {:e} ({:?})",
			self.iterations, delta, self.state
		);

		Ok(delta)
	}

	/// Iterates until a terminal state is reached.
	pub fn run(mut self) -> Result<Solution, TrustError> {
		while !self.state.is_terminal() {
			self.step()?;
		}

		Ok(Solution {
			scores: self.scores,
			iterations: self.iterations,
			converged: self.state == SolverState::Converged,
		})
	}
}

/// Raw solver output, in matrix index order.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
	/// Score vector.
	pub scores: Vec<f64>,
	/// Iterations performed.
	pub iterations: usize,
	/// Whether the threshold was reached.
	pub converged: bool,
}

/// Result of a computation run, keyed by participant.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputationResult {
	/// Score per participant.
	pub scores: BTreeMap<ParticipantId, f64>,
	/// Iterations performed.
	pub iterations: usize,
	/// Whether every solve converged.
	pub converged: bool,
}

fn keyed(matrix: &TrustMatrix, scores: &[f64]) -> BTreeMap<ParticipantId, f64> {
	matrix.index().ids().iter().cloned().zip(scores.iter().copied()).collect()
}

/// Solves the matrix once.
pub fn solve(matrix: &TrustMatrix, params: SolverParams) -> Result<ComputationResult, TrustError> {
	let solution = PowerIteration::new(matrix, params).run()?;

	Ok(ComputationResult {
		scores: keyed(matrix, &solution.scores),
		iterations: solution.iterations,
		converged: solution.converged,
	})
}

/// Solves once per non-anchor participant, each time with that participant's
/// own row routed to the anchor, and keeps only that participant's score from
/// each solve.
///
/// `iterations` is the largest count across solves; `converged` holds only if
/// every solve converged.
pub fn solve_isolated(
	matrix: &TrustMatrix, params: SolverParams,
) -> Result<ComputationResult, TrustError> {
	let anchor = matrix.anchor_index();

	let mut scores = vec![0.0; matrix.len()];
	let mut iterations = 0;
	let mut converged = true;

	if !matrix.is_empty() {
		scores[anchor] = 1.0;
	}

	for i in (0..matrix.len()).filter(|&i| i != anchor) {
		let isolated = matrix.with_row_routed_to_anchor(i);
		let solution = PowerIteration::new(&isolated, params).run()?;

		scores[i] = solution.scores[i];
		iterations = iterations.max(solution.iterations);
		converged &= solution.converged;
	}

	Ok(ComputationResult {
		scores: keyed(matrix, &scores),
		iterations,
		converged,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		matrix::build_matrix, normalizer::NormalizedRow, participant::ParticipantIndex,
		request::ComputeRequest,
	};
	use std::collections::BTreeSet;

	const PARAMS: SolverParams =
		SolverParams { alpha: 0.15, max_iterations: 100, convergence_threshold: 1e-6 };

	fn mutual_trust() -> TrustMatrix {
		let mut request = ComputeRequest::new("a");
		request.add_participant("a");
		request.add_allocation("b", "c", 100.0);
		request.add_allocation("c", "b", 100.0);
		build_matrix(&request, &EngineConfig::default()).unwrap()
	}

	#[test]
	fn test_mutual_trust_converges_symmetrically() {
		let result = solve(&mutual_trust(), PARAMS).unwrap();

		assert!(result.converged);
		assert_eq!(result.scores[&"a".into()], 1.0);

		let (b, c) = (result.scores[&"b".into()], result.scores[&"c".into()]);
		assert!((b - c).abs() < 1e-9);

		// Fixed point of x = (1 - alpha) * (1/2 + x)
		let expected = (1.0 - PARAMS.alpha) * 0.5 / PARAMS.alpha;
		assert!((b - expected).abs() < 1e-4);
	}

	#[test]
	fn test_state_machine() {
		let matrix = mutual_trust();
		let mut solver = PowerIteration::new(&matrix, PARAMS);
		assert_eq!(solver.state(), SolverState::Initialized);

		let delta = solver.step().unwrap();
		assert!(delta > 0.0);
		assert_eq!(solver.state(), SolverState::Iterating);
		assert_eq!(solver.iterations(), 1);

		while !solver.state().is_terminal() {
			solver.step().unwrap();
		}
		assert_eq!(solver.state(), SolverState::Converged);

		// Terminal states are sticky
		let iterations = solver.iterations();
		assert_eq!(solver.step().unwrap(), 0.0);
		assert_eq!(solver.iterations(), iterations);
	}

	#[test]
	fn test_iteration_cap_is_not_an_error() {
		let matrix = mutual_trust();
		let params = SolverParams { max_iterations: 1, ..PARAMS };
		let result = solve(&matrix, params).unwrap();

		assert!(!result.converged);
		assert_eq!(result.iterations, 1);
		assert_eq!(result.scores.len(), 3);
		assert!((result.scores[&"b".into()] - 0.85 * 0.5).abs() < 1e-12);
	}

	#[test]
	fn test_anchor_only() {
		let mut request = ComputeRequest::new("a");
		request.add_participant("a");
		let matrix = build_matrix(&request, &EngineConfig::default()).unwrap();

		let result = solve(&matrix, PARAMS).unwrap();
		assert!(result.converged);
		assert_eq!(result.iterations, 0);
		assert_eq!(result.scores[&"a".into()], 1.0);
	}

	#[test]
	fn test_non_finite_scores_diverge() {
		let participants: BTreeSet<ParticipantId> =
			["a", "b"].into_iter().map(ParticipantId::from).collect();
		let anchor = ParticipantId::from("a");

		// Infinite budget fraction from a degenerate budget
		let mut request = ComputeRequest::new("a");
		request.add_allocation("a", "b", 1e300);
		request.add_participant("b");
		request.budgets.insert("a".into(), 1e-300);
		let matrix = build_matrix(&request, &EngineConfig::default()).unwrap();

		let res = solve(&matrix, PARAMS);
		assert!(matches!(
			res,
			Err(TrustError::DivergedComputation { iteration: 1, ref participant }) if participant == "b"
		));

		// A well-formed matrix over the same participants does not diverge
		let rows: BTreeMap<ParticipantId, NormalizedRow> = BTreeMap::new();
		let matrix =
			TrustMatrix::from_rows(ParticipantIndex::new(&participants), &anchor, &rows).unwrap();
		assert!(solve(&matrix, PARAMS).is_ok());
	}

	#[test]
	fn test_isolated_ignores_own_row() {
		let matrix = mutual_trust();
		let result = solve_isolated(&matrix, PARAMS).unwrap();

		// With b's row gone, c only holds the anchor's share and passes it back to b
		let expected = 0.85 * (0.5 + 0.85 * 0.5);
		assert!(result.converged);
		assert_eq!(result.scores[&"a".into()], 1.0);
		assert!((result.scores[&"b".into()] - expected).abs() < 1e-9);
		assert!((result.scores[&"c".into()] - expected).abs() < 1e-9);
	}
}
