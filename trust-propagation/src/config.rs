//! # Config Module.
//!
//! Engine parameters. A stored `EngineConfig` supplies the defaults and each
//! request may override individual fields for that call only.

use crate::{error::TrustError, request::ComputeRequest};
use serde::{Deserialize, Serialize};

/// Default decay factor.
pub const DEFAULT_ALPHA: f64 = 0.15;
/// Default iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
/// Default convergence threshold.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-6;
/// Default allocation budget (points out of 100).
pub const DEFAULT_ALLOCATION_BUDGET: f64 = 100.0;
/// Participants are scored with their own row routed to the anchor unless
/// explicitly disabled.
pub const DEFAULT_ISOLATE_SELF_INFLUENCE: bool = true;

/// Engine configuration settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
	/// Weight of the pretrust vector at each iteration, in `(0, 1)`.
	pub alpha: f64,
	/// Maximum number of iterations.
	pub max_iterations: usize,
	/// Maximum per-entry change for the vector to count as converged.
	pub convergence_threshold: f64,
	/// Budget that allocation weights are expressed against.
	pub allocation_budget: f64,
	/// Compute every participant's score with their own row routed to the anchor.
	///
	/// Costs one solve per participant. Disabling it runs a single solve, in
	/// which a participant on a cycle can receive back trust they allocated.
	pub isolate_self_influence: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			alpha: DEFAULT_ALPHA,
			max_iterations: DEFAULT_MAX_ITERATIONS,
			convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
			allocation_budget: DEFAULT_ALLOCATION_BUDGET,
			isolate_self_influence: DEFAULT_ISOLATE_SELF_INFLUENCE,
		}
	}
}

impl EngineConfig {
	/// Checks every parameter range.
	pub fn validate(&self) -> Result<(), TrustError> {
		if !(self.alpha > 0.0 && self.alpha < 1.0) {
			return Err(TrustError::ConfigurationError(format!(
				"alpha must be in (0, 1), got {}",
				self.alpha
			)));
		}

		if self.max_iterations == 0 {
			return Err(TrustError::ConfigurationError(
				"max_iterations must be greater than 0".to_string(),
			));
		}

		if !(self.convergence_threshold.is_finite() && self.convergence_threshold > 0.0) {
			return Err(TrustError::ConfigurationError(format!(
				"convergence_threshold must be positive, got {}",
				self.convergence_threshold
			)));
		}

		if !(self.allocation_budget.is_finite() && self.allocation_budget > 0.0) {
			return Err(TrustError::ConfigurationError(format!(
				"allocation_budget must be positive, got {}",
				self.allocation_budget
			)));
		}

		Ok(())
	}

	/// Returns a validated copy with the request's overrides applied.
	pub fn with_overrides(&self, request: &ComputeRequest) -> Result<Self, TrustError> {
		let merged = Self {
			alpha: request.alpha.unwrap_or(self.alpha),
			max_iterations: request.max_iterations.unwrap_or(self.max_iterations),
			convergence_threshold: request
				.convergence_threshold
				.unwrap_or(self.convergence_threshold),
			allocation_budget: request.allocation_budget.unwrap_or(self.allocation_budget),
			isolate_self_influence: request
				.isolate_self_influence
				.unwrap_or(self.isolate_self_influence),
		};

		merged.validate()?;
		Ok(merged)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_is_valid() {
		let config = EngineConfig::default();
		assert!(config.validate().is_ok());
		assert_eq!(config.alpha, 0.15);
		assert_eq!(config.max_iterations, 100);
		assert_eq!(config.convergence_threshold, 1e-6);
		assert!(config.isolate_self_influence);
	}

	#[test]
	fn test_rejects_out_of_range() {
		let bad_alpha = EngineConfig { alpha: 1.0, ..Default::default() };
		assert!(matches!(bad_alpha.validate(), Err(TrustError::ConfigurationError(_))));

		let nan_alpha = EngineConfig { alpha: f64::NAN, ..Default::default() };
		assert!(nan_alpha.validate().is_err());

		let no_iterations = EngineConfig { max_iterations: 0, ..Default::default() };
		assert!(no_iterations.validate().is_err());

		let zero_threshold = EngineConfig { convergence_threshold: 0.0, ..Default::default() };
		assert!(zero_threshold.validate().is_err());

		let zero_budget = EngineConfig { allocation_budget: 0.0, ..Default::default() };
		assert!(zero_budget.validate().is_err());
	}

	#[test]
	fn test_request_overrides() {
		let stored = EngineConfig::default();
		let request = ComputeRequest {
			alpha: Some(0.3),
			max_iterations: Some(7),
			..ComputeRequest::new("anchor")
		};

		let merged = stored.with_overrides(&request).unwrap();
		assert_eq!(merged.alpha, 0.3);
		assert_eq!(merged.max_iterations, 7);
		assert_eq!(merged.convergence_threshold, stored.convergence_threshold);

		let invalid = ComputeRequest { alpha: Some(0.0), ..ComputeRequest::new("anchor") };
		assert!(stored.with_overrides(&invalid).is_err());
	}

	#[test]
	fn test_partial_json_uses_defaults() {
		let config: EngineConfig = serde_json::from_str(r#"{ "alpha": 0.2 }"#).unwrap();
		assert_eq!(config.alpha, 0.2);
		assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
		assert!(config.isolate_self_influence);

		let plain: EngineConfig =
			serde_json::from_str(r#"{ "isolate_self_influence": false }"#).unwrap();
		assert!(!plain.isolate_self_influence);
	}
}
