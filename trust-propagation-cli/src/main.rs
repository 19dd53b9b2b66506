//! # Trust Propagation CLI
//!
//! This crate provides a CLI interface to use the `trust-propagation` library.

#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
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

mod cli;
mod fs;

use clap::Parser;
use cli::*;
use dotenv::dotenv;
use env_logger::{init_from_env, Env};
use fs::{load_config, ClientConfig};
use log::info;
use trust_propagation::error::TrustError;

#[tokio::main]
async fn main() -> Result<(), TrustError> {
	dotenv().ok();
	init_from_env(Env::default().filter_or("LOG_LEVEL", "info"));
	let mut config: ClientConfig = load_config()?;

	match Cli::parse().mode {
		Mode::Allocate(allocate_data) => handle_allocate(allocate_data)?,
		Mode::Compute(compute_data) => handle_compute(config, compute_data).await?,
		Mode::Override(override_data) => handle_override(override_data)?,
		Mode::Scores => handle_scores(config).await?,
		Mode::Show => info!("Client config:\n{:#?}", config),
		Mode::Update(update_data) => handle_update(&mut config, update_data)?,
	};

	Ok(())
}
