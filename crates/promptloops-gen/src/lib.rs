//! # promptloops-gen
//!
//! The generation-service seam for promptloops.
//!
//! Every component that needs text or JSON from a model receives a
//! `&dyn Generator` explicitly; there is no process-wide client.
//!
//! ## Key Types
//!
//! - [`Generator`] - The capability consumed by the router, critic, refiner and judge
//! - [`CliGenerator`] - Generator backed by a local model CLI process
//! - [`ScriptedGenerator`] - Replays canned responses, for offline runs and tests
//! - [`recover`] - Pulls a single JSON object out of free-form generator text

mod cli;
mod recover;
mod scripted;
mod spawner;
mod traits;

pub use cli::CliGenerator;
pub use recover::{is_recovery_error, recover, RAW_TEXT_LIMIT};
pub use scripted::{ScriptedCall, ScriptedGenerator};
pub use spawner::ProcessSpawner;
pub use traits::{GenerationError, Generator, GeneratorConfig, OutputKind};
