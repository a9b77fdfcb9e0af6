pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::InMemoryStore;
pub use config::{DestinationDirectory, EngineConfig, SeedData};
pub use core::engine::{EngineStore, ItineraryEngine};
pub use utils::error::{EngineError, Result};
