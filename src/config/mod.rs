#[cfg(feature = "cli")]
pub mod cli;
pub mod engine_config;
pub mod seed;

#[cfg(feature = "cli")]
pub use cli::CliArgs;
pub use engine_config::EngineConfig;
pub use seed::{DestinationDirectory, SeedData};
