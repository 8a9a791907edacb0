//! Configuration loading for the orchestration kit

pub mod loader;

pub use loader::{load, load_from_file, ConfigError};
