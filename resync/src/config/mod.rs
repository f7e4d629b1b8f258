//! Configuration module for the resync binary.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::ResyncConfig;
