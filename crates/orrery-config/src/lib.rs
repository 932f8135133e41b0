//! Configuration for the orrery demo.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BodyConfig, Config, DebugConfig, PlanetConfig, RenderConfig, SceneConfig, default_bodies,
};
pub use error::ConfigError;
