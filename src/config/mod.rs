// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] holds the raw serde types and the validated [`ConfigFile`].
//! - [`pointer`] classifies schema/documents pointers.
//! - [`validate`] turns a [`RawConfigFile`] into a [`ConfigFile`].
//! - [`loader`] reads TOML from disk.

pub mod loader;
pub mod model;
pub mod pointer;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, OutputTarget, RawConfigFile, RawOutputTarget, RawWatch,
    WatchConfig,
};
pub use pointer::{OneOrMany, Pointer};
