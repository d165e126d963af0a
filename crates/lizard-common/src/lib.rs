//! # lizard-common
//!
//! Shared types for the LizardFS Docker volume plugin:
//! - Plugin configuration and derived filesystem paths
//! - Volume name validation
//! - Common error types

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod name;

pub use config::PluginConfig;
pub use error::{VolumeError, VolumeResult};
pub use name::validate_volume_name;
