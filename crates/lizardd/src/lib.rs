//! # lizardd
//!
//! Docker volume plugin daemon for LizardFS. Serves the volume plugin
//! protocol on a Unix socket and drives a [`lizard_volume::VolumeDriver`].

#![warn(missing_docs)]

pub mod api;
pub mod cli;
pub mod daemon;
