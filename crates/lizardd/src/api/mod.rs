//! Docker volume plugin HTTP API.

pub mod server;
pub mod types;
