//! retro-core library.
//!
//! # Conventions
//!
//! - **Errors**: store helpers return `anyhow::Result`; public operations
//!   return [`error::Result`] with a typed [`error::RetroError`].
//! - **Logging**: use `tracing` macros (`info!` on writes, `debug!` on reads,
//!   `warn!` when a guard trips).

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod graph;
pub mod model;
pub mod optimistic;
pub mod state;

pub use error::{ErrorCode, Result, RetroError};
