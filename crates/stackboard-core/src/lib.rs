//! stackboard-core library.
//!
//! Fractional stack ranks, the reorder/reparent protocol, and read-side
//! hierarchy assembly for board and backlog views.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` inside the `db` layer; surface
//!   [`error::BoardError`] from domain operations.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod model;
pub mod rank;
pub mod reorder;
pub mod session;
