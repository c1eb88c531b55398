//! Multi-runtime code sandbox execution pipeline.
//!
//! `sandboxd` (`src/bin/sandboxd.rs`) wires this library to an HTTP surface;
//! the modules here are usable standalone by anything that wants the
//! execution pipeline without the server shell around it.

pub mod admission;
pub mod config;
pub mod errors;
pub mod filter;
pub mod http;
pub mod limits;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod runner;

pub use errors::{Result, SandboxError};
