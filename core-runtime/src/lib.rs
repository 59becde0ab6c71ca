//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Playback configuration
//! - System-signal event bus
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! its validated configuration types and the broadcast bus through which
//! interruptions, route changes and lifecycle transitions are delivered.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
