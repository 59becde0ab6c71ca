//! Workspace umbrella crate.
//!
//! Host applications depend on `onair-workspace` and pick a feature instead of
//! wiring each crate individually:
//!
//! - `service` (default): the [`core_service`] façade, which builds the
//!   playback controller from configuration and host bridges.
//! - `playback-only`: just the playback control core ([`core_playback`]) for
//!   hosts that assemble players and controllers themselves.

#[cfg(feature = "service")]
pub use core_service;

#[cfg(feature = "playback-only")]
pub use core_playback;
