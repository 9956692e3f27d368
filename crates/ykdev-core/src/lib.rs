//! Shared vocabulary for the ykdev YubiKey device layer.
//!
//! This crate defines the types spoken by every other crate in the workspace:
//! the [`Capability`] bitmask, the [`Transport`] enumeration, the [`Mode`]
//! (transport combination) table, the firmware [`Version`] triple, and the
//! unified [`Error`]/[`Result`] pair.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
