//! Device and transport layer for YubiKey management.
//!
//! This crate turns an attached YubiKey into a typed [`YubiKey`] handle. It
//! covers the whole path from "something is plugged in" to "a classified
//! device ready for mode operations":
//!
//! - [`traits`] — the [`Driver`] abstraction every transport implements,
//!   and the [`Backend`] abstraction discovery opens drivers through.
//! - [`drivers`] — enum wrappers ([`AnyDriver`], [`AnyBackend`]) providing
//!   concrete dispatch for the native-async-trait driver interface.
//! - [`mock`] — a programmable in-memory driver and backend for development
//!   and testing without physical hardware.
//! - [`classify`] — the device classifier: an ordered rule list mapping
//!   firmware version, transport, and the decoded capability blob to a
//!   device name and capability masks.
//! - [`device`] — the [`YubiKey`] handle itself: mode queries, the
//!   mode-switch command (including the NEO flag-byte quirk), and the
//!   ownership-transferring transport switch.
//! - [`discover`] — [`open_device`]: tries transports in fixed priority
//!   order and returns the first device found, or `None`.
//! - [`prompt`] — a cancellable one-shot touch reminder timer.
//!
//! # Design Philosophy
//!
//! All driver I/O uses native `async fn` in traits (Rust 1.90 + Edition
//! 2024 RPITIT) with enum dispatch instead of trait objects. A device
//! handle owns its driver exclusively; switching transport consumes the
//! handle, so there are never two live drivers for one physical device.
//!
//! # Examples
//!
//! ```
//! use ykdev_core::{Capability, Transport, Version};
//! use ykdev_device::mock::{MockBackend, MockDriverBuilder};
//! use ykdev_device::{AnyBackend, open_device};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> ykdev_core::Result<()> {
//!     let backend = MockBackend::new();
//!     let (driver, _handle) = MockDriverBuilder::new(Transport::Otp, Version::new(4, 0, 2)).build();
//!     backend.stage(driver);
//!
//!     let device = open_device(&AnyBackend::Mock(backend), Capability::TRANSPORTS)
//!         .await?
//!         .expect("device staged");
//!     assert_eq!(device.device_name(), "YubiKey Plus");
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod device;
pub mod discover;
pub mod drivers;
pub mod mock;
pub mod prompt;
pub mod traits;

// Re-export commonly used types for convenience
pub use classify::Classification;
pub use device::YubiKey;
pub use discover::{DISCOVERY_ORDER, open_device};
pub use drivers::{AnyBackend, AnyDriver};
pub use prompt::{DEFAULT_TOUCH_PROMPT_DELAY, TouchPrompt};
pub use traits::{Backend, Driver};
