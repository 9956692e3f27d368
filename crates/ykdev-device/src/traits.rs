//! Driver and backend trait definitions.
//!
//! These traits establish the contract between the device layer and the
//! transport drivers (CCID smartcard, OTP keyboard, U2F HID), enabling
//! substitution between mock and real hardware implementations.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024
//! RPITIT), eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::drivers::AnyDriver;
use ykdev_core::{Capability, Mode, Result, Transport, Version};

/// An open connection to a device over one transport.
///
/// A driver is exclusively owned by at most one device handle. The handle
/// queries identity fields synchronously (they are cached at open time) and
/// performs hardware commands through the async methods.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return
/// `impl Future` (Edition 2024 RPITIT); `Box<dyn Driver>` cannot be used.
/// For dynamic dispatch, use the enum wrapper [`AnyDriver`] from the
/// [`drivers`](crate::drivers) module.
pub trait Driver: Send + Sync {
    /// The transport this driver is connected over.
    fn transport(&self) -> Transport;

    /// Firmware version reported by the device.
    fn version(&self) -> Version;

    /// The device's current mode, as cached by the driver.
    fn mode(&self) -> Mode;

    /// Serial number reported over this transport, if any.
    ///
    /// Some transports (notably U2F) cannot read the serial; the device
    /// handle then falls back to the serial from the capability blob.
    fn serial(&self) -> Option<u32>;

    /// Whether the device self-identifies as a Security Key variant.
    ///
    /// Only meaningful over U2F; Security Keys expose no other transport.
    fn is_security_key(&self) -> bool;

    /// Read the raw capability blob (firmware 4.1 and later).
    ///
    /// Returns an empty buffer when the device has nothing to report.
    ///
    /// # Errors
    /// Returns an error if the device is disconnected or the query fails.
    async fn read_capabilities(&mut self) -> Result<Vec<u8>>;

    /// Determine supported capabilities by live probing (NEO over CCID).
    ///
    /// # Errors
    /// Returns an error if the device is disconnected or a probe command
    /// fails.
    async fn probe_capabilities_support(&mut self) -> Result<Capability>;

    /// Issue a mode-switch command.
    ///
    /// `flags` is the raw command byte (mode code plus flag bits, already
    /// quirk-adjusted by the caller); `cr_timeout` is the challenge-response
    /// timeout in seconds; `autoeject_time` the touch-eject delay.
    ///
    /// # Errors
    /// Returns an error if the device rejects the command or communication
    /// fails.
    async fn set_mode(&mut self, flags: u8, cr_timeout: u8, autoeject_time: u8) -> Result<()>;

    /// Update the driver's cached mode after a successful mode switch.
    ///
    /// The hardware is not re-queried; callers record the mode they just
    /// programmed.
    fn set_cached_mode(&mut self, mode: Mode);
}

/// Source of drivers for device discovery.
///
/// A backend knows how to attempt an open on each transport. Opening
/// distinguishes three outcomes: a driver (device present), `None` (no
/// device on that transport), and an error (the transport layer failed).
/// Discovery treats absence as fall-through and errors as fatal.
pub trait Backend: Send + Sync {
    /// Attempt to open a device over the given transport.
    ///
    /// # Errors
    /// Returns an error if the transport layer fails while opening; a
    /// merely absent device is `Ok(None)`.
    async fn open(&self, transport: Transport) -> Result<Option<AnyDriver>>;
}
