//! The YubiKey device handle.
//!
//! A [`YubiKey`] pairs an immutable identity (name, version, capability
//! masks, serial) with exclusive ownership of the currently active driver.
//! Identity is fixed at open time by classification; the driver may be
//! swapped by [`YubiKey::use_transport`], which consumes the handle so the
//! old driver is provably released before a new one is opened.

use crate::classify::{Classification, Snapshot, classify};
use crate::discover::open_device;
use crate::drivers::{AnyBackend, AnyDriver};
use crate::traits::Driver;
use std::fmt;
use tracing::debug;
use ykdev_core::constants::{FLAG_TOUCH_EJECT, NEO_QUIRK_MAX_VERSION, NEO_QUIRK_MODE_CODE};
use ykdev_core::{Capability, Error, Mode, Result, Transport, Version};

/// Handle to an attached, classified YubiKey.
pub struct YubiKey {
    classification: Classification,
    serial: Option<u32>,
    driver: AnyDriver,
    backend: AnyBackend,
}

impl YubiKey {
    /// Classify an opened driver into a device handle.
    ///
    /// The backend is retained so the handle can re-run discovery when
    /// switching transport.
    ///
    /// # Errors
    /// Propagates capability I/O failures and capability blob decode
    /// faults.
    pub(crate) async fn open(backend: AnyBackend, mut driver: AnyDriver) -> Result<Self> {
        let snapshot = Snapshot::gather(&mut driver).await?;
        let classification = classify(&snapshot)?;
        // The blob-reported serial wins over the transport-reported one.
        let serial = classification.serial.or_else(|| driver.serial());
        Ok(YubiKey {
            classification,
            serial,
            driver,
            backend,
        })
    }

    /// Marketing name of the device generation.
    #[must_use]
    pub fn device_name(&self) -> &'static str {
        self.classification.device_name
    }

    /// Capabilities the hardware supports.
    #[must_use]
    pub fn capabilities(&self) -> Capability {
        self.classification.capabilities
    }

    /// Capabilities currently enabled; always a subset of
    /// [`capabilities`](Self::capabilities).
    #[must_use]
    pub fn enabled(&self) -> Capability {
        self.classification.enabled
    }

    /// Device serial number, if known over the active transport.
    #[must_use]
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// Firmware version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.driver.version()
    }

    /// The transport the handle is currently connected over.
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.driver.transport()
    }

    /// The device's current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.driver.mode()
    }

    /// The active driver.
    #[must_use]
    pub fn driver(&self) -> &AnyDriver {
        &self.driver
    }

    /// Whether the device supports every transport the given mode enables.
    #[must_use]
    pub fn has_mode(&self, mode: Mode) -> bool {
        self.classification.capabilities.contains(mode.transports())
    }

    /// Switch the device to another mode.
    ///
    /// The command byte starts from the mode's code; if `autoeject_time` is
    /// given, the touch-eject flag (0x80) is ORed in. NEO firmware up to
    /// 3.3.1 rejects a plain switch to mode code 2, so for those devices
    /// the byte is forced to exactly 0x80.
    ///
    /// The driver's cached mode is updated optimistically; the hardware is
    /// not re-queried. Switching away from the active transport does not
    /// reopen the device — see [`use_transport`](Self::use_transport).
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedMode`] before any I/O if the device
    /// lacks a transport the mode requires, or the driver's error if the
    /// command fails.
    pub async fn set_mode(
        &mut self,
        mode: Mode,
        cr_timeout: u8,
        autoeject_time: Option<u8>,
    ) -> Result<()> {
        if !self.has_mode(mode) {
            return Err(Error::UnsupportedMode { mode });
        }
        let flags = mode_command_byte(self.version(), mode, autoeject_time.is_some());
        debug!(%mode, flags, "switching device mode");
        self.driver
            .set_mode(flags, cr_timeout, autoeject_time.unwrap_or(0))
            .await?;
        self.driver.set_cached_mode(mode);
        Ok(())
    }

    /// Reopen the device over another of its enabled transports.
    ///
    /// Consumes the handle: the old driver is dropped before the new open
    /// is attempted, so there are never two live drivers for one device.
    /// Requesting the currently active transport returns the same handle
    /// unchanged, without any I/O.
    ///
    /// After reopening, the new handle must agree with the old one on
    /// serial (when both know it) and mode; a mismatch means the hardware
    /// changed under us and is a fatal consistency fault.
    ///
    /// # Errors
    /// - [`Error::TransportNotEnabled`] if the current mode does not enable
    ///   the requested transport (checked before any I/O).
    /// - [`Error::DeviceNotFound`] if rediscovery finds nothing.
    /// - [`Error::SerialMismatch`] / [`Error::ModeMismatch`] on a
    ///   post-switch consistency fault.
    pub async fn use_transport(self, transport: Transport) -> Result<YubiKey> {
        if self.transport() == transport {
            return Ok(self);
        }
        if !self.mode().has_transport(transport) {
            return Err(Error::TransportNotEnabled { transport });
        }
        let expected_mode = self.mode();
        let expected_serial = self.serial;

        let YubiKey {
            driver, backend, ..
        } = self;
        // Strict ownership transfer: the old driver is gone before the new
        // open is attempted.
        drop(driver);

        debug!(%transport, "reopening device over new transport");
        let device = open_device(&backend, transport.flag())
            .await?
            .ok_or(Error::DeviceNotFound { transport })?;

        if let (Some(expected), Some(actual)) = (expected_serial, device.serial) {
            if expected != actual {
                return Err(Error::SerialMismatch { expected, actual });
            }
        }
        if device.mode() != expected_mode {
            return Err(Error::ModeMismatch {
                expected: expected_mode,
                actual: device.mode(),
            });
        }
        Ok(device)
    }
}

impl fmt::Debug for YubiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YubiKey")
            .field("device_name", &self.device_name())
            .field("version", &self.version())
            .field("transport", &self.transport())
            .field("mode", &self.mode())
            .field("serial", &self.serial)
            .field("capabilities", &self.capabilities())
            .field("enabled", &self.enabled())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for YubiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}] serial: {} CAP: {:x}",
            self.device_name(),
            self.version(),
            self.mode(),
            self.transport(),
            self.serial.map_or_else(|| "-".to_string(), |s| s.to_string()),
            self.capabilities().bits(),
        )
    }
}

/// Compute the raw command byte for a mode switch.
fn mode_command_byte(version: Version, mode: Mode, touch_eject: bool) -> u8 {
    let mut flags = mode.code();
    if touch_eject {
        flags |= FLAG_TOUCH_EJECT;
    }
    // NEO <= 3.3.1 must receive exactly 0x80 for mode code 2.
    if version <= NEO_QUIRK_MAX_VERSION && mode.code() == NEO_QUIRK_MODE_CODE {
        flags = FLAG_TOUCH_EJECT;
    }
    flags
}
