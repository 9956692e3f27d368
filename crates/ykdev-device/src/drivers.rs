//! Enum wrappers for driver and backend dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) is not object-safe,
//! so `Box<dyn Driver>` cannot be used. These enums provide concrete type
//! dispatch at compile time instead: zero-cost abstraction, type-safe
//! extensibility, and a clear slot for feature-gated hardware variants.

use crate::mock::{MockBackend, MockDriver};
use crate::traits::{Backend, Driver};
use ykdev_core::{Capability, Mode, Result, Transport, Version};

/// Enum wrapper for driver dispatch.
///
/// Each variant is one transport driver implementation; all of them are
/// used through the [`Driver`] trait.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDriver {
    /// Mock driver for development and testing.
    Mock(MockDriver),
    // TODO: hardware variants behind the hardware-pcsc and hardware-hid
    // features, backed by the pcsc and hidapi crates.
}

impl Driver for AnyDriver {
    fn transport(&self) -> Transport {
        match self {
            Self::Mock(driver) => driver.transport(),
        }
    }

    fn version(&self) -> Version {
        match self {
            Self::Mock(driver) => driver.version(),
        }
    }

    fn mode(&self) -> Mode {
        match self {
            Self::Mock(driver) => driver.mode(),
        }
    }

    fn serial(&self) -> Option<u32> {
        match self {
            Self::Mock(driver) => driver.serial(),
        }
    }

    fn is_security_key(&self) -> bool {
        match self {
            Self::Mock(driver) => driver.is_security_key(),
        }
    }

    async fn read_capabilities(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Mock(driver) => driver.read_capabilities().await,
        }
    }

    async fn probe_capabilities_support(&mut self) -> Result<Capability> {
        match self {
            Self::Mock(driver) => driver.probe_capabilities_support().await,
        }
    }

    async fn set_mode(&mut self, flags: u8, cr_timeout: u8, autoeject_time: u8) -> Result<()> {
        match self {
            Self::Mock(driver) => driver.set_mode(flags, cr_timeout, autoeject_time).await,
        }
    }

    fn set_cached_mode(&mut self, mode: Mode) {
        match self {
            Self::Mock(driver) => driver.set_cached_mode(mode),
        }
    }
}

/// Enum wrapper for backend dispatch.
///
/// A backend is cloned into every device handle it opens, so a handle can
/// re-run discovery when switching transport.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyBackend {
    /// Mock backend for development and testing.
    Mock(MockBackend),
    // TODO: hardware backend opening pcsc/hidapi drivers per transport,
    // behind the hardware-pcsc and hardware-hid features.
}

impl Backend for AnyBackend {
    async fn open(&self, transport: Transport) -> Result<Option<AnyDriver>> {
        match self {
            Self::Mock(backend) => backend.open(transport).await,
        }
    }
}
