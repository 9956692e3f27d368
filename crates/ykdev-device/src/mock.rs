//! Mock driver and backend for testing and development.
//!
//! [`MockDriver`] simulates one attached device over one transport;
//! [`MockBackend`] is a programmable discovery source that hands out staged
//! drivers per transport. Both can be inspected from the outside through
//! handles, so tests can assert on commands issued after a driver has been
//! consumed by a device handle.

use crate::drivers::AnyDriver;
use crate::traits::{Backend, Driver};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use ykdev_core::{Capability, Error, Mode, Result, Transport, Version};

/// A recorded mode-switch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCommand {
    /// Raw command byte (mode code plus flag bits).
    pub flags: u8,
    /// Challenge-response timeout, seconds.
    pub cr_timeout: u8,
    /// Touch-eject delay, seconds.
    pub autoeject_time: u8,
}

#[derive(Debug)]
struct MockState {
    mode: Mode,
    mode_commands: Vec<ModeCommand>,
    capability_reads: u32,
    capability_probes: u32,
}

fn lock(shared: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock transport driver.
///
/// Identity fields are fixed at build time; the mode and the command log
/// live in shared state observable through the [`MockDriverHandle`].
///
/// # Examples
///
/// ```
/// use ykdev_core::{Transport, Version};
/// use ykdev_device::mock::MockDriverBuilder;
/// use ykdev_device::traits::Driver;
///
/// let (driver, _handle) = MockDriverBuilder::new(Transport::Ccid, Version::new(4, 2, 7))
///     .serial(5126421)
///     .build();
/// assert_eq!(driver.transport(), Transport::Ccid);
/// assert_eq!(driver.serial(), Some(5126421));
/// ```
#[derive(Debug)]
pub struct MockDriver {
    transport: Transport,
    version: Version,
    serial: Option<u32>,
    security_key: bool,
    capability_blob: Vec<u8>,
    probe_result: Capability,
    shared: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// The transport this driver was built for.
    #[must_use]
    pub fn transport_kind(&self) -> Transport {
        self.transport
    }
}

impl Driver for MockDriver {
    fn transport(&self) -> Transport {
        self.transport
    }

    fn version(&self) -> Version {
        self.version
    }

    fn mode(&self) -> Mode {
        lock(&self.shared).mode
    }

    fn serial(&self) -> Option<u32> {
        self.serial
    }

    fn is_security_key(&self) -> bool {
        self.security_key
    }

    async fn read_capabilities(&mut self) -> Result<Vec<u8>> {
        lock(&self.shared).capability_reads += 1;
        Ok(self.capability_blob.clone())
    }

    async fn probe_capabilities_support(&mut self) -> Result<Capability> {
        lock(&self.shared).capability_probes += 1;
        Ok(self.probe_result)
    }

    async fn set_mode(&mut self, flags: u8, cr_timeout: u8, autoeject_time: u8) -> Result<()> {
        lock(&self.shared).mode_commands.push(ModeCommand {
            flags,
            cr_timeout,
            autoeject_time,
        });
        Ok(())
    }

    fn set_cached_mode(&mut self, mode: Mode) {
        lock(&self.shared).mode = mode;
    }
}

/// Handle for observing a [`MockDriver`] from the outside.
///
/// The handle stays valid after the driver has been moved into a device
/// handle, which is exactly when tests want to look at it.
#[derive(Debug, Clone)]
pub struct MockDriverHandle {
    shared: Arc<Mutex<MockState>>,
}

impl MockDriverHandle {
    /// The driver's current cached mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        lock(&self.shared).mode
    }

    /// All mode-switch commands issued so far, oldest first.
    #[must_use]
    pub fn mode_commands(&self) -> Vec<ModeCommand> {
        lock(&self.shared).mode_commands.clone()
    }

    /// The most recent mode-switch command, if any.
    #[must_use]
    pub fn last_mode_command(&self) -> Option<ModeCommand> {
        lock(&self.shared).mode_commands.last().copied()
    }

    /// How many times the capability blob was read.
    #[must_use]
    pub fn capability_reads(&self) -> u32 {
        lock(&self.shared).capability_reads
    }

    /// How many times capabilities were live-probed.
    #[must_use]
    pub fn capability_probes(&self) -> u32 {
        lock(&self.shared).capability_probes
    }
}

/// Builder for [`MockDriver`].
#[derive(Debug, Clone)]
pub struct MockDriverBuilder {
    transport: Transport,
    version: Version,
    mode: Mode,
    serial: Option<u32>,
    security_key: bool,
    capability_blob: Vec<u8>,
    probe_result: Capability,
}

impl MockDriverBuilder {
    /// Start building a driver for the given transport and firmware.
    ///
    /// The initial mode defaults to the single-transport mode matching the
    /// driver's own transport.
    #[must_use]
    pub fn new(transport: Transport, version: Version) -> Self {
        let mode = match transport {
            Transport::Otp => Mode::OTP,
            Transport::U2f => Mode::U2F,
            Transport::Ccid => Mode::CCID,
        };
        MockDriverBuilder {
            transport,
            version,
            mode,
            serial: None,
            security_key: false,
            capability_blob: Vec::new(),
            probe_result: Capability::EMPTY,
        }
    }

    /// Set the device's reported mode.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the serial number reported by the transport.
    #[must_use]
    pub fn serial(mut self, serial: u32) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Mark the device as a Security Key variant.
    #[must_use]
    pub fn security_key(mut self) -> Self {
        self.security_key = true;
        self
    }

    /// Set the raw blob answered to a capability read.
    #[must_use]
    pub fn capability_blob(mut self, blob: Vec<u8>) -> Self {
        self.capability_blob = blob;
        self
    }

    /// Set the capability mask answered to a live probe.
    #[must_use]
    pub fn probe_result(mut self, capabilities: Capability) -> Self {
        self.probe_result = capabilities;
        self
    }

    /// Build the driver and its observation handle.
    #[must_use]
    pub fn build(self) -> (MockDriver, MockDriverHandle) {
        let shared = Arc::new(Mutex::new(MockState {
            mode: self.mode,
            mode_commands: Vec::new(),
            capability_reads: 0,
            capability_probes: 0,
        }));
        let driver = MockDriver {
            transport: self.transport,
            version: self.version,
            serial: self.serial,
            security_key: self.security_key,
            capability_blob: self.capability_blob,
            probe_result: self.probe_result,
            shared: Arc::clone(&shared),
        };
        (driver, MockDriverHandle { shared })
    }
}

#[derive(Debug, Default)]
struct BackendState {
    staged: HashMap<Transport, VecDeque<MockDriver>>,
    failures: HashMap<Transport, String>,
    attempts: Vec<Transport>,
}

/// Programmable discovery backend.
///
/// Tests stage drivers per transport and may arm per-transport failures;
/// discovery pops staged drivers in arrival order. Cloning shares state, so
/// a clone held by a device handle sees drivers staged later — that is what
/// makes transport switching testable.
///
/// # Examples
///
/// ```
/// use ykdev_core::{Transport, Version};
/// use ykdev_device::mock::{MockBackend, MockDriverBuilder};
/// use ykdev_device::traits::Backend;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> ykdev_core::Result<()> {
///     let backend = MockBackend::new();
///     let (driver, _handle) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3)).build();
///     backend.stage(driver);
///
///     assert!(backend.open(Transport::Otp).await?.is_some());
///     assert!(backend.open(Transport::Otp).await?.is_none());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    /// Create an empty backend: every transport reports absence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a driver to be handed out on its transport.
    pub fn stage(&self, driver: MockDriver) {
        let mut state = self.lock_state();
        state
            .staged
            .entry(driver.transport_kind())
            .or_default()
            .push_back(driver);
    }

    /// Arm a failure: opening the given transport will error.
    pub fn fail_transport(&self, transport: Transport, message: impl Into<String>) {
        self.lock_state().failures.insert(transport, message.into());
    }

    /// Every transport open attempted so far, in order.
    #[must_use]
    pub fn open_attempts(&self) -> Vec<Transport> {
        self.lock_state().attempts.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, BackendState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for MockBackend {
    async fn open(&self, transport: Transport) -> Result<Option<AnyDriver>> {
        let mut state = self.lock_state();
        state.attempts.push(transport);
        if let Some(message) = state.failures.get(&transport) {
            return Err(Error::connection_failed(message.clone()));
        }
        let driver = state
            .staged
            .get_mut(&transport)
            .and_then(VecDeque::pop_front);
        Ok(driver.map(AnyDriver::Mock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_driver_records_mode_commands() {
        let (mut driver, handle) =
            MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3)).build();

        driver.set_mode(0x82, 0, 0).await.unwrap();
        driver.set_cached_mode(Mode::OTP_CCID);

        assert_eq!(
            handle.last_mode_command(),
            Some(ModeCommand {
                flags: 0x82,
                cr_timeout: 0,
                autoeject_time: 0
            })
        );
        assert_eq!(handle.mode(), Mode::OTP_CCID);
    }

    #[tokio::test]
    async fn test_mock_driver_counts_capability_io() {
        let (mut driver, handle) = MockDriverBuilder::new(Transport::Ccid, Version::new(4, 1, 0))
            .capability_blob(vec![0x03, 0x01, 0x01, 0x07])
            .probe_result(Capability::OTP | Capability::CCID)
            .build();

        assert_eq!(driver.read_capabilities().await.unwrap(), vec![0x03, 0x01, 0x01, 0x07]);
        assert_eq!(
            driver.probe_capabilities_support().await.unwrap(),
            Capability::OTP | Capability::CCID
        );
        assert_eq!(handle.capability_reads(), 1);
        assert_eq!(handle.capability_probes(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_staging_order() {
        let backend = MockBackend::new();
        let (first, _h1) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 0, 0))
            .serial(1)
            .build();
        let (second, _h2) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 0, 0))
            .serial(2)
            .build();
        backend.stage(first);
        backend.stage(second);

        let opened = backend.open(Transport::Otp).await.unwrap().unwrap();
        assert_eq!(opened.serial(), Some(1));
        let opened = backend.open(Transport::Otp).await.unwrap().unwrap();
        assert_eq!(opened.serial(), Some(2));
        assert!(backend.open(Transport::Otp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_backend_armed_failure() {
        let backend = MockBackend::new();
        backend.fail_transport(Transport::Ccid, "smart card service unavailable");

        let error = backend.open(Transport::Ccid).await.unwrap_err();
        assert!(matches!(error, Error::ConnectionFailed { .. }));
        assert_eq!(backend.open_attempts(), vec![Transport::Ccid]);
    }

    #[tokio::test]
    async fn test_mock_backend_clone_shares_state() {
        let backend = MockBackend::new();
        let clone = backend.clone();

        let (driver, _handle) = MockDriverBuilder::new(Transport::U2f, Version::new(4, 0, 0)).build();
        backend.stage(driver);

        assert!(clone.open(Transport::U2f).await.unwrap().is_some());
    }
}
