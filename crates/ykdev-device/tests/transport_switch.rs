//! Mode switching and transport switching through the device handle.

use ykdev_core::{Capability, Error, Mode, Transport, Version};
use ykdev_device::mock::{MockBackend, MockDriverBuilder, ModeCommand};
use ykdev_device::{AnyBackend, YubiKey, open_device};

async fn open_over(backend: &MockBackend, transport: Transport) -> YubiKey {
    open_device(&AnyBackend::Mock(backend.clone()), transport.flag())
        .await
        .unwrap()
        .expect("driver staged")
}

#[tokio::test]
async fn test_set_mode_issues_command_and_caches_mode() {
    let backend = MockBackend::new();
    let (driver, handle) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP)
        .build();
    backend.stage(driver);

    let mut device = open_over(&backend, Transport::Otp).await;
    device.set_mode(Mode::OTP_U2F_CCID, 15, None).await.unwrap();

    assert_eq!(
        handle.last_mode_command(),
        Some(ModeCommand {
            flags: 0x06,
            cr_timeout: 15,
            autoeject_time: 0
        })
    );
    assert_eq!(device.mode(), Mode::OTP_U2F_CCID);
}

#[tokio::test]
async fn test_set_mode_touch_eject_flag() {
    let backend = MockBackend::new();
    let (driver, handle) = MockDriverBuilder::new(Transport::Ccid, Version::new(4, 2, 7))
        .capability_blob(vec![0x03, 0x01, 0x01, 0x3f])
        .build();
    backend.stage(driver);

    let mut device = open_over(&backend, Transport::Ccid).await;
    device.set_mode(Mode::CCID, 0, Some(30)).await.unwrap();

    assert_eq!(
        handle.last_mode_command(),
        Some(ModeCommand {
            flags: 0x81,
            cr_timeout: 0,
            autoeject_time: 30
        })
    );
}

#[tokio::test]
async fn test_set_mode_neo_quirk_forces_flag_byte() {
    let backend = MockBackend::new();
    let (driver, handle) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 3, 1)).build();
    backend.stage(driver);

    let mut device = open_over(&backend, Transport::Otp).await;
    device.set_mode(Mode::OTP_CCID, 0, None).await.unwrap();

    // Old NEO firmware only accepts mode code 2 as a bare 0x80.
    assert_eq!(handle.last_mode_command().unwrap().flags, 0x80);
    assert_eq!(device.mode(), Mode::OTP_CCID);
}

#[tokio::test]
async fn test_set_mode_unsupported_before_any_io() {
    let backend = MockBackend::new();
    // Legacy device: OTP only.
    let (driver, handle) = MockDriverBuilder::new(Transport::Otp, Version::new(2, 4, 0)).build();
    backend.stage(driver);

    let mut device = open_over(&backend, Transport::Otp).await;
    let error = device.set_mode(Mode::OTP_CCID, 0, None).await.unwrap_err();

    assert!(matches!(error, Error::UnsupportedMode { .. }));
    assert!(handle.mode_commands().is_empty());
    assert_eq!(device.mode(), Mode::OTP);
}

#[tokio::test]
async fn test_use_transport_same_transport_is_a_no_op() {
    let backend = MockBackend::new();
    let (driver, _handle) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .build();
    backend.stage(driver);

    let device = open_over(&backend, Transport::Otp).await;
    let attempts_before = backend.open_attempts().len();

    let device = device.use_transport(Transport::Otp).await.unwrap();
    assert_eq!(device.transport(), Transport::Otp);
    assert_eq!(backend.open_attempts().len(), attempts_before);
}

#[tokio::test]
async fn test_use_transport_rejects_disabled_transport() {
    let backend = MockBackend::new();
    let (driver, _handle) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP)
        .build();
    backend.stage(driver);

    let device = open_over(&backend, Transport::Otp).await;
    let attempts_before = backend.open_attempts().len();

    let error = device.use_transport(Transport::Ccid).await.unwrap_err();
    assert!(matches!(
        error,
        Error::TransportNotEnabled {
            transport: Transport::Ccid
        }
    ));
    // Rejected before touching the backend.
    assert_eq!(backend.open_attempts().len(), attempts_before);
}

#[tokio::test]
async fn test_use_transport_reopens_over_new_transport() {
    let backend = MockBackend::new();
    let (otp, _h1) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .build();
    let (ccid, _h2) = MockDriverBuilder::new(Transport::Ccid, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .probe_result(Capability::TRANSPORTS)
        .build();
    backend.stage(otp);
    backend.stage(ccid);

    let device = open_over(&backend, Transport::Otp).await;
    let device = device.use_transport(Transport::Ccid).await.unwrap();

    assert_eq!(device.transport(), Transport::Ccid);
    assert_eq!(device.serial(), Some(123));
    assert_eq!(device.mode(), Mode::OTP_CCID);
}

#[tokio::test]
async fn test_use_transport_tolerates_missing_serial_on_reopen() {
    let backend = MockBackend::new();
    let (otp, _h1) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .build();
    // CCID side does not report a serial; that is not a mismatch.
    let (ccid, _h2) = MockDriverBuilder::new(Transport::Ccid, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .build();
    backend.stage(otp);
    backend.stage(ccid);

    let device = open_over(&backend, Transport::Otp).await;
    let device = device.use_transport(Transport::Ccid).await.unwrap();
    assert_eq!(device.serial(), None);
}

#[tokio::test]
async fn test_use_transport_device_not_found() {
    let backend = MockBackend::new();
    let (driver, _handle) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .build();
    backend.stage(driver);

    let device = open_over(&backend, Transport::Otp).await;
    let error = device.use_transport(Transport::Ccid).await.unwrap_err();
    assert!(matches!(
        error,
        Error::DeviceNotFound {
            transport: Transport::Ccid
        }
    ));
}

#[tokio::test]
async fn test_use_transport_serial_mismatch() {
    let backend = MockBackend::new();
    let (otp, _h1) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .build();
    let (ccid, _h2) = MockDriverBuilder::new(Transport::Ccid, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(999)
        .build();
    backend.stage(otp);
    backend.stage(ccid);

    let device = open_over(&backend, Transport::Otp).await;
    let error = device.use_transport(Transport::Ccid).await.unwrap_err();
    assert!(matches!(
        error,
        Error::SerialMismatch {
            expected: 123,
            actual: 999
        }
    ));
}

#[tokio::test]
async fn test_use_transport_mode_mismatch() {
    let backend = MockBackend::new();
    let (otp, _h1) = MockDriverBuilder::new(Transport::Otp, Version::new(3, 4, 3))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .build();
    // Reopened driver reports a different mode than the one we left.
    let (ccid, _h2) = MockDriverBuilder::new(Transport::Ccid, Version::new(3, 4, 3))
        .mode(Mode::CCID)
        .serial(123)
        .build();
    backend.stage(otp);
    backend.stage(ccid);

    let device = open_over(&backend, Transport::Otp).await;
    let error = device.use_transport(Transport::Ccid).await.unwrap_err();
    assert!(matches!(error, Error::ModeMismatch { .. }));
}

#[tokio::test]
async fn test_set_mode_then_switch_transport() {
    let backend = MockBackend::new();
    let (otp, handle) = MockDriverBuilder::new(Transport::Otp, Version::new(4, 2, 7))
        .mode(Mode::OTP)
        .serial(123)
        .capability_blob(vec![0x03, 0x01, 0x01, 0x3f])
        .build();
    let (ccid, _h2) = MockDriverBuilder::new(Transport::Ccid, Version::new(4, 2, 7))
        .mode(Mode::OTP_CCID)
        .serial(123)
        .capability_blob(vec![0x03, 0x01, 0x01, 0x3f])
        .build();
    backend.stage(otp);
    backend.stage(ccid);

    let mut device = open_over(&backend, Transport::Otp).await;
    device.set_mode(Mode::OTP_CCID, 0, None).await.unwrap();
    assert_eq!(handle.last_mode_command().unwrap().flags, 0x02);

    let device = device.use_transport(Transport::Ccid).await.unwrap();
    assert_eq!(device.transport(), Transport::Ccid);
    assert_eq!(device.mode(), Mode::OTP_CCID);
}
