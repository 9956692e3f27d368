//! Device discovery.
//!
//! Discovery tries each transport in a fixed priority order and stops at
//! the first one with a device present. A transport failing to open is
//! fatal for the whole attempt; a transport with no device present is not.

use crate::device::YubiKey;
use crate::drivers::AnyBackend;
use crate::traits::Backend;
use tracing::{debug, warn};
use ykdev_core::{Capability, Error, Result, Transport};

/// Transport priority during discovery: smartcard first, then OTP, then
/// U2F.
pub const DISCOVERY_ORDER: [Transport; 3] = [Transport::Ccid, Transport::Otp, Transport::U2f];

/// Open the first device found over any transport in the mask.
///
/// Transports outside `transports` are never attempted. The first
/// transport yielding a driver wins and the rest are not tried.
///
/// Returns `Ok(None)` when every attempted transport reports absence:
/// no device plugged in is not an error.
///
/// # Errors
/// - [`Error::FailedOpeningDevice`] wrapping the underlying error if any
///   transport fails while opening; later transports are deliberately not
///   tried, since a failing transport layer makes the bus state unknown.
/// - Classification errors (capability I/O, TLV decode faults) from the
///   device that was found.
///
/// # Examples
///
/// ```
/// use ykdev_core::Capability;
/// use ykdev_device::mock::MockBackend;
/// use ykdev_device::{AnyBackend, open_device};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> ykdev_core::Result<()> {
///     let backend = AnyBackend::Mock(MockBackend::new());
///     let device = open_device(&backend, Capability::TRANSPORTS).await?;
///     assert!(device.is_none());
///     Ok(())
/// }
/// ```
pub async fn open_device(
    backend: &AnyBackend,
    transports: Capability,
) -> Result<Option<YubiKey>> {
    let mut found = None;
    for transport in DISCOVERY_ORDER {
        if !transports.contains(transport.flag()) {
            continue;
        }
        debug!(%transport, "attempting to open device");
        match backend.open(transport).await {
            Ok(Some(driver)) => {
                debug!(%transport, "device present");
                found = Some(driver);
                break;
            }
            Ok(None) => {
                debug!(%transport, "no device present");
            }
            Err(error) => {
                warn!(%transport, %error, "transport failed while opening");
                return Err(Error::failed_opening_device(error));
            }
        }
    }
    match found {
        Some(driver) => Ok(Some(YubiKey::open(backend.clone(), driver).await?)),
        None => Ok(None),
    }
}
