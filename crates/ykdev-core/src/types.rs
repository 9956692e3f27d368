use crate::{Result, constants::FLAG_TOUCH_EJECT, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

// ============================================================================
// Capability bitmask
// ============================================================================

/// Set of device capabilities, represented as ORed bit flags.
///
/// The low three bits double as transport flags (OTP, U2F, CCID); the
/// remaining bits describe applications that ride on top of a transport.
/// A capability being *supported* does not mean it is *enabled*: the device
/// handle tracks both masks, and enabled is always a subset of supported.
///
/// # Examples
///
/// ```
/// use ykdev_core::Capability;
///
/// let caps = Capability::OTP | Capability::U2F;
/// assert!(caps.contains(Capability::OTP));
/// assert!(!caps.contains(Capability::CCID));
/// assert_eq!(caps.to_string(), "OTP+U2F");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(u32);

impl Capability {
    /// No capabilities.
    pub const EMPTY: Capability = Capability(0);

    /// OTP keyboard emulation.
    pub const OTP: Capability = Capability(0x01);

    /// FIDO U2F HID.
    pub const U2F: Capability = Capability(0x02);

    /// CCID smartcard.
    pub const CCID: Capability = Capability(0x04);

    /// OpenPGP application (over CCID).
    pub const OPGP: Capability = Capability(0x08);

    /// PIV application (over CCID).
    pub const PIV: Capability = Capability(0x10);

    /// OATH application (over CCID).
    pub const OATH: Capability = Capability(0x20);

    /// Sum of all transport flags, usable as a mask.
    pub const TRANSPORTS: Capability =
        Capability(Capability::OTP.0 | Capability::U2F.0 | Capability::CCID.0);

    /// Create a capability set from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Capability(bits)
    }

    /// Get the raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Capability) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The transport flags of this set.
    #[must_use]
    pub const fn transports(self) -> Capability {
        Capability(self.0 & Capability::TRANSPORTS.0)
    }

    const NAMED: [(Capability, &'static str); 6] = [
        (Capability::OTP, "OTP"),
        (Capability::U2F, "U2F"),
        (Capability::CCID, "CCID"),
        (Capability::OPGP, "OPGP"),
        (Capability::PIV, "PIV"),
        (Capability::OATH, "OATH"),
    ];
}

impl BitOr for Capability {
    type Output = Capability;

    fn bitor(self, rhs: Capability) -> Capability {
        Capability(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capability {
    fn bitor_assign(&mut self, rhs: Capability) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Capability {
    type Output = Capability;

    fn bitand(self, rhs: Capability) -> Capability {
        Capability(self.0 & rhs.0)
    }
}

impl BitAndAssign for Capability {
    fn bitand_assign(&mut self, rhs: Capability) {
        self.0 &= rhs.0;
    }
}

impl Not for Capability {
    type Output = Capability;

    fn not(self) -> Capability {
        Capability(!self.0)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        let mut first = true;
        for (flag, name) in Capability::NAMED {
            if self.contains(flag) {
                if !first {
                    write!(f, "+")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        let unnamed = self.0 & !Capability::NAMED.iter().fold(0, |acc, (c, _)| acc | c.0);
        if unnamed != 0 {
            if !first {
                write!(f, "+")?;
            }
            write!(f, "{unnamed:#04x}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Physical/logical channel used to talk to the device.
///
/// Each transport has a disjoint power-of-two bit flag so transports can be
/// combined into a [`Capability`] mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    /// OTP keyboard emulation over USB HID.
    Otp,
    /// FIDO U2F over USB HID.
    U2f,
    /// Smartcard over CCID.
    Ccid,
}

impl Transport {
    /// All transports, in no particular order.
    pub const ALL: [Transport; 3] = [Transport::Otp, Transport::U2f, Transport::Ccid];

    /// The bit flag of this transport.
    ///
    /// # Examples
    ///
    /// ```
    /// use ykdev_core::{Capability, Transport};
    ///
    /// assert_eq!(Transport::Otp.flag(), Capability::OTP);
    /// assert_eq!(Transport::U2f.flag(), Capability::U2F);
    /// assert_eq!(Transport::Ccid.flag(), Capability::CCID);
    /// ```
    #[must_use]
    pub const fn flag(self) -> Capability {
        match self {
            Transport::Otp => Capability::OTP,
            Transport::U2f => Capability::U2F,
            Transport::Ccid => Capability::CCID,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Otp => write!(f, "OTP"),
            Transport::U2f => write!(f, "U2F"),
            Transport::Ccid => write!(f, "CCID"),
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OTP" => Ok(Transport::Otp),
            "U2F" | "FIDO" => Ok(Transport::U2f),
            "CCID" => Ok(Transport::Ccid),
            _ => Err(Error::unsupported(format!("unknown transport: {s}"))),
        }
    }
}

// ============================================================================
// Mode
// ============================================================================

/// Pairing of a numeric mode code and the transport set it enables.
///
/// Devices report a current `Mode` and may be asked to switch to another.
/// The code-to-transports mapping is fixed by firmware.
///
/// # Examples
///
/// ```
/// use ykdev_core::{Capability, Mode, Transport};
///
/// let mode = Mode::from_code(0x02).unwrap();
/// assert_eq!(mode.transports(), Capability::OTP | Capability::CCID);
/// assert!(mode.has_transport(Transport::Otp));
/// assert!(!mode.has_transport(Transport::U2f));
/// assert_eq!(mode.to_string(), "OTP+CCID");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mode {
    code: u8,
    transports: Capability,
}

/// Firmware mode table, in code order.
const MODE_TABLE: [Mode; 7] = [
    Mode::OTP,
    Mode::CCID,
    Mode::OTP_CCID,
    Mode::U2F,
    Mode::OTP_U2F,
    Mode::U2F_CCID,
    Mode::OTP_U2F_CCID,
];

impl Mode {
    /// OTP only (code 0x00).
    pub const OTP: Mode = Mode::table_entry(0x00, Capability::OTP);
    /// CCID only (code 0x01).
    pub const CCID: Mode = Mode::table_entry(0x01, Capability::CCID);
    /// OTP and CCID (code 0x02).
    pub const OTP_CCID: Mode = Mode::table_entry(0x02, Capability(0x01 | 0x04));
    /// U2F only (code 0x03).
    pub const U2F: Mode = Mode::table_entry(0x03, Capability::U2F);
    /// OTP and U2F (code 0x04).
    pub const OTP_U2F: Mode = Mode::table_entry(0x04, Capability(0x01 | 0x02));
    /// U2F and CCID (code 0x05).
    pub const U2F_CCID: Mode = Mode::table_entry(0x05, Capability(0x02 | 0x04));
    /// All transports (code 0x06).
    pub const OTP_U2F_CCID: Mode = Mode::table_entry(0x06, Capability::TRANSPORTS);

    const fn table_entry(code: u8, transports: Capability) -> Mode {
        Mode { code, transports }
    }
    /// Look up the mode for a raw code as reported by the device.
    ///
    /// The touch-eject flag bit (0x80) is ignored when present; it modifies
    /// behavior, not the transport set.
    ///
    /// # Errors
    /// Returns [`Error::InvalidModeCode`] if the code is not in the firmware
    /// mode table.
    pub fn from_code(code: u8) -> Result<Self> {
        let bare = code & !FLAG_TOUCH_EJECT;
        MODE_TABLE
            .iter()
            .find(|mode| mode.code == bare)
            .copied()
            .ok_or(Error::InvalidModeCode { code })
    }

    /// Look up the mode enabling exactly the given transport set.
    ///
    /// # Errors
    /// Returns [`Error::InvalidModeTransports`] if no mode code corresponds
    /// to the combination (e.g. the empty set).
    pub fn from_transports(transports: Capability) -> Result<Self> {
        let mask = transports.transports();
        MODE_TABLE
            .iter()
            .find(|mode| mode.transports == mask)
            .copied()
            .ok_or(Error::InvalidModeTransports { mask: mask.bits() })
    }

    /// The numeric code of this mode.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.code
    }

    /// The transports this mode enables.
    #[must_use]
    pub const fn transports(self) -> Capability {
        self.transports
    }

    /// Returns `true` if this mode has the given transport enabled.
    #[must_use]
    pub const fn has_transport(self, transport: Transport) -> bool {
        self.transports.contains(transport.flag())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.transports)
    }
}

// ============================================================================
// Version
// ============================================================================

/// Firmware version triple.
///
/// Ordering is lexicographic over (major, minor, patch), which is what
/// device classification relies on.
///
/// # Examples
///
/// ```
/// use ykdev_core::Version;
///
/// assert!(Version::new(4, 1, 0) > Version::new(4, 0, 9));
/// assert_eq!(Version::new(3, 4, 3).to_string(), "3.4.3");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    /// Create a new version triple.
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl From<(u8, u8, u8)> for Version {
    fn from((major, minor, patch): (u8, u8, u8)) -> Self {
        Version::new(major, minor, patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('.');
        let mut next = || -> Result<u8> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| Error::unsupported(format!("invalid version string: {s}")))
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(Error::unsupported(format!("invalid version string: {s}")));
        }
        Ok(version)
    }
}
