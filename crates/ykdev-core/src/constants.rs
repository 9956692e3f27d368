//! Protocol-level constants for YubiKey device management.
//!
//! These values are fixed by the device firmware; changing them breaks
//! compatibility with real hardware.

// ============================================================================
// Capability blob tags (YubiKey 4 and later)
// ============================================================================

/// TLV tag carrying the supported-capability bitmask.
pub const TAG_CAPABILITIES: u8 = 0x01;

/// TLV tag carrying the device serial number.
pub const TAG_SERIAL: u8 = 0x02;

/// TLV tag carrying the enabled-capability bitmask.
///
/// Absent on firmware that predates per-application toggling; in that case
/// everything supported is considered enabled.
pub const TAG_ENABLED: u8 = 0x03;

// ============================================================================
// Mode-switch command flags
// ============================================================================

/// Flag bit requesting touch-eject behavior in a mode-switch command.
pub const FLAG_TOUCH_EJECT: u8 = 0x80;

/// Mode code affected by the NEO flag-byte quirk.
///
/// NEO firmware up to [`NEO_QUIRK_MAX_VERSION`] rejects a plain mode-switch
/// to this code; the command must carry [`FLAG_TOUCH_EJECT`] alone instead.
pub const NEO_QUIRK_MODE_CODE: u8 = 0x02;

/// Newest firmware exhibiting the NEO mode-switch quirk.
pub const NEO_QUIRK_MAX_VERSION: crate::types::Version = crate::types::Version::new(3, 3, 1);

// ============================================================================
// Capability bitmask pattern overrides
// ============================================================================

/// Capability pattern reported by the YubiKey Edge.
///
/// The Edge reports OTP|U2F|CCID but has no usable CCID stack; a device
/// whose decoded mask equals this value exactly is reclassified.
pub const EDGE_CAPABILITY_PATTERN: u32 = 0x07;
