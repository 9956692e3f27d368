//! YubiKey 4 capability blob parsing.
//!
//! Firmware 4.1 and later answers the capability query with a blob framed as
//! a one-byte payload length followed by TLV records:
//!
//! ```text
//! LEN | 0x01 len mask... | 0x02 len serial... | 0x03 len enabled...
//! ```
//!
//! Tag 0x01 carries the supported-capability bitmask, tag 0x02 the serial
//! number, tag 0x03 the enabled-capability bitmask. Integers are big-endian
//! over however many value bytes the record carries. Tag 0x03 is absent on
//! firmware without per-application toggling; the enabled mask then defaults
//! to the full supported mask.

use crate::tlv::parse_tlv_list;
use ykdev_core::constants::{TAG_CAPABILITIES, TAG_ENABLED, TAG_SERIAL};
use ykdev_core::{Capability, Error, Result};

/// Decoded contents of a capability blob.
///
/// Every field is optional: an empty blob decodes to an empty info, and a
/// blob may carry any subset of the tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityInfo {
    /// Supported-capability bitmask (tag 0x01).
    pub capabilities: Option<Capability>,

    /// Device serial number (tag 0x02).
    pub serial: Option<u32>,

    /// Enabled-capability bitmask (tag 0x03, defaulted to `capabilities`
    /// when the tag is absent).
    pub enabled: Option<Capability>,
}

impl CapabilityInfo {
    /// Returns `true` if the blob carried no recognized tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_none() && self.serial.is_none() && self.enabled.is_none()
    }
}

/// Parse a capability blob as returned by the device.
///
/// Empty input yields an empty [`CapabilityInfo`]; some firmware answers the
/// query with no data at all. The payload is truncated to the declared
/// length byte (and to the bytes actually present) before TLV decoding, so
/// trailing garbage past the declared length is ignored.
///
/// # Errors
/// Returns [`Error::MalformedTlv`] if the payload is not a well-formed TLV
/// list or an integer value is wider than four bytes.
///
/// # Examples
///
/// ```
/// use ykdev_core::Capability;
/// use ykdev_protocol::parse_capability_blob;
///
/// // length 9, capabilities OTP|U2F, serial 0x00100107
/// let blob = [0x09, 0x01, 0x01, 0x03, 0x02, 0x04, 0x00, 0x10, 0x01, 0x07];
/// let info = parse_capability_blob(&blob).unwrap();
/// assert_eq!(info.capabilities, Some(Capability::OTP | Capability::U2F));
/// assert_eq!(info.serial, Some(0x0010_0107));
/// // Tag 0x03 absent: enabled defaults to the supported mask.
/// assert_eq!(info.enabled, info.capabilities);
/// ```
pub fn parse_capability_blob(data: &[u8]) -> Result<CapabilityInfo> {
    if data.is_empty() {
        return Ok(CapabilityInfo::default());
    }

    let declared = data[0] as usize;
    let end = data.len().min(1 + declared);
    let map = parse_tlv_list(&data[1..end])?;

    let capabilities = map
        .get(&TAG_CAPABILITIES)
        .map(|value| be_uint(value).map(Capability::from_bits))
        .transpose()?;
    let serial = map.get(&TAG_SERIAL).map(|value| be_uint(value)).transpose()?;
    let enabled = map
        .get(&TAG_ENABLED)
        .map(|value| be_uint(value).map(Capability::from_bits))
        .transpose()?
        .or(capabilities);

    Ok(CapabilityInfo {
        capabilities,
        serial,
        enabled,
    })
}

/// Big-endian unsigned integer over up to four value bytes.
fn be_uint(bytes: &[u8]) -> Result<u32> {
    if bytes.len() > 4 {
        return Err(Error::malformed_tlv(format!(
            "integer value of {} bytes exceeds 4",
            bytes.len()
        )));
    }
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn blob(payload: &[u8]) -> Vec<u8> {
        let mut data = vec![payload.len() as u8];
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_empty_blob() {
        let info = parse_capability_blob(&[]).unwrap();
        assert!(info.is_empty());
    }

    #[test]
    fn test_zero_length_blob() {
        let info = parse_capability_blob(&[0x00]).unwrap();
        assert!(info.is_empty());
    }

    #[test]
    fn test_all_tags() {
        let data = blob(&[
            0x01, 0x02, 0x00, 0x3f, // capabilities
            0x02, 0x04, 0x00, 0x4e, 0x39, 0x95, // serial 5126549
            0x03, 0x01, 0x3b, // enabled
        ]);
        let info = parse_capability_blob(&data).unwrap();
        assert_eq!(info.capabilities, Some(Capability::from_bits(0x3f)));
        assert_eq!(info.serial, Some(5_126_549));
        assert_eq!(info.enabled, Some(Capability::from_bits(0x3b)));
    }

    #[test]
    fn test_enabled_defaults_to_capabilities() {
        let data = blob(&[0x01, 0x01, 0x07]);
        let info = parse_capability_blob(&data).unwrap();
        assert_eq!(info.capabilities, Some(Capability::from_bits(0x07)));
        assert_eq!(info.enabled, Some(Capability::from_bits(0x07)));
    }

    #[test]
    fn test_trailing_bytes_past_declared_length_ignored() {
        let mut data = blob(&[0x01, 0x01, 0x07]);
        data.extend_from_slice(&[0xde, 0xad]); // past declared length
        let info = parse_capability_blob(&data).unwrap();
        assert_eq!(info.capabilities, Some(Capability::from_bits(0x07)));
    }

    #[test]
    fn test_declared_length_past_end_is_truncated() {
        // Declares 0x20 payload bytes, only 3 present.
        let data = [0x20, 0x01, 0x01, 0x07];
        let info = parse_capability_blob(&data).unwrap();
        assert_eq!(info.capabilities, Some(Capability::from_bits(0x07)));
    }

    #[rstest]
    #[case(blob(&[0x01]))] // truncated record header
    #[case(blob(&[0x01, 0x05, 0x07]))] // record longer than payload
    #[case(blob(&[0x02, 0x05, 0x01, 0x02, 0x03, 0x04, 0x05]))] // 5-byte integer
    fn test_malformed_blob(#[case] data: Vec<u8>) {
        let error = parse_capability_blob(&data).unwrap_err();
        assert!(matches!(error, Error::MalformedTlv { .. }));
    }

    #[test]
    fn test_unknown_tags_ignored() {
        let data = blob(&[0x7f, 0x01, 0xff, 0x01, 0x01, 0x02]);
        let info = parse_capability_blob(&data).unwrap();
        assert_eq!(info.capabilities, Some(Capability::U2F));
        assert_eq!(info.serial, None);
    }
}
