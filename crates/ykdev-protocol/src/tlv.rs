//! Flat tag-length-value codec.
//!
//! Wire format: one tag byte, one length byte, then `length` value bytes,
//! repeated. There is no terminator; the end of the buffer ends the list.
//! Decoding is strict: a record whose declared length exceeds the remaining
//! bytes, or a buffer that ends inside a record header, is malformed input.

use bytes::Bytes;
use std::collections::BTreeMap;
use ykdev_core::{Error, Result};

/// Maximum value length representable by the one-byte length field.
const MAX_VALUE_LENGTH: usize = u8::MAX as usize;

/// A single decoded tag-length-value record.
///
/// # Examples
///
/// ```
/// use ykdev_protocol::Tlv;
///
/// let tlv = Tlv::new(0x01, vec![0x03, 0x07]).unwrap();
/// assert_eq!(tlv.tag(), 0x01);
/// assert_eq!(tlv.value(), &[0x03, 0x07]);
/// assert_eq!(tlv.encode(), vec![0x01, 0x02, 0x03, 0x07]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: u8,
    value: Bytes,
}

impl Tlv {
    /// Create a record from a tag and value bytes.
    ///
    /// # Errors
    /// Returns [`Error::TlvValueTooLong`] if the value exceeds 255 bytes,
    /// which cannot be represented in the one-byte length field.
    pub fn new(tag: u8, value: impl Into<Bytes>) -> Result<Self> {
        let value = value.into();
        if value.len() > MAX_VALUE_LENGTH {
            return Err(Error::TlvValueTooLong {
                length: value.len(),
            });
        }
        Ok(Tlv { tag, value })
    }

    /// The record tag.
    #[must_use]
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The raw value bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consume the record, returning its value.
    #[must_use]
    pub fn into_value(self) -> Bytes {
        self.value
    }

    /// Encoded size of this record: header plus value.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        2 + self.value.len()
    }

    /// Encode this record to its wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Append the wire form of this record to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.tag);
        // Length fits by construction; Tlv::new rejects longer values.
        buf.push(self.value.len() as u8);
        buf.extend_from_slice(&self.value);
    }
}

/// Decode consecutive TLV records, preserving order and duplicates.
///
/// # Errors
/// Returns [`Error::MalformedTlv`] if the buffer ends inside a record header
/// or a record declares more value bytes than remain.
///
/// # Examples
///
/// ```
/// use ykdev_protocol::parse_tlvs;
///
/// let records = parse_tlvs(&[0x01, 0x01, 0xaa, 0x02, 0x00]).unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].tag(), 0x01);
/// assert_eq!(records[0].value(), &[0xaa]);
/// assert_eq!(records[1].value(), &[] as &[u8]);
/// ```
pub fn parse_tlvs(data: &[u8]) -> Result<Vec<Tlv>> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let tag = data[offset];
        let Some(&length) = data.get(offset + 1) else {
            return Err(Error::malformed_tlv(format!(
                "tag {tag:#04x} at offset {offset} has no length byte"
            )));
        };
        let length = length as usize;
        let start = offset + 2;
        let end = start + length;
        if end > data.len() {
            return Err(Error::malformed_tlv(format!(
                "tag {tag:#04x} at offset {offset} declares {length} value bytes, {} remain",
                data.len() - start
            )));
        }
        records.push(Tlv {
            tag,
            value: Bytes::copy_from_slice(&data[start..end]),
        });
        offset = end;
    }
    Ok(records)
}

/// Decode a TLV list into a tag-to-value mapping.
///
/// If the same tag appears more than once, the later occurrence wins; the
/// result is a mapping, not a multimap.
///
/// # Errors
/// Returns [`Error::MalformedTlv`] on truncated or malformed input.
///
/// # Examples
///
/// ```
/// use ykdev_protocol::parse_tlv_list;
///
/// // Tag 0x01 appears twice; only the later value survives.
/// let map = parse_tlv_list(&[0x01, 0x01, 0xaa, 0x01, 0x01, 0xbb]).unwrap();
/// assert_eq!(map[&0x01].as_ref(), &[0xbb]);
/// ```
pub fn parse_tlv_list(data: &[u8]) -> Result<BTreeMap<u8, Bytes>> {
    let mut map = BTreeMap::new();
    for record in parse_tlvs(data)? {
        map.insert(record.tag, record.value);
    }
    Ok(map)
}

/// Encode records back to their wire form, in the given order.
///
/// For any well-formed input, `encode_tlvs(&parse_tlvs(data)?)` reproduces
/// `data` byte for byte.
#[must_use]
pub fn encode_tlvs(records: &[Tlv]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(records.iter().map(Tlv::encoded_len).sum());
    for record in records {
        record.encode_into(&mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_empty_buffer() {
        assert!(parse_tlvs(&[]).unwrap().is_empty());
        assert!(parse_tlv_list(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_single_record() {
        let map = parse_tlv_list(&[0x01, 0x02, 0x3f, 0x00]).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&0x01].as_ref(), &[0x3f, 0x00]);
    }

    #[test]
    fn test_parse_zero_length_value() {
        let records = parse_tlvs(&[0x05, 0x00]).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].value().is_empty());
    }

    #[test]
    fn test_parse_multiple_records() {
        let data = [0x01, 0x01, 0x3f, 0x02, 0x04, 0x00, 0x4e, 0x39, 0x95, 0x03, 0x01, 0x3b];
        let map = parse_tlv_list(&data).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map[&0x01].as_ref(), &[0x3f]);
        assert_eq!(map[&0x02].as_ref(), &[0x00, 0x4e, 0x39, 0x95]);
        assert_eq!(map[&0x03].as_ref(), &[0x3b]);
    }

    #[test]
    fn test_duplicate_tag_last_write_wins() {
        let data = [0x01, 0x01, 0xaa, 0x02, 0x01, 0xcc, 0x01, 0x02, 0xbb, 0xbb];
        let map = parse_tlv_list(&data).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&0x01].as_ref(), &[0xbb, 0xbb]);
        assert_eq!(map[&0x02].as_ref(), &[0xcc]);

        // The ordered decode keeps both occurrences.
        let records = parse_tlvs(&data).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[rstest]
    #[case(&[0x01])] // tag with no length byte
    #[case(&[0x01, 0x02, 0xaa])] // declares 2 value bytes, 1 remains
    #[case(&[0x01, 0x01, 0xaa, 0x02, 0xff])] // second record truncated
    fn test_parse_malformed(#[case] data: &[u8]) {
        let error = parse_tlvs(data).unwrap_err();
        assert!(matches!(error, Error::MalformedTlv { .. }));
    }

    #[test]
    fn test_encode_roundtrip() {
        let data = [0x01, 0x01, 0x3f, 0x01, 0x00, 0x02, 0x03, 0x01, 0x02, 0x03];
        let records = parse_tlvs(&data).unwrap();
        assert_eq!(encode_tlvs(&records), data);
    }

    #[test]
    fn test_value_too_long_rejected() {
        let error = Tlv::new(0x01, vec![0u8; 256]).unwrap_err();
        assert!(matches!(error, Error::TlvValueTooLong { length: 256 }));

        assert!(Tlv::new(0x01, vec![0u8; 255]).is_ok());
    }
}
