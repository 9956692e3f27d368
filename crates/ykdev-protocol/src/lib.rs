//! Binary protocol layer for YubiKey device management.
//!
//! This crate holds the pure, I/O-free parts of the device protocol:
//!
//! - [`tlv`] — the flat tag-length-value codec used by device configuration
//!   blobs: one tag byte, one length byte, `length` value bytes, repeated
//!   until the buffer is exhausted.
//! - [`capabilities`] — the YubiKey 4 capability blob format layered on top
//!   of TLV: a one-byte payload length prefix followed by records for the
//!   supported-capability mask, the serial number, and the enabled mask.
//!
//! Everything here is a pure function over byte buffers; errors are reported
//! through [`ykdev_core::Error`].

pub mod capabilities;
pub mod tlv;

pub use capabilities::{CapabilityInfo, parse_capability_blob};
pub use tlv::{Tlv, encode_tlvs, parse_tlv_list, parse_tlvs};
