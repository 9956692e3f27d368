//! Device classification.
//!
//! Given an opened driver, classification determines the device name, the
//! supported-capability mask, and the enabled-capability mask. The decision
//! procedure is an ordered list of (predicate, classifier) rules evaluated
//! top to bottom; the first matching rule wins. All hardware I/O happens up
//! front when the [`Snapshot`] is gathered, so the rules themselves are
//! pure and testable in isolation.

use crate::drivers::AnyDriver;
use crate::traits::Driver;
use tracing::debug;
use ykdev_core::constants::EDGE_CAPABILITY_PATTERN;
use ykdev_core::{Capability, Mode, Result, Transport, Version};
use ykdev_protocol::parse_capability_blob;

const V3_0_0: Version = Version::new(3, 0, 0);
const V3_3_0: Version = Version::new(3, 3, 0);
const V4_0_0: Version = Version::new(4, 0, 0);
const V4_1_0: Version = Version::new(4, 1, 0);

/// Everything classification needs, read from the driver in one pass.
///
/// The capability blob is read only on firmware that has one (4.1.0 and
/// later), and a live probe is issued only where classification will use it
/// (NEO-generation firmware over CCID).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub transport: Transport,
    pub version: Version,
    pub mode: Mode,
    pub security_key: bool,
    pub capability_blob: Option<Vec<u8>>,
    pub probed: Option<Capability>,
}

impl Snapshot {
    /// Gather a snapshot from an open driver.
    ///
    /// # Errors
    /// Propagates capability read/probe failures and leaves classification
    /// to surface TLV decode faults later.
    pub async fn gather(driver: &mut AnyDriver) -> Result<Snapshot> {
        let transport = driver.transport();
        let version = driver.version();
        let mode = driver.mode();
        let security_key = transport == Transport::U2f && driver.is_security_key();

        let capability_blob = if !security_key && version >= V4_1_0 {
            Some(driver.read_capabilities().await?)
        } else {
            None
        };
        let probed = if !security_key
            && transport == Transport::Ccid
            && version >= V3_0_0
            && version < V4_0_0
        {
            Some(driver.probe_capabilities_support().await?)
        } else {
            None
        };

        Ok(Snapshot {
            transport,
            version,
            mode,
            security_key,
            capability_blob,
            probed,
        })
    }
}

/// Final classification of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Marketing name of the device generation.
    pub device_name: &'static str,
    /// Capabilities the hardware supports.
    pub capabilities: Capability,
    /// Capabilities currently enabled; always a subset of `capabilities`.
    pub enabled: Capability,
    /// Serial number from the capability blob, if it carried one.
    pub serial: Option<u32>,
}

/// What a single rule decides; the enabled mask may be left open for the
/// mode-derived default.
#[derive(Debug, Clone, Copy)]
struct Outcome {
    device_name: &'static str,
    capabilities: Capability,
    enabled: Option<Capability>,
    serial: Option<u32>,
}

struct Rule {
    name: &'static str,
    matches: fn(&Snapshot) -> bool,
    classify: fn(&Snapshot) -> Result<Outcome>,
}

/// Classification rules, evaluated in order; the first match wins.
/// The last rule matches unconditionally.
const RULES: [Rule; 5] = [
    Rule {
        name: "security-key",
        matches: |snapshot| snapshot.security_key,
        classify: classify_security_key,
    },
    Rule {
        name: "yk4",
        matches: |snapshot| snapshot.version >= V4_1_0,
        classify: classify_yk4,
    },
    Rule {
        name: "yk-plus",
        matches: |snapshot| snapshot.version >= V4_0_0,
        classify: classify_plus,
    },
    Rule {
        name: "neo",
        matches: |snapshot| snapshot.version >= V3_0_0,
        classify: classify_neo,
    },
    Rule {
        name: "legacy",
        matches: |_| true,
        classify: classify_legacy,
    },
];

/// Classify a snapshot.
///
/// # Errors
/// Returns a decode fault if the capability blob is malformed.
pub fn classify(snapshot: &Snapshot) -> Result<Classification> {
    for rule in &RULES {
        if !(rule.matches)(snapshot) {
            continue;
        }
        let outcome = (rule.classify)(snapshot)?;
        let classification = finalize(snapshot, outcome);
        debug!(
            rule = rule.name,
            device_name = classification.device_name,
            capabilities = %classification.capabilities,
            enabled = %classification.enabled,
            "classified device"
        );
        return Ok(classification);
    }
    unreachable!("the legacy rule matches every snapshot")
}

/// Apply the enabled-mask default and invariant.
///
/// A rule that produced no enabled mask (or an empty one, which firmware
/// uses interchangeably with "not reported") gets the default: every
/// non-transport capability is assumed enabled, transports only as far as
/// the reported mode enables them. The result is always clamped to the
/// supported mask.
fn finalize(snapshot: &Snapshot, outcome: Outcome) -> Classification {
    let enabled = match outcome.enabled {
        Some(enabled) if !enabled.is_empty() => enabled,
        _ => (outcome.capabilities & !Capability::TRANSPORTS) | snapshot.mode.transports(),
    };
    Classification {
        device_name: outcome.device_name,
        capabilities: outcome.capabilities,
        enabled: enabled & outcome.capabilities,
        serial: outcome.serial,
    }
}

fn classify_security_key(_snapshot: &Snapshot) -> Result<Outcome> {
    Ok(Outcome {
        device_name: "Security Key by Yubico",
        capabilities: Capability::U2F,
        enabled: None,
        serial: None,
    })
}

fn classify_yk4(snapshot: &Snapshot) -> Result<Outcome> {
    let blob = snapshot.capability_blob.as_deref().unwrap_or(&[]);
    let info = parse_capability_blob(blob)?;
    let capabilities = info.capabilities.unwrap_or(Capability::EMPTY);

    // The Edge reports OTP|U2F|CCID but its CCID stack is unusable.
    if capabilities.bits() == EDGE_CAPABILITY_PATTERN {
        return Ok(Outcome {
            device_name: "YubiKey Edge",
            capabilities: Capability::OTP | Capability::U2F,
            enabled: info.enabled,
            serial: info.serial,
        });
    }
    Ok(Outcome {
        device_name: "YubiKey 4",
        capabilities,
        enabled: info.enabled,
        serial: info.serial,
    })
}

fn classify_plus(_snapshot: &Snapshot) -> Result<Outcome> {
    Ok(Outcome {
        device_name: "YubiKey Plus",
        capabilities: Capability::OTP | Capability::U2F,
        enabled: None,
        serial: None,
    })
}

fn classify_neo(snapshot: &Snapshot) -> Result<Outcome> {
    // A probe result is present exactly when the snapshot was taken over
    // CCID; otherwise capabilities follow from mode and firmware version.
    let capabilities = if let Some(probed) = snapshot.probed {
        probed
    } else if snapshot.mode.has_transport(Transport::U2f) || snapshot.version >= V3_3_0 {
        Capability::OTP | Capability::U2F | Capability::CCID
    } else {
        Capability::OTP | Capability::CCID
    };
    Ok(Outcome {
        device_name: "YubiKey NEO",
        capabilities,
        enabled: None,
        serial: None,
    })
}

fn classify_legacy(_snapshot: &Snapshot) -> Result<Outcome> {
    Ok(Outcome {
        device_name: "YubiKey",
        capabilities: Capability::OTP,
        enabled: None,
        serial: None,
    })
}
