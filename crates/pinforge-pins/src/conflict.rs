//! Conflict detection for the pin map.
//!
//! Conflicts are derived data: they are recomputed from the registered
//! requests and the current bindings every time they are asked for.

use std::fmt;

use pinforge_targets::PlatformProfile;
use serde::Serialize;

use crate::request::PinRequest;
use crate::resolver::{ConflictResolver, PinBinding};

/// Two or more peripherals requiring one pin with incompatible functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    pub pin: u32,
    /// Current holders first, the requesting peripheral last.
    pub peripheral_ids: Vec<String>,
    pub reason: String,
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pin {} [{}]: {}",
            self.pin,
            self.peripheral_ids.join(", "),
            self.reason
        )
    }
}

/// Snapshot of the pin map's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub platform: String,
    pub total_peripherals: usize,
    pub total_pins_used: usize,
    pub conflicts: Vec<ConflictRecord>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Pin Conflict Report ({}) ===", self.platform)?;
        writeln!(f, "  Peripherals: {}", self.total_peripherals)?;
        writeln!(f, "  Pins used:   {}", self.total_pins_used)?;
        if self.conflicts.is_empty() {
            writeln!(f, "  Status: NO CONFLICTS")?;
        } else {
            writeln!(f, "  Status: {} CONFLICT(S)", self.conflicts.len())?;
            for c in &self.conflicts {
                writeln!(f, "    - {c}")?;
            }
        }
        Ok(())
    }
}

/// Bindings on a pin that block `requested` for `requester`.
///
/// Bindings held by the requester itself never block.
pub fn blocking_bindings<'a>(
    profile: &PlatformProfile,
    bound: &'a [PinBinding],
    requester: &str,
    requested: &PinRequest,
) -> Vec<&'a PinBinding> {
    bound
        .iter()
        .filter(|b| b.peripheral_id != requester)
        .filter(|b| !profile.functions_compatible(&b.function, &requested.function))
        .collect()
}

/// Build the record for a blocked pin.
pub fn conflict_record(
    requester: &str,
    requested: &PinRequest,
    blockers: &[&PinBinding],
) -> ConflictRecord {
    let mut peripheral_ids: Vec<String> =
        blockers.iter().map(|b| b.peripheral_id.clone()).collect();
    peripheral_ids.push(requester.to_string());

    let held: Vec<String> = blockers
        .iter()
        .map(|b| format!("{} by '{}'", b.function, b.peripheral_id))
        .collect();

    ConflictRecord {
        pin: requested.pin,
        peripheral_ids,
        reason: format!(
            "'{}' requests {} but pin is bound as {}",
            requester,
            requested.function,
            held.join(" and ")
        ),
    }
}

/// An earlier pin of the same request that `pins[index]` cannot share with.
///
/// Repeating a pin with the same function is not a clash.
pub fn self_clash<'a>(
    profile: &PlatformProfile,
    pins: &'a [PinRequest],
    index: usize,
) -> Option<&'a PinRequest> {
    let requested = &pins[index];
    pins[..index].iter().find(|earlier| {
        earlier.pin == requested.pin
            && !earlier.function.eq_ignore_ascii_case(&requested.function)
            && !profile.functions_compatible(&earlier.function, &requested.function)
    })
}

/// Build the record for a request asking one pin for two functions.
pub fn self_clash_record(
    requester: &str,
    requested: &PinRequest,
    earlier: &PinRequest,
) -> ConflictRecord {
    ConflictRecord {
        pin: requested.pin,
        peripheral_ids: vec![requester.to_string()],
        reason: format!(
            "'{}' requests {} but also {} on the same pin",
            requester, requested.function, earlier.function
        ),
    }
}

/// Recompute every conflict in registration order.
pub fn find_conflicts(resolver: &ConflictResolver) -> Vec<ConflictRecord> {
    let profile = resolver.platform();
    let mut conflicts = Vec::new();

    for request in resolver.peripherals() {
        for (index, requested) in request.pins.iter().enumerate() {
            let bound = resolver.binding(requested.pin);
            let blockers = blocking_bindings(profile, bound, &request.id, requested);
            if !blockers.is_empty() {
                conflicts.push(conflict_record(&request.id, requested, &blockers));
            }
            if let Some(earlier) = self_clash(profile, &request.pins, index) {
                conflicts.push(self_clash_record(&request.id, requested, earlier));
            }
        }
    }

    conflicts
}
