//! The pin map of one session: registration, bindings, queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use pinforge_targets::PlatformProfile;
use serde::Serialize;

use crate::conflict::{
    blocking_bindings, conflict_record, find_conflicts, self_clash, self_clash_record,
    ConflictRecord, ConflictReport,
};
use crate::error::PinError;
use crate::optimize::{self, AlternativeSuggestion, PinOptimization};
use crate::request::{PeripheralRequest, PinRequest};

/// A pin held by a peripheral for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinBinding {
    pub pin: u32,
    pub peripheral_id: String,
    pub function: String,
}

/// What happens to the free pins of a request that has a conflicting pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindingPolicy {
    /// Bind every pin that is free; report the rest. A later reassignment can
    /// then free the blocking pin without re-registering the whole request.
    #[default]
    Partial,
    /// Bind nothing if any pin conflicts.
    AllOrNothing,
}

/// Result of registering one peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    /// True only if every requested pin is now held by the peripheral.
    pub accepted: bool,
    pub conflicts: Vec<ConflictRecord>,
}

/// Authoritative pin map for one platform and session.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    profile: Arc<PlatformProfile>,
    policy: BindingPolicy,
    bindings: BTreeMap<u32, Vec<PinBinding>>,
    /// Registration order, including requests that were not accepted.
    peripherals: Vec<PeripheralRequest>,
}

impl ConflictResolver {
    /// Create an empty resolver with [`BindingPolicy::Partial`].
    pub fn new(profile: Arc<PlatformProfile>) -> Self {
        Self::with_policy(profile, BindingPolicy::default())
    }

    pub fn with_policy(profile: Arc<PlatformProfile>, policy: BindingPolicy) -> Self {
        Self {
            profile,
            policy,
            bindings: BTreeMap::new(),
            peripherals: Vec::new(),
        }
    }

    pub fn platform(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn policy(&self) -> BindingPolicy {
        self.policy
    }

    /// Register a peripheral and bind its pins.
    ///
    /// Pins held by an incompatible function stay with their current owner
    /// and are reported in the outcome. Under [`BindingPolicy::Partial`] the
    /// remaining pins are still bound.
    pub fn add_peripheral(&mut self, request: PeripheralRequest) -> Result<AddOutcome, PinError> {
        if request.id.trim().is_empty() {
            return Err(PinError::EmptyPeripheralId);
        }
        if self.peripheral(&request.id).is_some() {
            return Err(PinError::DuplicatePeripheral(request.id));
        }

        let (free, conflicts) = self.check_pins(&request);
        for record in &conflicts {
            log::debug!("{}: {record}", self.profile.name);
        }
        if conflicts.is_empty() || self.policy == BindingPolicy::Partial {
            self.bind(&request.id, free);
        }

        self.peripherals.push(request);
        Ok(AddOutcome {
            accepted: conflicts.is_empty(),
            conflicts,
        })
    }

    /// Unregister a peripheral and release all of its pins.
    ///
    /// Pins the remaining peripherals were denied are then retried in
    /// registration order, under the resolver's policy.
    pub fn remove_peripheral(&mut self, id: &str) -> bool {
        let Some(index) = self.peripherals.iter().position(|p| p.id == id) else {
            return false;
        };
        self.peripherals.remove(index);
        for slot in self.bindings.values_mut() {
            slot.retain(|b| b.peripheral_id != id);
        }
        self.bindings.retain(|_, slot| !slot.is_empty());
        log::debug!("{}: removed '{id}'", self.profile.name);
        self.rebind_denied();
        true
    }

    /// Split a request's pins into bindable ones and conflicts.
    fn check_pins(&self, request: &PeripheralRequest) -> (Vec<PinRequest>, Vec<ConflictRecord>) {
        let mut free = Vec::new();
        let mut conflicts = Vec::new();
        for (index, requested) in request.pins.iter().enumerate() {
            let bound = self.binding(requested.pin);
            let blockers = blocking_bindings(&self.profile, bound, &request.id, requested);
            let clash = self_clash(&self.profile, &request.pins, index);
            if !blockers.is_empty() {
                conflicts.push(conflict_record(&request.id, requested, &blockers));
            }
            if let Some(earlier) = clash {
                conflicts.push(self_clash_record(&request.id, requested, earlier));
            }
            if blockers.is_empty() && clash.is_none() {
                free.push(requested.clone());
            }
        }
        (free, conflicts)
    }

    fn bind(&mut self, peripheral_id: &str, pins: Vec<PinRequest>) {
        for requested in pins {
            let slot = self.bindings.entry(requested.pin).or_default();
            if slot.iter().any(|b| b.peripheral_id == peripheral_id) {
                continue;
            }
            log::debug!(
                "{}: pin {} -> '{}' ({})",
                self.profile.name,
                requested.pin,
                peripheral_id,
                requested.function
            );
            slot.push(PinBinding {
                pin: requested.pin,
                peripheral_id: peripheral_id.to_string(),
                function: requested.function,
            });
        }
    }

    fn holds(&self, peripheral_id: &str, pin: u32) -> bool {
        self.binding(pin).iter().any(|b| b.peripheral_id == peripheral_id)
    }

    fn rebind_denied(&mut self) {
        for index in 0..self.peripherals.len() {
            let request = &self.peripherals[index];
            let (free, conflicts) = self.check_pins(request);
            if !conflicts.is_empty() && self.policy == BindingPolicy::AllOrNothing {
                continue;
            }
            let id = request.id.clone();
            let pending: Vec<PinRequest> = free
                .into_iter()
                .filter(|p| !self.holds(&id, p.pin))
                .collect();
            if pending.is_empty() {
                continue;
            }
            log::debug!(
                "{}: re-binding {} pin(s) of '{id}'",
                self.profile.name,
                pending.len()
            );
            self.bind(&id, pending);
        }
    }

    /// Alternatives for a request, in the platform table's order.
    pub fn suggest_alternatives(&self, request: &PeripheralRequest) -> Vec<AlternativeSuggestion> {
        optimize::suggest_alternatives(self, request)
    }

    /// Propose reassignments for every conflicting peripheral.
    pub fn optimize_pin_mapping(&self) -> PinOptimization {
        optimize::optimize_pin_mapping(self)
    }

    /// Fresh report computed from the current state.
    pub fn conflict_report(&self) -> ConflictReport {
        ConflictReport {
            platform: self.profile.name.clone(),
            total_peripherals: self.peripherals.len(),
            total_pins_used: self.bindings.len(),
            conflicts: find_conflicts(self),
        }
    }

    /// Bindings on one pin (empty if free).
    pub fn binding(&self, pin: u32) -> &[PinBinding] {
        self.bindings.get(&pin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All bindings, by ascending pin.
    pub fn bindings(&self) -> impl Iterator<Item = &PinBinding> {
        self.bindings.values().flatten()
    }

    /// Pins held by one peripheral, by ascending pin.
    pub fn pins_of(&self, peripheral_id: &str) -> Vec<&PinBinding> {
        self.bindings()
            .filter(|b| b.peripheral_id == peripheral_id)
            .collect()
    }

    pub fn peripheral(&self, id: &str) -> Option<&PeripheralRequest> {
        self.peripherals.iter().find(|p| p.id == id)
    }

    /// Registered requests in registration order.
    pub fn peripherals(&self) -> impl Iterator<Item = &PeripheralRequest> {
        self.peripherals.iter()
    }

    /// Position of a peripheral in registration order.
    pub fn registration_index(&self, id: &str) -> Option<usize> {
        self.peripherals.iter().position(|p| p.id == id)
    }
}
