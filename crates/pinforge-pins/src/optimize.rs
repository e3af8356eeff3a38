//! Table-driven alternative suggestions and reassignment proposals.
//!
//! Nothing here mutates the pin map; callers re-issue requests with a chosen
//! alternative.

use std::collections::BTreeMap;
use std::fmt;

use pinforge_targets::Alternative;
use serde::Serialize;

use crate::conflict::{blocking_bindings, find_conflicts};
use crate::request::{PeripheralRequest, PinRequest};
use crate::resolver::ConflictResolver;

/// An alternative from the platform table, checked against the current map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternativeSuggestion {
    pub instance: String,
    pub pins: Vec<PinRequest>,
    /// Every pin is free, compatible, or already held by the requester.
    pub available: bool,
}

impl AlternativeSuggestion {
    /// The request re-issued with this alternative's pins.
    pub fn apply_to(&self, request: &PeripheralRequest) -> PeripheralRequest {
        PeripheralRequest {
            id: request.id.clone(),
            peripheral_type: request.peripheral_type.clone(),
            pins: self.pins.clone(),
        }
    }
}

impl fmt::Display for AlternativeSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pins: Vec<String> = self
            .pins
            .iter()
            .map(|p| format!("{}={}", p.function, p.pin))
            .collect();
        write!(f, "{} ({})", self.instance, pins.join(", "))?;
        if !self.available {
            write!(f, " [occupied]")?;
        }
        Ok(())
    }
}

/// Overall result of an optimization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStatus {
    NoConflicts,
    /// Every conflicting peripheral has at least one available alternative.
    SuggestionsAvailable,
    /// Some conflicting peripheral has no available alternative.
    Unresolvable,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::NoConflicts => write!(f, "no conflicts"),
            OptimizationStatus::SuggestionsAvailable => write!(f, "suggestions available"),
            OptimizationStatus::Unresolvable => write!(f, "unresolvable"),
        }
    }
}

/// Proposed move for one later-registered peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub peripheral_id: String,
    pub peripheral_type: String,
    pub conflicting_pins: Vec<u32>,
    /// First available alternative in table order.
    pub proposed: Option<AlternativeSuggestion>,
    pub alternatives: Vec<AlternativeSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinOptimization {
    pub status: OptimizationStatus,
    pub suggestions: Vec<Reassignment>,
}

impl fmt::Display for PinOptimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Pin Optimization: {} ===", self.status)?;
        for s in &self.suggestions {
            let pins: Vec<String> = s.conflicting_pins.iter().map(u32::to_string).collect();
            writeln!(
                f,
                "  {} ({}) conflicts on pin(s) {}",
                s.peripheral_id,
                s.peripheral_type,
                pins.join(", ")
            )?;
            match &s.proposed {
                Some(p) => writeln!(f, "    proposed: {p}")?,
                None => writeln!(f, "    proposed: none")?,
            }
            for alt in &s.alternatives {
                writeln!(f, "      - {alt}")?;
            }
        }
        Ok(())
    }
}

pub(crate) fn suggest_alternatives(
    resolver: &ConflictResolver,
    request: &PeripheralRequest,
) -> Vec<AlternativeSuggestion> {
    let profile = resolver.platform();
    let table = profile.alternatives_for(&request.peripheral_type);
    log::trace!(
        "{}: {} alternative(s) for type '{}'",
        profile.name,
        table.len(),
        request.peripheral_type
    );
    table
        .iter()
        .map(|alt| check_alternative(resolver, &request.id, alt))
        .collect()
}

fn check_alternative(
    resolver: &ConflictResolver,
    requester: &str,
    alt: &Alternative,
) -> AlternativeSuggestion {
    let available = alt.pins.iter().all(|p| {
        blocking_bindings(resolver.platform(), resolver.binding(p.pin), requester, p).is_empty()
    });
    AlternativeSuggestion {
        instance: alt.instance.clone(),
        pins: alt.pins.clone(),
        available,
    }
}

pub(crate) fn optimize_pin_mapping(resolver: &ConflictResolver) -> PinOptimization {
    let conflicts = find_conflicts(resolver);
    if conflicts.is_empty() {
        return PinOptimization {
            status: OptimizationStatus::NoConflicts,
            suggestions: Vec::new(),
        };
    }

    // Later-registered peripheral of each conflict, keyed by registration order.
    let mut blocked: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
    for conflict in &conflicts {
        let later = conflict
            .peripheral_ids
            .iter()
            .filter_map(|id| resolver.registration_index(id))
            .max();
        if let Some(index) = later {
            let pins = blocked.entry(index).or_default();
            if !pins.contains(&conflict.pin) {
                pins.push(conflict.pin);
            }
        }
    }

    let mut suggestions = Vec::new();
    for (index, conflicting_pins) in blocked {
        let Some(request) = resolver.peripherals().nth(index) else {
            continue;
        };
        let alternatives = suggest_alternatives(resolver, request);
        let proposed = alternatives.iter().find(|a| a.available).cloned();
        suggestions.push(Reassignment {
            peripheral_id: request.id.clone(),
            peripheral_type: request.peripheral_type.clone(),
            conflicting_pins,
            proposed,
            alternatives,
        });
    }

    let status = if suggestions.iter().all(|s| s.proposed.is_some()) {
        OptimizationStatus::SuggestionsAvailable
    } else {
        OptimizationStatus::Unresolvable
    };

    PinOptimization {
        status,
        suggestions,
    }
}
