//! One generation session: resolver first, then resource manager.

use std::sync::Arc;

use anyhow::{Context, Result};
use pinforge_pins::{BindingPolicy, ConflictReport, ConflictResolver, PinOptimization};
use pinforge_resources::{
    AllocationFailure, AllocationRequest, ResourceManager, ResourceReport,
};
use pinforge_targets::{PlatformProfile, ResourceType};
use serde::Serialize;

use crate::device::{DeviceSpec, PeripheralSpec};

/// A resource need that was refused for one peripheral.
#[derive(Debug, Clone, Serialize)]
pub struct FailedAllocation {
    pub peripheral_id: String,
    /// First refusal; later units of the same need are not attempted.
    pub failure: AllocationFailure,
    /// Units of the need left ungranted.
    pub shortfall: u32,
}

/// Everything a session produced, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub device: String,
    pub conflicts: ConflictReport,
    pub optimization: PinOptimization,
    pub failed_allocations: Vec<FailedAllocation>,
    pub resources: ResourceReport,
}

impl SessionOutcome {
    pub fn is_clean(&self) -> bool {
        !self.conflicts.has_conflicts() && self.failed_allocations.is_empty()
    }
}

/// Resolver and manager for one platform, driven peripheral by peripheral.
pub struct Session {
    resolver: ConflictResolver,
    manager: ResourceManager,
    failed: Vec<FailedAllocation>,
}

impl Session {
    pub fn new(profile: Arc<PlatformProfile>, policy: BindingPolicy) -> Self {
        Self {
            resolver: ConflictResolver::with_policy(Arc::clone(&profile), policy),
            manager: ResourceManager::new(profile),
            failed: Vec::new(),
        }
    }

    /// Feed one peripheral through the pin check, then its resource needs.
    ///
    /// Resource needs are requested even when pins conflict, so one report
    /// covers every problem of the device.
    pub fn add(&mut self, spec: &PeripheralSpec) -> Result<()> {
        let outcome = self
            .resolver
            .add_peripheral(spec.request())
            .with_context(|| format!("registering peripheral '{}'", spec.id))?;
        if !outcome.accepted {
            log::info!(
                "'{}' not fully accepted: {} conflicting pin(s)",
                spec.id,
                outcome.conflicts.len()
            );
        }

        if let Some(instance) = spec.instance {
            let mut request = AllocationRequest::new(instance, &spec.id, &spec.peripheral_type);
            if let Some(id) = spec.instance_id {
                request = request.resource_id(id);
            }
            self.claim(request, 1);
        }

        if let Some(dma) = &spec.dma {
            let suggestion = self
                .manager
                .suggest_dma_allocation(&spec.peripheral_type, dma.data_rate_bps);
            let priority = dma.priority.unwrap_or(suggestion.priority);
            log::debug!("'{}': {suggestion}", spec.id);
            let request =
                AllocationRequest::new(ResourceType::DmaChannel, &spec.id, &spec.peripheral_type)
                    .priority(priority);
            self.claim(request, dma.channels);
        }

        if let Some(timers) = &spec.timers {
            let plan = self.manager.optimize_timer_allocation(timers.pwm_channels);
            log::debug!("'{}': {}", spec.id, plan.to_string().trim_end());
            let request =
                AllocationRequest::new(ResourceType::Timer, &spec.id, &spec.peripheral_type);
            for slot in &plan.allocations {
                self.claim(request.clone().resource_id(slot.resource_id), 1);
            }
            if plan.shortfall() > 0 {
                self.claim(request, plan.shortfall());
            }
        }

        Ok(())
    }

    /// Grant `count` units of one need, stopping at the first refusal.
    fn claim(&mut self, request: AllocationRequest, count: u32) {
        for granted in 0..count {
            if let Err(failure) = self.manager.allocate_resource(request.clone()) {
                let shortfall = count - granted;
                log::warn!("'{}': {failure} ({shortfall} short)", request.peripheral_id);
                self.failed.push(FailedAllocation {
                    peripheral_id: request.peripheral_id,
                    failure,
                    shortfall,
                });
                return;
            }
        }
    }

    pub fn finish(self, device: &str) -> SessionOutcome {
        SessionOutcome {
            device: device.to_string(),
            conflicts: self.resolver.conflict_report(),
            optimization: self.resolver.optimize_pin_mapping(),
            failed_allocations: self.failed,
            resources: self.manager.resource_report(),
        }
    }
}

/// Run a whole device spec against a platform.
pub fn run_spec(
    profile: Arc<PlatformProfile>,
    spec: &DeviceSpec,
    policy: BindingPolicy,
) -> Result<SessionOutcome> {
    let mut session = Session::new(profile, policy);
    for peripheral in &spec.peripherals {
        session.add(peripheral)?;
    }
    Ok(session.finish(&spec.device.name))
}
