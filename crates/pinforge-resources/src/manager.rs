//! Resource pools of one session, bounded by the platform capacity table.

use std::collections::BTreeMap;
use std::sync::Arc;

use pinforge_targets::{PlatformProfile, ResourceType};

use crate::allocation::{Allocation, AllocationRequest, Utilization};
use crate::error::AllocationFailure;
use crate::report::ResourceReport;

/// Arbitrates countable resources against a platform's capacity table.
#[derive(Debug, Clone)]
pub struct ResourceManager {
    profile: Arc<PlatformProfile>,
    /// Live allocations per type, keyed by resource id.
    allocated: BTreeMap<ResourceType, BTreeMap<u32, Allocation>>,
}

impl ResourceManager {
    pub fn new(profile: Arc<PlatformProfile>) -> Self {
        Self {
            profile,
            allocated: BTreeMap::new(),
        }
    }

    pub fn platform(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Platform capacity for a resource type.
    pub fn limit(&self, resource_type: ResourceType) -> u32 {
        self.profile.capacity(resource_type)
    }

    /// Grant a resource.
    ///
    /// With an explicit id the grant fails if that id is taken or outside the
    /// platform range. Without one the lowest free id is granted. The
    /// request's priority is recorded but never displaces an existing grant.
    pub fn allocate_resource(
        &mut self,
        request: AllocationRequest,
    ) -> Result<Allocation, AllocationFailure> {
        let resource_type = request.resource_type;
        let capacity = self.limit(resource_type);
        if capacity == 0 {
            return Err(self.refuse(AllocationFailure::Unsupported { resource_type }));
        }

        let resource_id = match request.resource_id {
            Some(id) if id >= capacity => {
                return Err(self.refuse(AllocationFailure::OutOfRange {
                    resource_type,
                    resource_id: id,
                    capacity,
                }));
            }
            Some(id) => {
                if let Some(holder) = self.holder(resource_type, id) {
                    let holder = holder.peripheral_id.clone();
                    return Err(self.refuse(AllocationFailure::Occupied {
                        resource_type,
                        resource_id: id,
                        holder,
                    }));
                }
                id
            }
            None => match self.first_free(resource_type) {
                Some(id) => id,
                None => {
                    return Err(self.refuse(AllocationFailure::Exhausted {
                        resource_type,
                        capacity,
                    }));
                }
            },
        };

        let allocation = Allocation {
            resource_type,
            resource_id,
            peripheral_id: request.peripheral_id,
            peripheral_type: request.peripheral_type,
            priority: request.priority,
        };
        log::debug!("{}: granted {allocation}", self.profile.name);
        self.allocated
            .entry(resource_type)
            .or_default()
            .insert(resource_id, allocation.clone());
        Ok(allocation)
    }

    /// Release one resource id. Returns whether anything was freed.
    pub fn free_resource(&mut self, resource_type: ResourceType, resource_id: u32) -> bool {
        let removed = self
            .allocated
            .get_mut(&resource_type)
            .and_then(|pool| pool.remove(&resource_id));
        match removed {
            Some(allocation) => {
                log::debug!("{}: freed {allocation}", self.profile.name);
                true
            }
            None => false,
        }
    }

    /// Release everything a peripheral holds, returning what was freed.
    pub fn free_peripheral(&mut self, peripheral_id: &str) -> Vec<Allocation> {
        let mut freed = Vec::new();
        for pool in self.allocated.values_mut() {
            let ids: Vec<u32> = pool
                .values()
                .filter(|a| a.peripheral_id == peripheral_id)
                .map(|a| a.resource_id)
                .collect();
            for id in ids {
                if let Some(allocation) = pool.remove(&id) {
                    freed.push(allocation);
                }
            }
        }
        log::debug!(
            "{}: freed {} resource(s) of '{peripheral_id}'",
            self.profile.name,
            freed.len()
        );
        freed
    }

    /// Allocated/limit per resource type in the capacity table.
    pub fn utilization(&self) -> BTreeMap<ResourceType, Utilization> {
        self.profile
            .capacities
            .iter()
            .map(|(&resource_type, &limit)| {
                let allocated = self
                    .allocated
                    .get(&resource_type)
                    .map_or(0, |pool| pool.len() as u32);
                (resource_type, Utilization { allocated, limit })
            })
            .collect()
    }

    /// Live allocations owned by one peripheral, by type then id.
    pub fn peripheral_resources(&self, peripheral_id: &str) -> Vec<&Allocation> {
        self.allocations()
            .filter(|a| a.peripheral_id == peripheral_id)
            .collect()
    }

    /// All live allocations, by type then id.
    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.allocated.values().flat_map(|pool| pool.values())
    }

    /// The allocation holding an id, if any.
    pub fn holder(&self, resource_type: ResourceType, resource_id: u32) -> Option<&Allocation> {
        self.allocated
            .get(&resource_type)
            .and_then(|pool| pool.get(&resource_id))
    }

    /// Lowest id below capacity with no live allocation.
    pub fn first_free(&self, resource_type: ResourceType) -> Option<u32> {
        self.free_ids(resource_type).next()
    }

    /// Free ids below capacity, ascending.
    pub fn free_ids(&self, resource_type: ResourceType) -> impl Iterator<Item = u32> + '_ {
        let pool = self.allocated.get(&resource_type);
        (0..self.limit(resource_type)).filter(move |id| pool.map_or(true, |p| !p.contains_key(id)))
    }

    /// Structured report of utilization and ownership.
    pub fn resource_report(&self) -> ResourceReport {
        ResourceReport::build(self)
    }

    /// Human-readable report for review; not meant to be parsed.
    pub fn generate_resource_report(&self) -> String {
        self.resource_report().to_string()
    }

    fn refuse(&self, failure: AllocationFailure) -> AllocationFailure {
        log::debug!("{}: refused: {failure}", self.profile.name);
        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(profile: PlatformProfile) -> ResourceManager {
        ResourceManager::new(Arc::new(profile))
    }

    #[test]
    fn explicit_id_then_collision_then_free() {
        let mut m = manager(PlatformProfile::stm32f4());
        let a = m
            .allocate_resource(
                AllocationRequest::new(ResourceType::Timer, "pwm1", "pwm").resource_id(2),
            )
            .unwrap();
        assert_eq!(a.resource_id, 2);

        let second = AllocationRequest::new(ResourceType::Timer, "pwm2", "pwm").resource_id(2);
        let err = m.allocate_resource(second.clone()).unwrap_err();
        assert_eq!(
            err,
            AllocationFailure::Occupied {
                resource_type: ResourceType::Timer,
                resource_id: 2,
                holder: "pwm1".into(),
            }
        );

        assert!(m.free_resource(ResourceType::Timer, 2));
        let b = m.allocate_resource(second).unwrap();
        assert_eq!(b.peripheral_id, "pwm2");
        assert_eq!(b.resource_id, 2);
    }

    #[test]
    fn first_fit_is_ascending_and_fills_holes() {
        let mut m = manager(PlatformProfile::stm32f4());
        for expected in 0..3 {
            let a = m
                .allocate_resource(AllocationRequest::new(ResourceType::DmaChannel, "x", "uart"))
                .unwrap();
            assert_eq!(a.resource_id, expected);
        }
        m.free_resource(ResourceType::DmaChannel, 1);
        let a = m
            .allocate_resource(AllocationRequest::new(ResourceType::DmaChannel, "y", "spi"))
            .unwrap();
        assert_eq!(a.resource_id, 1);
    }

    #[test]
    fn exhaustion_boundary() {
        let mut m = manager(PlatformProfile::nrf52());
        let capacity = m.limit(ResourceType::Timer);
        for i in 0..capacity {
            assert!(m
                .allocate_resource(AllocationRequest::new(ResourceType::Timer, format!("t{i}"), "pwm"))
                .is_ok());
        }
        let err = m
            .allocate_resource(AllocationRequest::new(ResourceType::Timer, "extra", "pwm"))
            .unwrap_err();
        assert_eq!(
            err,
            AllocationFailure::Exhausted {
                resource_type: ResourceType::Timer,
                capacity,
            }
        );
    }

    #[test]
    fn out_of_range_id() {
        let mut m = manager(PlatformProfile::stm32f4());
        let err = m
            .allocate_resource(
                AllocationRequest::new(ResourceType::UartInstance, "u", "uart").resource_id(6),
            )
            .unwrap_err();
        assert!(matches!(err, AllocationFailure::OutOfRange { capacity: 6, .. }));
    }

    #[test]
    fn unsupported_type() {
        let mut m = manager(PlatformProfile::rp2040());
        let err = m
            .allocate_resource(AllocationRequest::new(ResourceType::CanInstance, "can", "can"))
            .unwrap_err();
        assert!(matches!(err, AllocationFailure::Unsupported { .. }));
    }

    #[test]
    fn priority_never_preempts() {
        let mut m = manager(PlatformProfile::stm32f4());
        m.allocate_resource(
            AllocationRequest::new(ResourceType::Timer, "low", "pwm").resource_id(0),
        )
        .unwrap();
        let err = m
            .allocate_resource(
                AllocationRequest::new(ResourceType::Timer, "high", "pwm")
                    .priority(9)
                    .resource_id(0),
            )
            .unwrap_err();
        assert!(matches!(err, AllocationFailure::Occupied { .. }));
        assert_eq!(m.holder(ResourceType::Timer, 0).unwrap().peripheral_id, "low");
    }

    #[test]
    fn free_missing_is_false() {
        let mut m = manager(PlatformProfile::stm32());
        assert!(!m.free_resource(ResourceType::Timer, 0));
        assert!(!m.free_resource(ResourceType::Timer, 99));
    }

    #[test]
    fn utilization_counts() {
        let mut m = manager(PlatformProfile::stm32f4());
        m.allocate_resource(AllocationRequest::new(ResourceType::DmaChannel, "a", "uart"))
            .unwrap();
        let u = m.utilization();
        assert_eq!(u[&ResourceType::DmaChannel], Utilization { allocated: 1, limit: 16 });
        assert_eq!(u[&ResourceType::Timer].allocated, 0);
        assert_eq!(u.len(), 7);
    }

    #[test]
    fn peripheral_resources_and_batch_free() {
        let mut m = manager(PlatformProfile::stm32f4());
        m.allocate_resource(AllocationRequest::new(ResourceType::Timer, "motor", "pwm"))
            .unwrap();
        m.allocate_resource(AllocationRequest::new(ResourceType::DmaChannel, "motor", "pwm"))
            .unwrap();
        m.allocate_resource(AllocationRequest::new(ResourceType::DmaChannel, "uart1", "uart"))
            .unwrap();

        let owned = m.peripheral_resources("motor");
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[0].resource_type, ResourceType::DmaChannel);
        assert_eq!(owned[1].resource_type, ResourceType::Timer);

        let freed = m.free_peripheral("motor");
        assert_eq!(freed.len(), 2);
        assert!(m.peripheral_resources("motor").is_empty());
        assert_eq!(m.peripheral_resources("uart1").len(), 1);
    }

    #[test]
    fn free_ids_skip_live_allocations() {
        let mut m = manager(PlatformProfile::rp2040());
        m.allocate_resource(
            AllocationRequest::new(ResourceType::UartInstance, "a", "uart").resource_id(0),
        )
        .unwrap();
        let free: Vec<_> = m.free_ids(ResourceType::UartInstance).collect();
        assert_eq!(free, vec![1]);
    }
}
