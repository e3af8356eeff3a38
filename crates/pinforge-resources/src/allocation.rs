//! Allocation records and requests.

use std::fmt;

use pinforge_targets::ResourceType;
use serde::Serialize;

/// Priority used when a request does not set one.
pub const DEFAULT_PRIORITY: u8 = 1;

/// A live grant of one resource id to one peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub resource_type: ResourceType,
    /// Unique within `resource_type` among live allocations.
    pub resource_id: u32,
    pub peripheral_id: String,
    pub peripheral_type: String,
    /// Advisory only; never affects arbitration order.
    pub priority: u8,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] -> {} ({}, priority {})",
            self.resource_type,
            self.resource_id,
            self.peripheral_id,
            self.peripheral_type,
            self.priority
        )
    }
}

/// Request for one resource, built with [`AllocationRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub resource_type: ResourceType,
    pub peripheral_id: String,
    pub peripheral_type: String,
    pub priority: u8,
    /// Exact id wanted; `None` means first-fit.
    pub resource_id: Option<u32>,
}

impl AllocationRequest {
    pub fn new(
        resource_type: ResourceType,
        peripheral_id: impl Into<String>,
        peripheral_type: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            peripheral_id: peripheral_id.into(),
            peripheral_type: peripheral_type.into(),
            priority: DEFAULT_PRIORITY,
            resource_id: None,
        }
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Ask for a specific id instead of first-fit.
    pub fn resource_id(mut self, resource_id: u32) -> Self {
        self.resource_id = Some(resource_id);
        self
    }
}

/// Allocated count against the platform limit for one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Utilization {
    pub allocated: u32,
    pub limit: u32,
}

impl Utilization {
    pub fn free(&self) -> u32 {
        self.limit.saturating_sub(self.allocated)
    }

    pub fn percent(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            (self.allocated as f64 / self.limit as f64) * 100.0
        }
    }
}
