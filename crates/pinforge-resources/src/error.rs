//! Allocation failure outcomes.

use pinforge_targets::ResourceType;
use serde::Serialize;

/// Why an allocation was not granted. A normal, reportable outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationFailure {
    #[error("{resource_type} is not available on this platform")]
    Unsupported { resource_type: ResourceType },

    #[error("all {capacity} {resource_type} resources are in use")]
    Exhausted {
        resource_type: ResourceType,
        capacity: u32,
    },

    #[error("{resource_type} id {resource_id} is out of range (capacity {capacity})")]
    OutOfRange {
        resource_type: ResourceType,
        resource_id: u32,
        capacity: u32,
    },

    #[error("{resource_type} id {resource_id} is already held by '{holder}'")]
    Occupied {
        resource_type: ResourceType,
        resource_id: u32,
        holder: String,
    },
}

impl AllocationFailure {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            AllocationFailure::Unsupported { resource_type }
            | AllocationFailure::Exhausted { resource_type, .. }
            | AllocationFailure::OutOfRange { resource_type, .. }
            | AllocationFailure::Occupied { resource_type, .. } => *resource_type,
        }
    }
}
