//! Counted on-chip resource allocation for Pinforge.
//!
//! The [`ResourceManager`] arbitrates finite resources (DMA channels, timers,
//! bus instances) against a platform's capacity table. Allocation is strictly
//! first-come, first-fit: the lowest free id is granted and priorities never
//! preempt an existing grant. Failures are returned as
//! [`AllocationFailure`] values so a batch run can continue per peripheral.
//!
//! The strategy helpers ([`ResourceManager::suggest_dma_allocation`],
//! [`ResourceManager::optimize_timer_allocation`]) are advisory and never
//! change state.

pub mod allocation;
pub mod error;
pub mod manager;
pub mod report;
pub mod strategy;

pub use allocation::{Allocation, AllocationRequest, Utilization};
pub use error::AllocationFailure;
pub use manager::ResourceManager;
pub use report::{bar_chart, ResourceReport, UtilizationLine};
pub use strategy::{
    DmaSuggestion, TimerPlan, TimerSlot, CHANNELS_PER_TIMER, HIGH_THROUGHPUT_BPS,
    VERY_HIGH_THROUGHPUT_BPS,
};
