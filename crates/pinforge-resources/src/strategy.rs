//! Advisory allocation strategies: DMA by data rate, timer packing for PWM.
//!
//! These helpers read the current pools but never allocate. Callers feed the
//! results into [`ResourceManager::allocate_resource`].

use std::fmt;

use pinforge_targets::ResourceType;
use serde::Serialize;

use crate::manager::ResourceManager;

/// Data rates above this get a dedicated DMA channel.
pub const HIGH_THROUGHPUT_BPS: u64 = 115_200;

/// Data rates above this get the highest DMA priority.
pub const VERY_HIGH_THROUGHPUT_BPS: u64 = 1_000_000;

/// Output-compare channels modeled per general-purpose timer.
pub const CHANNELS_PER_TIMER: u32 = 4;

/// Recommended DMA setup for one peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmaSuggestion {
    pub peripheral_type: String,
    pub data_rate_bps: u64,
    /// Whether the stream should own its channel.
    pub dedicated: bool,
    pub priority: u8,
    /// Channel first-fit would grant next, if one is free.
    pub channel: Option<u32>,
    /// For shared streams on an exhausted pool: a low-priority channel to share.
    pub share_with: Option<u32>,
}

impl fmt::Display for DmaSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} bit/s: {} channel, priority {}",
            self.peripheral_type,
            self.data_rate_bps,
            if self.dedicated { "dedicated" } else { "shared" },
            self.priority
        )?;
        match (self.channel, self.share_with) {
            (Some(ch), _) => write!(f, ", next free channel {ch}"),
            (None, Some(ch)) => write!(f, ", share channel {ch}"),
            (None, None) => write!(f, ", no channel available"),
        }
    }
}

/// Timers carrying a group of PWM channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSlot {
    /// Position in the plan (0-based).
    pub slot: u32,
    /// Free timer id first-fit would use for this slot.
    pub resource_id: u32,
    /// Timer channel numbers (1-based, CH1..CH4) used in this slot.
    pub channels: Vec<u32>,
}

/// Packing of a PWM channel count into the fewest timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerPlan {
    pub pwm_channels: u32,
    pub timers_needed: u32,
    /// One slot per free timer, at most `timers_needed`.
    pub allocations: Vec<TimerSlot>,
    /// Whether enough timers are free right now.
    pub fits: bool,
}

impl TimerPlan {
    /// Total channels across all slots.
    pub fn packed_channels(&self) -> u32 {
        self.allocations.iter().map(|s| s.channels.len() as u32).sum()
    }

    /// Timers needed beyond the ones currently free.
    pub fn shortfall(&self) -> u32 {
        self.timers_needed - self.allocations.len() as u32
    }
}

impl fmt::Display for TimerPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} PWM channel(s) -> {} timer(s){}",
            self.pwm_channels,
            self.timers_needed,
            if self.fits { "" } else { " [insufficient free timers]" }
        )?;
        for slot in &self.allocations {
            let channels: Vec<String> = slot.channels.iter().map(|c| format!("CH{c}")).collect();
            writeln!(
                f,
                "  slot {}: TIMER[{}] {}",
                slot.slot,
                slot.resource_id,
                channels.join(" ")
            )?;
        }
        if !self.fits {
            writeln!(f, "  {} timer(s) short", self.shortfall())?;
        }
        Ok(())
    }
}

impl ResourceManager {
    /// Recommend DMA setup from a peripheral's data rate. Never allocates.
    pub fn suggest_dma_allocation(&self, peripheral_type: &str, data_rate_bps: u64) -> DmaSuggestion {
        let (dedicated, priority) = if data_rate_bps > VERY_HIGH_THROUGHPUT_BPS {
            (true, 3)
        } else if data_rate_bps > HIGH_THROUGHPUT_BPS {
            (true, 2)
        } else {
            (false, 1)
        };

        let channel = self.first_free(ResourceType::DmaChannel);
        let share_with = if channel.is_none() && !dedicated {
            self.allocations()
                .find(|a| a.resource_type == ResourceType::DmaChannel && a.priority <= 1)
                .map(|a| a.resource_id)
        } else {
            None
        };

        DmaSuggestion {
            peripheral_type: peripheral_type.to_string(),
            data_rate_bps,
            dedicated,
            priority,
            channel,
            share_with,
        }
    }

    /// Pack `pwm_channels_needed` channels into `ceil(n / 4)` timers.
    ///
    /// Slots are only planned on timers that are free, so the plan is bounded
    /// by the platform capacity. Never allocates.
    pub fn optimize_timer_allocation(&self, pwm_channels_needed: u32) -> TimerPlan {
        let timers_needed = pwm_channels_needed.div_ceil(CHANNELS_PER_TIMER);

        let mut remaining = pwm_channels_needed;
        let allocations: Vec<TimerSlot> = self
            .free_ids(ResourceType::Timer)
            .zip(0..timers_needed)
            .map(|(resource_id, slot)| {
                let count = remaining.min(CHANNELS_PER_TIMER);
                remaining -= count;
                TimerSlot {
                    slot,
                    resource_id,
                    channels: (1..=count).collect(),
                }
            })
            .collect();

        let fits = allocations.len() as u32 == timers_needed;
        TimerPlan {
            pwm_channels: pwm_channels_needed,
            timers_needed,
            allocations,
            fits,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pinforge_targets::PlatformProfile;

    use super::*;
    use crate::allocation::AllocationRequest;

    fn manager() -> ResourceManager {
        ResourceManager::new(Arc::new(PlatformProfile::stm32f4()))
    }

    #[test]
    fn fast_uart_gets_dedicated_channel() {
        let s = manager().suggest_dma_allocation("uart", 500_000);
        assert!(s.dedicated);
        assert!(s.priority >= 2);
        assert_eq!(s.channel, Some(0));
    }

    #[test]
    fn slow_uart_shares() {
        let s = manager().suggest_dma_allocation("uart", 9600);
        assert!(!s.dedicated);
        assert_eq!(s.priority, 1);
    }

    #[test]
    fn very_fast_gets_top_priority() {
        let s = manager().suggest_dma_allocation("spi", 20_000_000);
        assert_eq!(s.priority, 3);
    }

    #[test]
    fn threshold_is_exclusive() {
        let s = manager().suggest_dma_allocation("uart", HIGH_THROUGHPUT_BPS);
        assert_eq!(s.priority, 1);
        let s = manager().suggest_dma_allocation("uart", HIGH_THROUGHPUT_BPS + 1);
        assert_eq!(s.priority, 2);
    }

    #[test]
    fn suggestion_does_not_allocate() {
        let m = manager();
        let _ = m.suggest_dma_allocation("uart", 500_000);
        assert_eq!(m.allocations().count(), 0);
    }

    #[test]
    fn shared_stream_on_full_pool_reuses_low_priority_channel() {
        let mut m = ResourceManager::new(Arc::new(PlatformProfile::stm32f4()));
        for i in 0..16 {
            let priority = if i == 5 { 1 } else { 2 };
            m.allocate_resource(
                AllocationRequest::new(ResourceType::DmaChannel, format!("p{i}"), "spi")
                    .priority(priority),
            )
            .unwrap();
        }
        let s = m.suggest_dma_allocation("uart", 9600);
        assert_eq!(s.channel, None);
        assert_eq!(s.share_with, Some(5));

        let fast = m.suggest_dma_allocation("uart", 2_000_000);
        assert_eq!(fast.channel, None);
        assert_eq!(fast.share_with, None);
    }

    #[test]
    fn six_channels_need_two_timers() {
        let plan = manager().optimize_timer_allocation(6);
        assert_eq!(plan.timers_needed, 2);
        assert_eq!(plan.packed_channels(), 6);
        assert_eq!(plan.allocations[0].channels, vec![1, 2, 3, 4]);
        assert_eq!(plan.allocations[1].channels, vec![1, 2]);
        assert_eq!(plan.allocations[0].resource_id, 0);
        assert_eq!(plan.allocations[1].resource_id, 1);
        assert!(plan.fits);
    }

    #[test]
    fn zero_channels_need_no_timers() {
        let plan = manager().optimize_timer_allocation(0);
        assert_eq!(plan.timers_needed, 0);
        assert!(plan.allocations.is_empty());
        assert!(plan.fits);
    }

    #[test]
    fn plan_skips_taken_timers() {
        let mut m = manager();
        m.allocate_resource(AllocationRequest::new(ResourceType::Timer, "x", "pwm").resource_id(0))
            .unwrap();
        let plan = m.optimize_timer_allocation(4);
        assert_eq!(plan.allocations[0].resource_id, 1);
    }

    #[test]
    fn plan_reports_when_timers_run_out() {
        let m = ResourceManager::new(Arc::new(PlatformProfile::nrf52()));
        let plan = m.optimize_timer_allocation(4 * 6);
        assert_eq!(plan.timers_needed, 6);
        assert!(!plan.fits);
        assert_eq!(plan.allocations.len(), 5);
        assert_eq!(plan.shortfall(), 1);
        assert!(plan.to_string().contains("1 timer(s) short"));
    }

    #[test]
    fn huge_request_is_bounded_by_capacity() {
        let m = ResourceManager::new(Arc::new(PlatformProfile::nrf52()));
        let plan = m.optimize_timer_allocation(4_000_000);
        assert_eq!(plan.timers_needed, 1_000_000);
        assert_eq!(plan.allocations.len(), 5);
        assert_eq!(plan.shortfall(), 999_995);
        assert_eq!(plan.packed_channels(), 20);
    }

    #[test]
    fn no_timers_means_empty_plan() {
        let mut profile = PlatformProfile::nrf52();
        profile.capacities.remove(&ResourceType::Timer);
        let plan = ResourceManager::new(Arc::new(profile)).optimize_timer_allocation(3);
        assert!(plan.allocations.is_empty());
        assert_eq!(plan.shortfall(), 1);
        assert!(!plan.fits);
    }
}
