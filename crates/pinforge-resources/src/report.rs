//! Resource report: per-type utilization and per-peripheral ownership.

use std::collections::BTreeMap;
use std::fmt;

use pinforge_targets::ResourceType;
use serde::Serialize;

use crate::allocation::Allocation;
use crate::manager::ResourceManager;

const BAR_WIDTH: usize = 20;

/// Render an ASCII bar chart.
///
/// Example output: `[████████░░░░░░░░░░░░]  40.0%`
pub fn bar_chart(used: u64, available: u64, bar_width: usize) -> String {
    if available == 0 {
        let empty = "░".repeat(bar_width);
        return format!("[{empty}]   0.0%");
    }

    let percent = (used as f64 / available as f64) * 100.0;
    let filled = ((percent / 100.0) * bar_width as f64).round() as usize;
    let filled = filled.min(bar_width);

    format!(
        "[{}{}] {percent:5.1}%",
        "█".repeat(filled),
        "░".repeat(bar_width - filled)
    )
}

/// Utilization of a single resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationLine {
    pub resource_type: ResourceType,
    pub allocated: u32,
    pub limit: u32,
    pub percent: f64,
}

/// Complete resource report for one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub platform: String,
    pub utilization: Vec<UtilizationLine>,
    /// Allocations grouped by peripheral id.
    pub ownership: BTreeMap<String, Vec<Allocation>>,
    /// Resource types with no free id left.
    pub exhausted: Vec<ResourceType>,
}

impl ResourceReport {
    pub(crate) fn build(manager: &ResourceManager) -> Self {
        let utilization: Vec<UtilizationLine> = manager
            .utilization()
            .into_iter()
            .map(|(resource_type, u)| UtilizationLine {
                resource_type,
                allocated: u.allocated,
                limit: u.limit,
                percent: u.percent(),
            })
            .collect();

        let exhausted = utilization
            .iter()
            .filter(|line| line.limit > 0 && line.allocated >= line.limit)
            .map(|line| line.resource_type)
            .collect();

        let mut ownership: BTreeMap<String, Vec<Allocation>> = BTreeMap::new();
        for allocation in manager.allocations() {
            ownership
                .entry(allocation.peripheral_id.clone())
                .or_default()
                .push(allocation.clone());
        }

        Self {
            platform: manager.platform().name.clone(),
            utilization,
            ownership,
            exhausted,
        }
    }
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Resource Report ({}) ===", self.platform)?;
        writeln!(f)?;
        writeln!(f, "UTILIZATION")?;
        for line in &self.utilization {
            writeln!(
                f,
                "  {:<14} {} {}/{}",
                line.resource_type.as_str(),
                bar_chart(line.allocated as u64, line.limit as u64, BAR_WIDTH),
                line.allocated,
                line.limit
            )?;
        }

        writeln!(f)?;
        writeln!(f, "OWNERSHIP")?;
        if self.ownership.is_empty() {
            writeln!(f, "  No resources allocated.")?;
        }
        for (peripheral_id, allocations) in &self.ownership {
            writeln!(f, "  {peripheral_id}:")?;
            for a in allocations {
                writeln!(
                    f,
                    "    {}[{}] ({}, priority {})",
                    a.resource_type, a.resource_id, a.peripheral_type, a.priority
                )?;
            }
        }

        writeln!(f)?;
        if self.exhausted.is_empty() {
            writeln!(f, "Status: CAPACITY AVAILABLE")?;
        } else {
            let names: Vec<&str> = self.exhausted.iter().map(|t| t.as_str()).collect();
            writeln!(f, "Status: EXHAUSTED {}", names.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pinforge_targets::PlatformProfile;

    use super::*;
    use crate::allocation::AllocationRequest;

    #[test]
    fn bar_chart_rendering() {
        assert_eq!(bar_chart(0, 0, 4), "[░░░░]   0.0%");
        assert_eq!(bar_chart(2, 4, 4), "[██░░]  50.0%");
        assert_eq!(bar_chart(9, 4, 4), "[████] 225.0%");
    }

    #[test]
    fn report_lists_platform_and_owners() {
        let mut m = ResourceManager::new(Arc::new(PlatformProfile::stm32f4()));
        m.allocate_resource(AllocationRequest::new(ResourceType::DmaChannel, "uart1", "uart"))
            .unwrap();
        m.allocate_resource(
            AllocationRequest::new(ResourceType::Timer, "motor", "pwm")
                .priority(2)
                .resource_id(3),
        )
        .unwrap();

        let text = m.generate_resource_report();
        assert!(text.contains("Resource Report (stm32f4)"));
        assert!(text.contains("DMA_CHANNEL"));
        assert!(text.contains("1/16"));
        assert!(text.contains("motor:"));
        assert!(text.contains("TIMER[3] (pwm, priority 2)"));
        assert!(text.contains("CAPACITY AVAILABLE"));
    }

    #[test]
    fn report_flags_exhausted_pools() {
        let mut m = ResourceManager::new(Arc::new(PlatformProfile::rp2040()));
        for i in 0..2 {
            m.allocate_resource(AllocationRequest::new(
                ResourceType::UartInstance,
                format!("u{i}"),
                "uart",
            ))
            .unwrap();
        }
        let report = m.resource_report();
        assert_eq!(report.exhausted, vec![ResourceType::UartInstance]);
        assert!(report.to_string().contains("EXHAUSTED UART_INSTANCE"));
    }

    #[test]
    fn empty_report() {
        let m = ResourceManager::new(Arc::new(PlatformProfile::nrf52()));
        let report = m.resource_report();
        assert!(report.ownership.is_empty());
        assert!(report.to_string().contains("No resources allocated."));
    }
}
