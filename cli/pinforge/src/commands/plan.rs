//! `pinforge plan`: advisory DMA and timer plans on an empty platform.

use anyhow::Result;
use pinforge_resources::ResourceManager;
use pinforge_targets::PlatformCatalog;

fn manager(catalog: &PlatformCatalog, target: &str) -> Result<ResourceManager> {
    Ok(ResourceManager::new(catalog.resolve(target)?))
}

pub fn dma(catalog: &PlatformCatalog, target: &str, peripheral_type: &str, bps: u64) -> Result<()> {
    let suggestion = manager(catalog, target)?.suggest_dma_allocation(peripheral_type, bps);
    println!("{suggestion}");
    Ok(())
}

pub fn timers(catalog: &PlatformCatalog, target: &str, count: u32) -> Result<()> {
    let plan = manager(catalog, target)?.optimize_timer_allocation(count);
    print!("{plan}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_on_builtin_targets() {
        let catalog = PlatformCatalog::builtin();
        assert!(dma(&catalog, "stm32f4", "uart", 921_600).is_ok());
        assert!(timers(&catalog, "nrf52", 6).is_ok());
    }

    #[test]
    fn unknown_target_fails() {
        let catalog = PlatformCatalog::builtin();
        assert!(dma(&catalog, "avr", "uart", 9600).is_err());
        assert!(timers(&catalog, "avr", 1).is_err());
    }
}
