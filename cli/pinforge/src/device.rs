//! `device.toml` parsing: the peripheral specification of one board.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use pinforge_pins::{PeripheralRequest, PinRequest};
use pinforge_targets::ResourceType;
use serde::{Deserialize, Serialize};

/// File name searched for when no spec path is given.
pub const DEVICE_FILE: &str = "device.toml";

/// The top-level device specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub device: DeviceConfig,
    /// Peripherals in registration order.
    #[serde(default)]
    pub peripherals: Vec<PeripheralSpec>,
}

/// Board metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    /// Default target platform.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One peripheral with its pins and resource needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PeripheralSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub peripheral_type: String,
    #[serde(default)]
    pub pins: Vec<PinRequest>,
    /// Bus instance to claim (e.g. "UART_INSTANCE").
    #[serde(default)]
    pub instance: Option<ResourceType>,
    /// Exact instance id; first-fit when absent.
    #[serde(default)]
    pub instance_id: Option<u32>,
    #[serde(default)]
    pub dma: Option<DmaNeed>,
    #[serde(default)]
    pub timers: Option<TimerNeed>,
}

/// DMA requirements of a peripheral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DmaNeed {
    #[serde(default = "default_channels")]
    pub channels: u32,
    #[serde(default)]
    pub data_rate_bps: u64,
    /// Overrides the priority suggested from the data rate.
    #[serde(default)]
    pub priority: Option<u8>,
}

fn default_channels() -> u32 {
    1
}

/// PWM timer requirements of a peripheral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimerNeed {
    pub pwm_channels: u32,
}

impl PeripheralSpec {
    /// The pin request handed to the conflict resolver.
    pub fn request(&self) -> PeripheralRequest {
        PeripheralRequest {
            id: self.id.clone(),
            peripheral_type: self.peripheral_type.clone(),
            pins: self.pins.clone(),
        }
    }
}

impl DeviceSpec {
    /// Load a spec from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        content
            .parse::<Self>()
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Search upward from `start_dir` for a `device.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(DEVICE_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn default_target(&self) -> Option<&str> {
        self.device.target.as_deref()
    }
}

impl FromStr for DeviceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid device spec")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLINKY: &str = r#"
[device]
name = "blinky"
target = "stm32f4"

[[peripherals]]
id = "led1"
type = "gpio"
pins = [{ pin = 13, function = "GPIO_OUTPUT" }]

[[peripherals]]
id = "uart1"
type = "uart"
pins = [{ pin = 9, function = "UART_TX" }, { pin = 10, function = "UART_RX" }]
instance = "UART_INSTANCE"
dma = { data-rate-bps = 921600 }

[[peripherals]]
id = "rgb"
type = "pwm"
timers = { pwm-channels = 3 }
"#;

    #[test]
    fn parse_full_spec() {
        let spec = BLINKY.parse::<DeviceSpec>().unwrap();
        assert_eq!(spec.device.name, "blinky");
        assert_eq!(spec.default_target(), Some("stm32f4"));
        assert_eq!(spec.peripherals.len(), 3);

        let uart = &spec.peripherals[1];
        assert_eq!(uart.instance, Some(ResourceType::UartInstance));
        let dma = uart.dma.as_ref().unwrap();
        assert_eq!(dma.channels, 1);
        assert_eq!(dma.data_rate_bps, 921_600);
        assert!(dma.priority.is_none());

        assert_eq!(spec.peripherals[2].timers.as_ref().unwrap().pwm_channels, 3);
        assert!(spec.peripherals[2].pins.is_empty());
    }

    #[test]
    fn peripheral_order_is_preserved() {
        let spec = BLINKY.parse::<DeviceSpec>().unwrap();
        let ids: Vec<_> = spec.peripherals.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["led1", "uart1", "rgb"]);
    }

    #[test]
    fn request_carries_pins() {
        let spec = BLINKY.parse::<DeviceSpec>().unwrap();
        let req = spec.peripherals[1].request();
        assert_eq!(req.id, "uart1");
        assert_eq!(req.pins.len(), 2);
    }

    #[test]
    fn reject_unknown_instance() {
        let bad = r#"
[device]
name = "x"

[[peripherals]]
id = "p"
type = "uart"
instance = "HYPERDRIVE"
"#;
        assert!(bad.parse::<DeviceSpec>().is_err());
    }

    #[test]
    fn minimal_spec() {
        let spec: DeviceSpec = "[device]\nname = \"empty\"\n".parse().unwrap();
        assert!(spec.peripherals.is_empty());
        assert!(spec.default_target().is_none());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEVICE_FILE), BLINKY).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (spec, found_dir) = DeviceSpec::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(spec.device.name, "blinky");
        assert_eq!(found_dir, dir.path());
    }

    #[test]
    fn load_reports_path_on_error() {
        let err = DeviceSpec::load(Path::new("/nonexistent/device.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/device.toml"));
    }
}
