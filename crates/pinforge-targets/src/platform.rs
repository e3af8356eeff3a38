//! Platform profile: capacity table, alternative table, compatible functions.
//!
//! Pins are plain integers. On STM32 parts a pin is `port * 16 + index`
//! (PA0 = 0, PB6 = 22, PC10 = 42); on nRF52 it is `port * 32 + index`
//! (P1.02 = 34); on RP2040 it is the GPIO number.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceType;

/// One pin together with the function it is used for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinAssignment {
    pub pin: u32,
    pub function: String,
}

impl PinAssignment {
    pub fn new(pin: u32, function: impl Into<String>) -> Self {
        Self {
            pin,
            function: function.into(),
        }
    }
}

/// A candidate instance/pin mapping for a peripheral type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    /// Hardware instance name (e.g. "USART2", "SPIM1", "TIM3_CH1").
    pub instance: String,
    /// Pins the instance would occupy, in table order.
    pub pins: Vec<PinAssignment>,
}

impl Alternative {
    fn new(instance: &str, pins: &[(u32, &str)]) -> Self {
        Self {
            instance: instance.to_string(),
            pins: pins
                .iter()
                .map(|(pin, function)| PinAssignment::new(*pin, *function))
                .collect(),
        }
    }
}

/// Two pin functions that may be bound to the same pin.
///
/// A pair of identical names declares a function shareable with itself
/// (e.g. `I2C_SDA` on an I2C bus with several devices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPair(pub String, pub String);

impl FunctionPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self(a.into(), b.into())
    }

    /// Whether this pair allows `a` and `b` together, in either order.
    pub fn allows(&self, a: &str, b: &str) -> bool {
        let (x, y) = (&self.0, &self.1);
        (x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b))
            || (x.eq_ignore_ascii_case(b) && y.eq_ignore_ascii_case(a))
    }
}

/// Static configuration for one MCU family/variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformProfile {
    /// Platform identifier (e.g. "stm32f4").
    pub name: String,
    /// Family the variant belongs to (e.g. "stm32").
    pub family: String,
    /// Short human-readable description.
    #[serde(default)]
    pub description: String,
    /// Resource limit table.
    pub capacities: BTreeMap<ResourceType, u32>,
    /// Alternative table keyed by lower-case peripheral type.
    #[serde(default)]
    pub alternatives: BTreeMap<String, Vec<Alternative>>,
    /// Pin functions that may share a pin.
    #[serde(default)]
    pub compatible_functions: Vec<FunctionPair>,
}

impl PlatformProfile {
    /// Capacity of a resource type; types absent from the table have none.
    pub fn capacity(&self, resource_type: ResourceType) -> u32 {
        self.capacities.get(&resource_type).copied().unwrap_or(0)
    }

    /// Alternatives for a peripheral type, in table order.
    pub fn alternatives_for(&self, peripheral_type: &str) -> &[Alternative] {
        let key = peripheral_type.trim().to_ascii_lowercase();
        self.alternatives
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether two pin functions may be bound to the same pin.
    pub fn functions_compatible(&self, a: &str, b: &str) -> bool {
        self.compatible_functions.iter().any(|pair| pair.allows(a, b))
    }

    /// Generic STM32 profile (conservative F1-class counts).
    pub fn stm32() -> Self {
        Self {
            name: "stm32".into(),
            family: "stm32".into(),
            description: "Generic STM32 (F1-class resource counts)".into(),
            capacities: capacities(&[
                (ResourceType::DmaChannel, 12),
                (ResourceType::Timer, 8),
                (ResourceType::UartInstance, 3),
                (ResourceType::SpiInstance, 2),
                (ResourceType::I2cInstance, 2),
                (ResourceType::AdcChannel, 16),
                (ResourceType::CanInstance, 1),
            ]),
            alternatives: without_instances(
                stm32_alternatives(),
                &["UART4", "USART6", "SPI3", "I2C3", "CAN2"],
            ),
            compatible_functions: shared_bus_functions(),
        }
    }

    /// STM32F4 series (F407-class).
    pub fn stm32f4() -> Self {
        Self {
            name: "stm32f4".into(),
            family: "stm32".into(),
            description: "STM32F4 series, Cortex-M4 @ 168 MHz".into(),
            capacities: capacities(&[
                (ResourceType::DmaChannel, 16),
                (ResourceType::Timer, 14),
                (ResourceType::UartInstance, 6),
                (ResourceType::SpiInstance, 3),
                (ResourceType::I2cInstance, 3),
                (ResourceType::AdcChannel, 16),
                (ResourceType::CanInstance, 2),
            ]),
            alternatives: stm32_alternatives(),
            compatible_functions: shared_bus_functions(),
        }
    }

    /// STM32H7 series (H743-class).
    pub fn stm32h7() -> Self {
        let mut alternatives = stm32_alternatives();
        extend(
            &mut alternatives,
            "uart",
            vec![Alternative::new(
                "UART7",
                &[(gpio(b'E', 8), "UART_TX"), (gpio(b'E', 7), "UART_RX")],
            )],
        );
        extend(
            &mut alternatives,
            "spi",
            vec![Alternative::new(
                "SPI4",
                &[
                    (gpio(b'E', 12), "SPI_SCK"),
                    (gpio(b'E', 14), "SPI_MOSI"),
                    (gpio(b'E', 13), "SPI_MISO"),
                ],
            )],
        );

        Self {
            name: "stm32h7".into(),
            family: "stm32".into(),
            description: "STM32H7 series, Cortex-M7 @ 480 MHz".into(),
            capacities: capacities(&[
                (ResourceType::DmaChannel, 24),
                (ResourceType::Timer, 22),
                (ResourceType::UartInstance, 8),
                (ResourceType::SpiInstance, 6),
                (ResourceType::I2cInstance, 4),
                (ResourceType::AdcChannel, 20),
                (ResourceType::CanInstance, 2),
            ]),
            alternatives,
            compatible_functions: shared_bus_functions(),
        }
    }

    /// Nordic nRF52 series (nRF52840-class). DMA channels model the
    /// EasyDMA-capable serial peripherals.
    pub fn nrf52() -> Self {
        let mut alternatives = BTreeMap::new();
        alternatives.insert(
            "uart".to_string(),
            vec![
                Alternative::new("UARTE0", &[(6, "UART_TX"), (8, "UART_RX")]),
                Alternative::new("UARTE0", &[(26, "UART_TX"), (27, "UART_RX")]),
                Alternative::new("UARTE1", &[(34, "UART_TX"), (33, "UART_RX")]),
            ],
        );
        alternatives.insert(
            "spi".to_string(),
            vec![
                Alternative::new("SPIM1", &[(31, "SPI_SCK"), (30, "SPI_MOSI"), (29, "SPI_MISO")]),
                Alternative::new("SPIM2", &[(19, "SPI_SCK"), (20, "SPI_MOSI"), (21, "SPI_MISO")]),
                Alternative::new("SPIM3", &[(47, "SPI_SCK"), (45, "SPI_MOSI"), (46, "SPI_MISO")]),
            ],
        );
        alternatives.insert(
            "i2c".to_string(),
            vec![
                Alternative::new("TWIM0", &[(27, "I2C_SCL"), (26, "I2C_SDA")]),
                Alternative::new("TWIM1", &[(41, "I2C_SCL"), (40, "I2C_SDA")]),
            ],
        );
        alternatives.insert(
            "pwm".to_string(),
            vec![
                Alternative::new("PWM0_CH0", &[(13, "PWM")]),
                Alternative::new("PWM0_CH1", &[(14, "PWM")]),
                Alternative::new("PWM0_CH2", &[(15, "PWM")]),
                Alternative::new("PWM0_CH3", &[(16, "PWM")]),
            ],
        );

        Self {
            name: "nrf52".into(),
            family: "nrf52".into(),
            description: "Nordic nRF52840, Cortex-M4F @ 64 MHz".into(),
            capacities: capacities(&[
                (ResourceType::DmaChannel, 10),
                (ResourceType::Timer, 5),
                (ResourceType::UartInstance, 2),
                (ResourceType::SpiInstance, 4),
                (ResourceType::I2cInstance, 2),
                (ResourceType::AdcChannel, 8),
            ]),
            alternatives,
            compatible_functions: shared_bus_functions(),
        }
    }

    /// Raspberry Pi RP2040. Timers model the PWM slices.
    pub fn rp2040() -> Self {
        let mut alternatives = BTreeMap::new();
        alternatives.insert(
            "uart".to_string(),
            vec![
                Alternative::new("UART0", &[(0, "UART_TX"), (1, "UART_RX")]),
                Alternative::new("UART0", &[(12, "UART_TX"), (13, "UART_RX")]),
                Alternative::new("UART0", &[(16, "UART_TX"), (17, "UART_RX")]),
                Alternative::new("UART1", &[(4, "UART_TX"), (5, "UART_RX")]),
                Alternative::new("UART1", &[(8, "UART_TX"), (9, "UART_RX")]),
            ],
        );
        alternatives.insert(
            "spi".to_string(),
            vec![
                Alternative::new("SPI0", &[(2, "SPI_SCK"), (3, "SPI_MOSI"), (4, "SPI_MISO")]),
                Alternative::new("SPI0", &[(18, "SPI_SCK"), (19, "SPI_MOSI"), (16, "SPI_MISO")]),
                Alternative::new("SPI1", &[(10, "SPI_SCK"), (11, "SPI_MOSI"), (12, "SPI_MISO")]),
            ],
        );
        alternatives.insert(
            "i2c".to_string(),
            vec![
                Alternative::new("I2C0", &[(5, "I2C_SCL"), (4, "I2C_SDA")]),
                Alternative::new("I2C0", &[(9, "I2C_SCL"), (8, "I2C_SDA")]),
                Alternative::new("I2C1", &[(3, "I2C_SCL"), (2, "I2C_SDA")]),
                Alternative::new("I2C1", &[(7, "I2C_SCL"), (6, "I2C_SDA")]),
            ],
        );
        alternatives.insert(
            "pwm".to_string(),
            (0..8)
                .map(|slice| {
                    Alternative::new(&format!("PWM{slice}_A"), &[(slice * 2, "PWM")])
                })
                .collect(),
        );

        Self {
            name: "rp2040".into(),
            family: "rp2040".into(),
            description: "Raspberry Pi RP2040, dual Cortex-M0+ @ 133 MHz".into(),
            capacities: capacities(&[
                (ResourceType::DmaChannel, 12),
                (ResourceType::Timer, 8),
                (ResourceType::UartInstance, 2),
                (ResourceType::SpiInstance, 2),
                (ResourceType::I2cInstance, 2),
                (ResourceType::AdcChannel, 4),
            ]),
            alternatives,
            compatible_functions: shared_bus_functions(),
        }
    }
}

/// STM32 pin number from a port letter and index.
const fn gpio(port: u8, index: u32) -> u32 {
    (port - b'A') as u32 * 16 + index
}

fn capacities(entries: &[(ResourceType, u32)]) -> BTreeMap<ResourceType, u32> {
    entries.iter().copied().collect()
}

fn extend(
    table: &mut BTreeMap<String, Vec<Alternative>>,
    peripheral_type: &str,
    extra: Vec<Alternative>,
) {
    table
        .entry(peripheral_type.to_string())
        .or_default()
        .extend(extra);
}

/// Drop alternatives on instances a smaller variant does not have.
fn without_instances(
    mut table: BTreeMap<String, Vec<Alternative>>,
    missing: &[&str],
) -> BTreeMap<String, Vec<Alternative>> {
    for alternatives in table.values_mut() {
        alternatives.retain(|alt| !missing.contains(&alt.instance.as_str()));
    }
    table
}

fn shared_bus_functions() -> Vec<FunctionPair> {
    ["I2C_SDA", "I2C_SCL", "SPI_SCK", "SPI_MOSI", "SPI_MISO", "ONEWIRE"]
        .into_iter()
        .map(|f| FunctionPair::new(f, f))
        .collect()
}

fn stm32_alternatives() -> BTreeMap<String, Vec<Alternative>> {
    let mut table = BTreeMap::new();
    table.insert(
        "uart".to_string(),
        vec![
            Alternative::new("USART1", &[(gpio(b'A', 9), "UART_TX"), (gpio(b'A', 10), "UART_RX")]),
            Alternative::new("USART1", &[(gpio(b'B', 6), "UART_TX"), (gpio(b'B', 7), "UART_RX")]),
            Alternative::new("USART2", &[(gpio(b'A', 2), "UART_TX"), (gpio(b'A', 3), "UART_RX")]),
            Alternative::new("USART2", &[(gpio(b'D', 5), "UART_TX"), (gpio(b'D', 6), "UART_RX")]),
            Alternative::new("USART3", &[(gpio(b'B', 10), "UART_TX"), (gpio(b'B', 11), "UART_RX")]),
            Alternative::new("UART4", &[(gpio(b'A', 0), "UART_TX"), (gpio(b'A', 1), "UART_RX")]),
            Alternative::new("USART6", &[(gpio(b'C', 6), "UART_TX"), (gpio(b'C', 7), "UART_RX")]),
        ],
    );
    table.insert(
        "spi".to_string(),
        vec![
            Alternative::new(
                "SPI1",
                &[(gpio(b'A', 5), "SPI_SCK"), (gpio(b'A', 7), "SPI_MOSI"), (gpio(b'A', 6), "SPI_MISO")],
            ),
            Alternative::new(
                "SPI1",
                &[(gpio(b'B', 3), "SPI_SCK"), (gpio(b'B', 5), "SPI_MOSI"), (gpio(b'B', 4), "SPI_MISO")],
            ),
            Alternative::new(
                "SPI2",
                &[(gpio(b'B', 13), "SPI_SCK"), (gpio(b'B', 15), "SPI_MOSI"), (gpio(b'B', 14), "SPI_MISO")],
            ),
            Alternative::new(
                "SPI3",
                &[(gpio(b'C', 10), "SPI_SCK"), (gpio(b'C', 12), "SPI_MOSI"), (gpio(b'C', 11), "SPI_MISO")],
            ),
        ],
    );
    table.insert(
        "i2c".to_string(),
        vec![
            Alternative::new("I2C1", &[(gpio(b'B', 6), "I2C_SCL"), (gpio(b'B', 7), "I2C_SDA")]),
            Alternative::new("I2C1", &[(gpio(b'B', 8), "I2C_SCL"), (gpio(b'B', 9), "I2C_SDA")]),
            Alternative::new("I2C2", &[(gpio(b'B', 10), "I2C_SCL"), (gpio(b'B', 11), "I2C_SDA")]),
            Alternative::new("I2C3", &[(gpio(b'A', 8), "I2C_SCL"), (gpio(b'C', 9), "I2C_SDA")]),
        ],
    );
    table.insert(
        "can".to_string(),
        vec![
            Alternative::new("CAN1", &[(gpio(b'A', 11), "CAN_RX"), (gpio(b'A', 12), "CAN_TX")]),
            Alternative::new("CAN1", &[(gpio(b'B', 8), "CAN_RX"), (gpio(b'B', 9), "CAN_TX")]),
            Alternative::new("CAN2", &[(gpio(b'B', 12), "CAN_RX"), (gpio(b'B', 13), "CAN_TX")]),
        ],
    );
    table.insert(
        "pwm".to_string(),
        vec![
            Alternative::new("TIM2_CH1", &[(gpio(b'A', 0), "PWM")]),
            Alternative::new("TIM2_CH2", &[(gpio(b'A', 1), "PWM")]),
            Alternative::new("TIM3_CH1", &[(gpio(b'A', 6), "PWM")]),
            Alternative::new("TIM3_CH2", &[(gpio(b'A', 7), "PWM")]),
            Alternative::new("TIM4_CH1", &[(gpio(b'B', 6), "PWM")]),
            Alternative::new("TIM4_CH2", &[(gpio(b'B', 7), "PWM")]),
        ],
    );
    table
}
