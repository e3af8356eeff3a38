//! Countable on-chip resource kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TargetError;

/// A category of finite on-chip capability modeled as a counted pool.
///
/// Serialized as its upper-case name (`"DMA_CHANNEL"`, `"TIMER"`, ...) so it
/// can be used as a map key in TOML and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceType {
    DmaChannel,
    Timer,
    UartInstance,
    SpiInstance,
    I2cInstance,
    AdcChannel,
    CanInstance,
}

impl ResourceType {
    /// Every resource type, in report order.
    pub const ALL: [ResourceType; 7] = [
        ResourceType::DmaChannel,
        ResourceType::Timer,
        ResourceType::UartInstance,
        ResourceType::SpiInstance,
        ResourceType::I2cInstance,
        ResourceType::AdcChannel,
        ResourceType::CanInstance,
    ];

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::DmaChannel => "DMA_CHANNEL",
            ResourceType::Timer => "TIMER",
            ResourceType::UartInstance => "UART_INSTANCE",
            ResourceType::SpiInstance => "SPI_INSTANCE",
            ResourceType::I2cInstance => "I2C_INSTANCE",
            ResourceType::AdcChannel => "ADC_CHANNEL",
            ResourceType::CanInstance => "CAN_INSTANCE",
        }
    }

    /// The bus-instance resource a peripheral type consumes, if any.
    ///
    /// `"uart"` and `"usart"` map to [`ResourceType::UartInstance`], and so on.
    pub fn instance_for(peripheral_type: &str) -> Option<ResourceType> {
        match peripheral_type.trim().to_ascii_lowercase().as_str() {
            "uart" | "usart" => Some(ResourceType::UartInstance),
            "spi" => Some(ResourceType::SpiInstance),
            "i2c" | "twi" => Some(ResourceType::I2cInstance),
            "can" => Some(ResourceType::CanInstance),
            "adc" => Some(ResourceType::AdcChannel),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ResourceType::ALL
            .into_iter()
            .find(|rt| rt.as_str() == normalized)
            .ok_or_else(|| TargetError::UnknownResourceType(s.to_string()))
    }
}

impl TryFrom<String> for ResourceType {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.as_str().to_string()
    }
}
