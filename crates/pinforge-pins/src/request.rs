//! Peripheral requests supplied by the generation pipeline.

use serde::{Deserialize, Serialize};

pub use pinforge_targets::PinAssignment as PinRequest;

/// A logical peripheral and the pins it needs, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralRequest {
    /// Unique peripheral id (e.g. "uart1").
    pub id: String,
    /// Peripheral type used for alternative lookup (e.g. "uart").
    #[serde(rename = "type")]
    pub peripheral_type: String,
    #[serde(default)]
    pub pins: Vec<PinRequest>,
}

impl PeripheralRequest {
    pub fn new(id: impl Into<String>, peripheral_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            peripheral_type: peripheral_type.into(),
            pins: Vec::new(),
        }
    }

    /// Append a pin with its function.
    pub fn pin(mut self, pin: u32, function: impl Into<String>) -> Self {
        self.pins.push(PinRequest::new(pin, function));
        self
    }
}
