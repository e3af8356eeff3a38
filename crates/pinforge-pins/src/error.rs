//! Error types for the pin resolver.
//!
//! Pin conflicts are not errors; they are reported as
//! [`crate::ConflictRecord`] values. These variants cover malformed calls.

/// Errors from registering peripherals.
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("peripheral id is empty")]
    EmptyPeripheralId,

    #[error("peripheral '{0}' is already registered")]
    DuplicatePeripheral(String),
}
