//! Pin conflict resolution for Pinforge.
//!
//! The [`ConflictResolver`] owns the pin map of one generation session on one
//! platform. Peripherals are registered in order with
//! [`ConflictResolver::add_peripheral`]; pins are bound one by one, and a pin
//! already held by an incompatible function produces a [`ConflictRecord`]
//! instead of an error. Alternatives come from the platform's alternative
//! table and are always returned in table order.

pub mod conflict;
pub mod error;
pub mod optimize;
pub mod request;
pub mod resolver;

pub use conflict::{ConflictRecord, ConflictReport};
pub use error::PinError;
pub use optimize::{AlternativeSuggestion, OptimizationStatus, PinOptimization, Reassignment};
pub use request::{PeripheralRequest, PinRequest};
pub use resolver::{AddOutcome, BindingPolicy, ConflictResolver, PinBinding};
