//! Platform tables for the Pinforge resource arbitration engine.
//!
//! A [`PlatformProfile`] is the static configuration for one MCU family or
//! variant:
//! - **Capacity table:** how many of each countable [`ResourceType`] exist
//! - **Alternative table:** candidate instance/pin mappings per peripheral type
//! - **Compatible functions:** pin functions that may share a pin (open bus)
//!
//! Profiles are immutable once built. The [`PlatformCatalog`] resolves a
//! platform name to a shared `Arc<PlatformProfile>` that is injected into the
//! pin resolver and the resource manager of a session.

pub mod catalog;
pub mod error;
pub mod parse;
pub mod platform;
pub mod resource;

pub use catalog::PlatformCatalog;
pub use error::{Result, TargetError};
pub use parse::{
    discover_targets, generate_template, load_profile_toml, parse_profile_toml, profile_to_toml,
    validate_profile, IssueSeverity, ValidationIssue,
};
pub use platform::{Alternative, FunctionPair, PinAssignment, PlatformProfile};
pub use resource::ResourceType;
