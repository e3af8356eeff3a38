//! CLI command implementations.

pub mod check;
pub mod plan;
pub mod target;
