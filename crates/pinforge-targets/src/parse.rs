//! TOML parsing, serialization, validation, and discovery for platform profiles.
//!
//! Custom profiles are stored as `.target.toml` files in the `targets/`
//! directory next to a device specification. This module provides functions
//! to load, validate, serialize, and discover these files.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, TargetError};
use crate::platform::PlatformProfile;
use crate::resource::ResourceType;

/// How serious a validation issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "error"),
            IssueSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// A validation issue found in a profile definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }
}

/// Load a profile from a `.target.toml` file.
pub fn load_profile_toml(path: &Path) -> Result<PlatformProfile> {
    if !path.exists() {
        return Err(TargetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    log::debug!("loading platform profile from {}", path.display());
    parse_profile_toml(&content)
}

/// Parse a profile from a TOML string.
pub fn parse_profile_toml(toml_str: &str) -> Result<PlatformProfile> {
    let profile: PlatformProfile = toml::from_str(toml_str)?;
    Ok(profile)
}

/// Serialize a profile to pretty TOML.
pub fn profile_to_toml(profile: &PlatformProfile) -> Result<String> {
    let toml_str = toml::to_string_pretty(profile)?;
    Ok(toml_str)
}

/// Validate a profile for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
/// Warnings alone still produce `Err`; callers decide whether to proceed.
pub fn validate_profile(profile: &PlatformProfile) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if profile.name.trim().is_empty() {
        issues.push(ValidationIssue::error("profile name is empty"));
    }
    if profile.family.trim().is_empty() {
        issues.push(ValidationIssue::error("profile family is empty"));
    }

    if profile.capacities.values().all(|&c| c == 0) {
        issues.push(ValidationIssue::error(
            "capacity table has no resource with a non-zero capacity",
        ));
    }
    for (resource_type, capacity) in &profile.capacities {
        if *capacity == 0 {
            issues.push(ValidationIssue::warning(format!(
                "{resource_type} has capacity 0; omit it instead"
            )));
        }
    }

    for (peripheral_type, alternatives) in &profile.alternatives {
        if *peripheral_type != peripheral_type.to_ascii_lowercase() {
            issues.push(ValidationIssue::warning(format!(
                "alternative key '{peripheral_type}' is not lower-case and will never match"
            )));
        }
        for (index, alt) in alternatives.iter().enumerate() {
            if alt.instance.trim().is_empty() {
                issues.push(ValidationIssue::error(format!(
                    "alternative #{index} for '{peripheral_type}' has no instance name"
                )));
            }
            if alt.pins.is_empty() {
                issues.push(ValidationIssue::error(format!(
                    "alternative '{}' for '{peripheral_type}' has no pins",
                    alt.instance
                )));
            }
            let mut seen = HashSet::new();
            for assignment in &alt.pins {
                if !seen.insert(assignment.pin) {
                    issues.push(ValidationIssue::error(format!(
                        "alternative '{}' for '{peripheral_type}' uses pin {} twice",
                        alt.instance, assignment.pin
                    )));
                }
                if assignment.function.trim().is_empty() {
                    issues.push(ValidationIssue::error(format!(
                        "alternative '{}' for '{peripheral_type}' has an empty function on pin {}",
                        alt.instance, assignment.pin
                    )));
                }
            }
        }
    }

    for (peripheral_type, alternatives) in &profile.alternatives {
        let Some(resource_type) = ResourceType::instance_for(peripheral_type) else {
            continue;
        };
        let instances: BTreeSet<&str> = alternatives.iter().map(|a| a.instance.as_str()).collect();
        let capacity = profile.capacity(resource_type);
        if instances.len() as u32 > capacity {
            issues.push(ValidationIssue::warning(format!(
                "'{peripheral_type}' alternatives name {} instances but {resource_type} capacity is {capacity}",
                instances.len()
            )));
        }
    }

    for pair in &profile.compatible_functions {
        if pair.0.trim().is_empty() || pair.1.trim().is_empty() {
            issues.push(ValidationIssue::error(
                "compatible-functions contains an empty function name",
            ));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.target.toml` for a new platform.
///
/// Seeds from the STM32F4 profile with the given custom name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut profile = PlatformProfile::stm32f4();
    profile.name = name.into();
    profile.description = format!("Custom platform '{name}'");
    profile_to_toml(&profile)
}

/// Discover all `.target.toml` files in a project's `targets/` directory.
///
/// Returns a list of (target_name, file_path) pairs sorted by name.
pub fn discover_targets(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let targets_dir = project_dir.join("targets");
    if !targets_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut targets = Vec::new();
    for entry in std::fs::read_dir(&targets_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".target.toml"))
            .map(str::to_string);
        if let Some(name) = name {
            targets.push((name, path));
        }
    }
    targets.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Alternative, PinAssignment};
    use crate::resource::ResourceType;

    #[test]
    fn round_trip_builtins() {
        for original in [
            PlatformProfile::stm32(),
            PlatformProfile::stm32h7(),
            PlatformProfile::nrf52(),
            PlatformProfile::rp2040(),
        ] {
            let toml_str = profile_to_toml(&original).unwrap();
            let parsed = parse_profile_toml(&toml_str).unwrap();
            assert_eq!(original, parsed, "round trip failed for {}", original.name);
        }
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
name = "tiny-m0"
family = "stm32"
compatible-functions = [["I2C_SDA", "I2C_SDA"]]

[capacities]
DMA_CHANNEL = 5
TIMER = 4

[[alternatives.uart]]
instance = "USART1"
pins = [{ pin = 9, function = "UART_TX" }, { pin = 10, function = "UART_RX" }]
"#;
        let profile = parse_profile_toml(toml_str).unwrap();
        assert_eq!(profile.name, "tiny-m0");
        assert_eq!(profile.capacity(ResourceType::DmaChannel), 5);
        assert_eq!(profile.capacity(ResourceType::UartInstance), 0);
        assert_eq!(profile.alternatives_for("uart").len(), 1);
        assert!(profile.functions_compatible("I2C_SDA", "I2C_SDA"));
        assert!(validate_profile(&profile).is_ok());
    }

    #[test]
    fn parse_unknown_resource_type_fails() {
        let toml_str = r#"
name = "bad"
family = "bad"

[capacities]
WARP_CORE = 1
"#;
        assert!(parse_profile_toml(toml_str).is_err());
    }

    #[test]
    fn parse_invalid_returns_error() {
        assert!(parse_profile_toml("this is not valid toml [[[").is_err());
    }

    #[test]
    fn parse_missing_field_returns_error() {
        assert!(parse_profile_toml("name = \"incomplete\"\n").is_err());
    }

    #[test]
    fn validate_builtins() {
        for profile in [
            PlatformProfile::stm32(),
            PlatformProfile::stm32f4(),
            PlatformProfile::stm32h7(),
            PlatformProfile::nrf52(),
            PlatformProfile::rp2040(),
        ] {
            assert!(validate_profile(&profile).is_ok(), "{} invalid", profile.name);
        }
    }

    #[test]
    fn validate_warns_on_more_instances_than_capacity() {
        let mut profile = PlatformProfile::stm32f4();
        profile.capacities.insert(ResourceType::UartInstance, 2);
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Warning && i.message.contains("'uart'")));
        assert!(issues.iter().all(|i| i.severity == IssueSeverity::Warning));
    }

    #[test]
    fn validate_duplicate_pin_in_alternative() {
        let mut profile = PlatformProfile::stm32f4();
        profile.alternatives.insert(
            "uart".into(),
            vec![Alternative {
                instance: "USART9".into(),
                pins: vec![PinAssignment::new(3, "UART_TX"), PinAssignment::new(3, "UART_RX")],
            }],
        );
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("twice")));
    }

    #[test]
    fn validate_empty_capacities() {
        let mut profile = PlatformProfile::rp2040();
        profile.capacities.clear();
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error && i.message.contains("non-zero")));
    }

    #[test]
    fn validate_zero_capacity_warns() {
        let mut profile = PlatformProfile::nrf52();
        profile.capacities.insert(ResourceType::CanInstance, 0);
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues
            .iter()
            .all(|i| i.severity == IssueSeverity::Warning));
    }

    #[test]
    fn validate_upper_case_key_warns() {
        let mut profile = PlatformProfile::nrf52();
        let uart = profile.alternatives.remove("uart").unwrap();
        profile.alternatives.insert("UART".into(), uart);
        let issues = validate_profile(&profile).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("lower-case")));
    }

    #[test]
    fn generate_template_is_valid() {
        let toml_str = generate_template("my-board").unwrap();
        let profile = parse_profile_toml(&toml_str).unwrap();
        assert_eq!(profile.name, "my-board");
        assert_eq!(profile.family, "stm32");
        assert!(validate_profile(&profile).is_ok());
    }

    #[test]
    fn discover_targets_finds_files() {
        let dir = tempfile::tempdir().unwrap();
        let targets_dir = dir.path().join("targets");
        std::fs::create_dir_all(&targets_dir).unwrap();

        let template = generate_template("board-a").unwrap();
        std::fs::write(targets_dir.join("board-a.target.toml"), &template).unwrap();
        std::fs::write(targets_dir.join("board-b.target.toml"), &template).unwrap();
        std::fs::write(targets_dir.join("notes.txt"), "ignore me").unwrap();

        let targets = discover_targets(dir.path()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].0, "board-a");
        assert_eq!(targets[1].0, "board-b");
    }

    #[test]
    fn discover_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_targets(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn load_not_found() {
        let result = load_profile_toml(Path::new("/nonexistent/path.target.toml"));
        assert!(matches!(result.unwrap_err(), TargetError::NotFound { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.target.toml");
        std::fs::write(&path, generate_template("file-test").unwrap()).unwrap();

        let profile = load_profile_toml(&path).unwrap();
        assert_eq!(profile.name, "file-test");
    }
}
