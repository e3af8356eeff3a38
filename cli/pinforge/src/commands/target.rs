//! `pinforge target`: platform listing, description, and validation.

use std::path::Path;

use anyhow::{bail, Context, Result};
use pinforge_targets::{
    generate_template, load_profile_toml, profile_to_toml, validate_profile, IssueSeverity,
    PlatformCatalog, PlatformProfile, ResourceType,
};

/// List all known platforms.
pub fn list(catalog: &PlatformCatalog) -> Result<()> {
    println!("Available platforms:");
    println!();
    for profile in catalog.iter() {
        println!("  {:<12} {}", profile.name, profile.description);
    }
    println!();
    println!("Use 'pinforge target describe <name>' for details.");
    Ok(())
}

/// Describe a platform's capacity and alternative tables.
pub fn describe(catalog: &PlatformCatalog, name: &str, format: Option<&str>) -> Result<()> {
    let profile = catalog
        .resolve(name)
        .context("use 'pinforge target list' to see available targets")?;

    match format {
        Some("toml") => print!("{}", profile_to_toml(&profile)?),
        Some(other) => bail!("unknown format: '{other}' (expected toml)"),
        None => print!("{}", render(&profile)),
    }
    Ok(())
}

fn render(profile: &PlatformProfile) -> String {
    let mut out = format!("=== Platform: {} ===\n", profile.name);
    out.push_str(&format!("Family: {}\n", profile.family));
    if !profile.description.is_empty() {
        out.push_str(&format!("{}\n", profile.description));
    }

    out.push_str("\n--- Capacities ---\n");
    for rt in ResourceType::ALL {
        out.push_str(&format!("  {:<14} {}\n", rt.as_str(), profile.capacity(rt)));
    }

    out.push_str("\n--- Alternatives ---\n");
    for (peripheral_type, alternatives) in &profile.alternatives {
        out.push_str(&format!("  {peripheral_type}:\n"));
        for alt in alternatives {
            let pins: Vec<String> = alt
                .pins
                .iter()
                .map(|p| format!("{}={}", p.function, p.pin))
                .collect();
            out.push_str(&format!("    {:<8} {}\n", alt.instance, pins.join(", ")));
        }
    }

    if !profile.compatible_functions.is_empty() {
        out.push_str("\n--- Shareable functions ---\n");
        for pair in &profile.compatible_functions {
            out.push_str(&format!("  {} + {}\n", pair.0, pair.1));
        }
    }
    out
}

/// Validate a `.target.toml` file and print its issues.
pub fn validate(path: &Path) -> Result<()> {
    let profile = load_profile_toml(path)?;
    match validate_profile(&profile) {
        Ok(()) => {
            println!("{}: OK ({})", path.display(), profile.name);
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                println!("  {}: {}", issue.severity, issue.message);
            }
            let errors = issues
                .iter()
                .filter(|i| i.severity == IssueSeverity::Error)
                .count();
            if errors > 0 {
                bail!("{}: {errors} error(s)", path.display());
            }
            println!("{}: OK with {} warning(s)", path.display(), issues.len());
            Ok(())
        }
    }
}

/// Print a `.target.toml` template seeded from a built-in profile.
pub fn template(name: &str) -> Result<()> {
    print!("{}", generate_template(name)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_known_target() {
        let catalog = PlatformCatalog::builtin();
        assert!(describe(&catalog, "stm32f4", None).is_ok());
        assert!(describe(&catalog, "STM32F4", Some("toml")).is_ok());
    }

    #[test]
    fn describe_unknown_target() {
        assert!(describe(&PlatformCatalog::builtin(), "nonexistent", None).is_err());
    }

    #[test]
    fn render_lists_tables() {
        let text = render(&PlatformProfile::rp2040());
        assert!(text.contains("=== Platform: rp2040 ==="));
        assert!(text.contains("CAN_INSTANCE   0"));
        assert!(text.contains("UART0"));
        assert!(text.contains("I2C_SDA + I2C_SDA"));
    }

    #[test]
    fn validate_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.target.toml");
        std::fs::write(&path, generate_template("custom").unwrap()).unwrap();
        assert!(validate(&path).is_ok());
    }

    #[test]
    fn validate_rejects_broken_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.target.toml");
        let mut profile = PlatformProfile::stm32();
        profile.name.clear();
        std::fs::write(&path, profile_to_toml(&profile).unwrap()).unwrap();
        assert!(validate(&path).is_err());
    }
}
