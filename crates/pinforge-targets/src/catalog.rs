//! Platform catalog: resolves platform names to shared profiles.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, TargetError};
use crate::parse::{discover_targets, load_profile_toml, validate_profile, IssueSeverity};
use crate::platform::PlatformProfile;

/// Immutable set of platform profiles, keyed by lower-case name.
#[derive(Debug, Clone, Default)]
pub struct PlatformCatalog {
    profiles: BTreeMap<String, Arc<PlatformProfile>>,
}

impl PlatformCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the built-in profiles.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for profile in [
            PlatformProfile::stm32(),
            PlatformProfile::stm32f4(),
            PlatformProfile::stm32h7(),
            PlatformProfile::nrf52(),
            PlatformProfile::rp2040(),
        ] {
            catalog.insert(profile);
        }
        catalog
    }

    /// Add a profile, replacing any profile with the same name.
    pub fn insert(&mut self, profile: PlatformProfile) {
        let key = normalize(&profile.name);
        if self.profiles.contains_key(&key) {
            log::info!("platform '{key}' overridden by custom profile");
        }
        self.profiles.insert(key, Arc::new(profile));
    }

    /// Load every `.target.toml` under `project_dir/targets`.
    ///
    /// Profiles with validation errors are rejected; warnings are logged.
    /// Returns the number of profiles added.
    pub fn load_dir(&mut self, project_dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for (name, path) in discover_targets(project_dir)? {
            let profile = load_profile_toml(&path)?;
            if let Err(issues) = validate_profile(&profile) {
                let errors: Vec<_> = issues
                    .iter()
                    .filter(|i| i.severity == IssueSeverity::Error)
                    .map(|i| i.message.as_str())
                    .collect();
                if !errors.is_empty() {
                    return Err(TargetError::Validation {
                        detail: format!("{}: {}", path.display(), errors.join("; ")),
                    });
                }
                for issue in &issues {
                    log::warn!("{}: {}", path.display(), issue.message);
                }
            }
            if normalize(&profile.name) != normalize(&name) {
                log::warn!(
                    "{} declares name '{}'; registering under that name",
                    path.display(),
                    profile.name
                );
            }
            self.insert(profile);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Resolve a platform name. Unknown platforms are fatal for a session.
    pub fn resolve(&self, name: &str) -> Result<Arc<PlatformProfile>> {
        self.profiles
            .get(&normalize(name))
            .cloned()
            .ok_or_else(|| TargetError::UnknownPlatform {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    /// Names of all known platforms, sorted.
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Iterate over all profiles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PlatformProfile>> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
