//! `pinforge check`: run a device spec through one arbitration session.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pinforge_pins::{BindingPolicy, OptimizationStatus};

use crate::device::DeviceSpec;
use crate::session::{run_spec, SessionOutcome};

pub fn run(
    cwd: &Path,
    spec_path: Option<&Path>,
    target: Option<&str>,
    format: &str,
    all_or_nothing: bool,
) -> Result<()> {
    let outcome = check(cwd, spec_path, target, all_or_nothing)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        "text" => print_text(&outcome),
        other => bail!("unknown format: '{other}' (expected text or json)"),
    }

    if !outcome.is_clean() {
        bail!(
            "{}: {} pin conflict(s), {} failed allocation(s)",
            outcome.device,
            outcome.conflicts.conflicts.len(),
            outcome.failed_allocations.len()
        );
    }
    Ok(())
}

/// Load the device spec and its platform, then run the session.
pub fn check(
    cwd: &Path,
    spec_path: Option<&Path>,
    target: Option<&str>,
    all_or_nothing: bool,
) -> Result<SessionOutcome> {
    let (spec, project_dir) = load_spec(cwd, spec_path)?;
    let catalog = crate::load_catalog(&project_dir)?;

    let target = match target.or(spec.default_target()) {
        Some(t) => t,
        None => bail!("no target given: pass --target or set [device].target"),
    };
    let profile = catalog
        .resolve(target)
        .with_context(|| format!("checking device '{}'", spec.device.name))?;

    let policy = if all_or_nothing {
        BindingPolicy::AllOrNothing
    } else {
        BindingPolicy::Partial
    };
    log::info!(
        "checking '{}' ({} peripheral(s)) on {}",
        spec.device.name,
        spec.peripherals.len(),
        profile.name
    );
    run_spec(profile, &spec, policy)
}

fn load_spec(cwd: &Path, spec_path: Option<&Path>) -> Result<(DeviceSpec, PathBuf)> {
    match spec_path {
        Some(path) => {
            let spec = DeviceSpec::load(path)?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
            Ok((spec, dir))
        }
        None => match DeviceSpec::find_and_load(cwd)? {
            Some(found) => Ok(found),
            None => bail!(
                "no {} found in {} or any parent directory",
                crate::device::DEVICE_FILE,
                cwd.display()
            ),
        },
    }
}

fn print_text(outcome: &SessionOutcome) {
    println!("Device: {}", outcome.device);
    println!();
    print!("{}", outcome.conflicts);

    if outcome.optimization.status != OptimizationStatus::NoConflicts {
        println!();
        print!("{}", outcome.optimization);
    }

    if !outcome.failed_allocations.is_empty() {
        println!();
        println!("=== Failed Allocations ===");
        for failed in &outcome.failed_allocations {
            println!(
                "  {}: {} ({} short)",
                failed.peripheral_id, failed.failure, failed.shortfall
            );
        }
    }

    println!();
    print!("{}", outcome.resources);
}
