//! A single pairwise upgrade trial.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::django;
use crate::env::Environment;

/// Install `previous`, migrate, load the fixture, then install `new` on top
/// and migrate again.
///
/// Steps run strictly in order and the first failing step aborts the trial,
/// so a broken installation never reaches the migration steps.
pub fn run_upgrade(
    env: &Environment,
    previous: &Path,
    new: &Path,
    fixture: &Path,
) -> Result<()> {
    info!(
        "upgrade trial: {} -> {}",
        previous.display(),
        new.display()
    );
    env.install_requirements()?;

    env.install_package(previous)?;
    django::make_migrations(env)?;
    django::migrate(env)?;
    django::load_data(env, fixture)?;

    env.install_package(new)?;
    django::make_migrations(env)?;
    django::migrate(env)?;

    info!("upgrade trial completed");
    Ok(())
}
