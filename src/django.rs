//! Django management-command plumbing.
//!
//! Everything goes through `manage.py` in the project directory, with
//! `DJANGO_SETTINGS_MODULE` pinned per invocation so the harness never
//! depends on whatever the shell happens to export.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use anyhow::Result;
use tracing::info;

use crate::env::{Environment, run_checked};

/// Settings module for the default SQLite backend.
pub const SETTINGS_SQLITE: &str = "djangifylab_project.settings";
/// Settings module for the PostgreSQL backend.
pub const SETTINGS_POSTGRES: &str = "djangifylab_project.settings_pg";

/// Run `manage.py <command> [args...]` with the environment's interpreter.
pub fn manage(env: &Environment, command: &str, args: &[&OsStr]) -> Result<()> {
    info!("manage.py {command}");
    let mut cmd = Command::new(env.python());
    cmd.arg("manage.py")
        .arg(command)
        .args(args)
        .current_dir(env.project_dir())
        .env("DJANGO_SETTINGS_MODULE", env.settings_module());
    run_checked(&mut cmd, &format!("manage.py {command}"))
}

/// Generate migrations for whatever app versions are installed.
pub fn make_migrations(env: &Environment) -> Result<()> {
    manage(env, "makemigrations", &[])
}

/// Apply pending migrations.
pub fn migrate(env: &Environment) -> Result<()> {
    manage(env, "migrate", &[])
}

/// Load a fixture into the migrated schema.
pub fn load_data(env: &Environment, fixture: &Path) -> Result<()> {
    manage(env, "loaddata", &[fixture.as_os_str()])
}
