//! Upgrade-compatibility harness for pluggable Django apps.
//!
//! The harness drives a package manager and a Django project's `manage.py`
//! through subprocesses: install a versioned app archive, generate and apply
//! migrations, load a fixture, then install the next version on top and
//! migrate again. The matrix mode repeats that trial for every ordered pair
//! of versions found in a package directory and tabulates the outcomes.

pub mod cli;
pub mod django;
pub mod env;
pub mod matrix;
pub mod report;
pub mod upgrade;
pub mod version;

use std::path::Path;

use anyhow::{Result, bail};
use clap::CommandFactory;
use console::style;
use tracing::info;

pub use cli::{Cli, Commands, DbBackend};
use env::Environment;

/// Install the tracing subscriber. Logs go to stderr so stdout stays clean
/// for tables and JSON summaries.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("DUL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "dul", &mut std::io::stdout());
        return Ok(());
    }

    let python = Environment::resolve_python(cli.python.clone())?;
    info!("using interpreter {}", python.display());
    let base = Environment::new(python, cli.project_dir.clone(), cli.db.settings_module());

    match cli.command {
        Commands::Install { target } => {
            if !target.exists() {
                bail!("install target {} does not exist", target.display());
            }
            base.reset()?;
            if target.is_dir() {
                base.install_from_dir(&target)?;
            } else {
                base.install_package(&target)?;
            }
            if cli.json {
                println!("{}", serde_json::json!({ "installed": target }));
            } else {
                println!("App(s) installed successfully.");
                println!(
                    "Remember to manually add the installed app(s) to INSTALLED_APPS if needed."
                );
            }
        }

        Commands::Upgrade {
            previous_version,
            new_version,
            fixture,
            venv,
        } => {
            require_file(&previous_version, "previous version archive")?;
            require_file(&new_version, "new version archive")?;
            require_file(&fixture, "fixture")?;

            let env = match venv {
                Some(venv_dir) => Environment::with_virtualenv(&base, &venv_dir)?,
                None => base,
            };
            env.reset()?;
            upgrade::run_upgrade(&env, &previous_version, &new_version, &fixture)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "previous": previous_version,
                        "new": new_version,
                        "fixture": fixture,
                        "result": "success",
                    })
                );
            } else {
                println!("Upgrade test completed without errors.");
            }
        }

        Commands::Matrix {
            packages,
            fixture,
            output,
        } => {
            if !packages.is_dir() {
                bail!("package directory {} does not exist", packages.display());
            }
            require_file(&fixture, "fixture")?;

            // Run-level reset: outside any trial scope, so failure here is
            // fatal rather than a NO cell.
            base.reset()?;

            let run = matrix::run_matrix(&base, &packages, &fixture)?;
            let report_path = report::report_path(base.project_dir(), output);
            report::write_report(&report_path, &run.matrix, &packages, &fixture)?;

            if cli.json {
                println!("{}", report::json_summary(&run, &report_path));
            } else {
                println!("\nUpgrade Compatibility Matrix:\n");
                print!("{}", report::render_grid(&run.matrix));
                let evaluated = run.matrix.evaluated();
                let verdict = if run.trials_failed == 0 {
                    style(format!("{evaluated}/{evaluated} upgrade paths passed")).green()
                } else {
                    style(format!(
                        "{}/{evaluated} upgrade paths failed",
                        run.trials_failed
                    ))
                    .red()
                };
                println!("\n{verdict}");
                println!("Compatibility matrix saved to {}", report_path.display());
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        bail!("{what} {} does not exist", path.display());
    }
    Ok(())
}
