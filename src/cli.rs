//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::django;

/// Which database backend the Django project under test should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DbBackend {
    Sqlite,
    Postgres,
}

impl DbBackend {
    /// The `DJANGO_SETTINGS_MODULE` for this backend.
    pub fn settings_module(self) -> &'static str {
        match self {
            DbBackend::Sqlite => django::SETTINGS_SQLITE,
            DbBackend::Postgres => django::SETTINGS_POSTGRES,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "dul",
    version,
    about = "Upgrade-compatibility harness for pluggable Django apps",
    long_about = "Installs versioned app archives into a Python environment, runs schema \
                  migrations, loads fixtures, and reports which upgrade paths survive."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding manage.py and requirements.txt
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Python interpreter to drive (default: python3/python from PATH)
    #[arg(long, global = true, env = "DUL_PYTHON")]
    pub python: Option<PathBuf>,

    /// Database backend for the project under test
    #[arg(long, global = true, value_enum, default_value_t = DbBackend::Sqlite)]
    pub db: DbBackend,

    /// Emit a machine-readable JSON summary on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging (same as DUL_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install one app archive, or every archive in a directory
    Install {
        /// Archive file or directory of archives
        #[arg(long)]
        target: PathBuf,
    },
    /// Run one upgrade trial between two app versions
    Upgrade {
        /// Older app archive to start from
        #[arg(long)]
        previous_version: PathBuf,
        /// Newer app archive to upgrade to
        #[arg(long)]
        new_version: PathBuf,
        /// Fixture to load into the migrated schema
        #[arg(long)]
        fixture: PathBuf,
        /// Build a scratch virtualenv at this path and run the trial inside it
        #[arg(long)]
        venv: Option<PathBuf>,
    },
    /// Run the full upgrade compatibility matrix over a package directory
    Matrix {
        /// Directory of versioned app archives
        #[arg(long)]
        packages: PathBuf,
        /// Fixture to load in every trial
        #[arg(long)]
        fixture: PathBuf,
        /// Report file path (default: upgrade_logs/compatibility_matrix.md)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
