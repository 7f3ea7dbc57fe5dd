//! The mutable Python environment the trials run against.
//!
//! All package state lives in one interpreter's site-packages, so the
//! environment is modeled as an explicit resource: every operation that
//! mutates the install set goes through an [`Environment`] value, and callers
//! reset it between trials instead of relying on whatever the previous trial
//! left behind. Nothing here retries and nothing enforces a timeout; each
//! subprocess blocks until it exits, matching how the underlying tools are
//! meant to be driven.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// A Python interpreter plus the project it operates on.
#[derive(Debug, Clone)]
pub struct Environment {
    python: PathBuf,
    project_dir: PathBuf,
    settings_module: String,
}

impl Environment {
    pub fn new(
        python: PathBuf,
        project_dir: PathBuf,
        settings_module: impl Into<String>,
    ) -> Self {
        Self {
            python,
            project_dir,
            settings_module: settings_module.into(),
        }
    }

    /// Resolve the interpreter to drive: an explicit override if given,
    /// otherwise `python3` then `python` from `PATH`.
    pub fn resolve_python(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("python interpreter {} does not exist", path.display());
            }
            return Ok(path);
        }
        which::which("python3")
            .or_else(|_| which::which("python"))
            .context("no python interpreter found on PATH (set --python or DUL_PYTHON)")
    }

    /// Build a fresh scratch virtualenv at `venv_dir` and return an
    /// environment driving its interpreter.
    ///
    /// An existing directory at that path is removed first, then the venv is
    /// created with the given base interpreter and pip is brought up to date.
    pub fn with_virtualenv(base: &Environment, venv_dir: &Path) -> Result<Environment> {
        if venv_dir.exists() {
            info!("removing existing virtual environment at {}", venv_dir.display());
            std::fs::remove_dir_all(venv_dir)
                .with_context(|| format!("removing {}", venv_dir.display()))?;
        }

        info!("creating virtualenv at {}", venv_dir.display());
        let mut cmd = Command::new(&base.python);
        cmd.args(["-m", "venv"]).arg(venv_dir);
        run_checked(&mut cmd, "venv creation")?;

        #[cfg(windows)]
        let python = venv_dir.join("Scripts").join("python.exe");
        #[cfg(not(windows))]
        let python = venv_dir.join("bin").join("python");

        let env = Environment::new(python, base.project_dir.clone(), base.settings_module.clone());
        env.pip(["install", "--upgrade", "pip"], "pip self-upgrade")?;
        Ok(env)
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn settings_module(&self) -> &str {
        &self.settings_module
    }

    /// List installed packages, one `pip freeze` line per entry.
    pub fn freeze(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.python)
            .args(["-m", "pip", "freeze"])
            .current_dir(&self.project_dir)
            .output()
            .context("failed to run pip freeze")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("pip freeze exited with {}: {}", output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Uninstall every package currently installed. No-op when the
    /// environment is already empty.
    pub fn uninstall_all(&self) -> Result<()> {
        let installed = self.freeze()?;
        if installed.is_empty() {
            debug!("environment already empty, nothing to uninstall");
            return Ok(());
        }
        info!("uninstalling {} packages", installed.len());
        let mut args: Vec<&str> = vec!["uninstall", "-y"];
        args.extend(installed.iter().map(String::as_str));
        self.pip(args, "pip uninstall")
    }

    /// Install the harness's own base requirements from the project
    /// directory's `requirements.txt`.
    pub fn install_requirements(&self) -> Result<()> {
        let requirements = self.project_dir.join("requirements.txt");
        if !requirements.is_file() {
            bail!("requirements.txt not found in {}", self.project_dir.display());
        }
        info!("installing base requirements");
        self.pip(
            [OsStr::new("install"), OsStr::new("-r"), requirements.as_os_str()],
            "requirements install",
        )
    }

    /// Install a single app archive.
    pub fn install_package(&self, archive: &Path) -> Result<()> {
        info!("installing app archive {}", archive.display());
        self.pip(
            [OsStr::new("install"), archive.as_os_str()],
            "package install",
        )
    }

    /// Install every archive (or unpacked package directory) in `dir`.
    pub fn install_from_dir(&self, dir: &Path) -> Result<()> {
        let mut installed = 0usize;
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("reading package directory {}", dir.display()))?
            .flatten()
            .map(|e| e.path())
            .collect();
        entries.sort();
        for path in entries {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if path.is_dir() || crate::version::has_archive_suffix(&name) {
                self.install_package(&path)?;
                installed += 1;
            }
        }
        if installed == 0 {
            info!("no installable packages found in {}", dir.display());
        }
        Ok(())
    }

    /// Return the environment to its baseline: nothing installed but the
    /// base requirements.
    pub fn reset(&self) -> Result<()> {
        self.uninstall_all()?;
        self.install_requirements()
    }

    fn pip<I, S>(&self, args: I, what: &str) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "pip"]).args(args).current_dir(&self.project_dir);
        run_checked(&mut cmd, what)
    }
}

/// Run a command to completion with inherited stdio, mapping a non-zero exit
/// to an error naming the step.
pub(crate) fn run_checked(cmd: &mut Command, what: &str) -> Result<()> {
    debug!("running {cmd:?}");
    let status = cmd
        .status()
        .with_context(|| format!("failed to spawn {what} ({cmd:?})"))?;
    if !status.success() {
        bail!("{what} exited with {status}");
    }
    Ok(())
}
