//! Shared helpers for end-to-end tests.
//!
//! The harness only ever talks to the outside world through one interpreter
//! binary, so the tests swap in a scriptable stub: every invocation is
//! appended to a call log, and command lines matching a pattern in the fail
//! file exit non-zero. `-m venv <dir>` materializes a copy of the stub as
//! the venv's interpreter so scratch-venv runs keep logging to the same
//! place.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub struct StubProject {
    pub dir: TempDir,
    pub python: PathBuf,
    call_log: PathBuf,
    fail_file: PathBuf,
}

impl StubProject {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        std::fs::write(root.join("requirements.txt"), "Django==5.0\n").unwrap();
        std::fs::write(root.join("manage.py"), "# stub manage.py\n").unwrap();
        std::fs::write(root.join("fixture.json"), "[]\n").unwrap();

        let call_log = root.join("calls.log");
        let fail_file = root.join("fail_patterns");
        let python = root.join("python");
        std::fs::write(&python, stub_script(&call_log, &fail_file)).unwrap();
        make_executable(&python);

        Self {
            dir,
            python,
            call_log,
            fail_file,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn fixture(&self) -> PathBuf {
        self.root().join("fixture.json")
    }

    /// Create an empty app archive under `packages/`.
    pub fn add_archive(&self, name: &str) -> PathBuf {
        let packages = self.root().join("packages");
        std::fs::create_dir_all(&packages).unwrap();
        let path = packages.join(name);
        std::fs::write(&path, b"archive").unwrap();
        path
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root().join("packages")
    }

    /// Make every stub invocation whose command line contains `pattern`
    /// exit non-zero.
    pub fn fail_on(&self, pattern: &str) {
        let mut existing = std::fs::read_to_string(&self.fail_file).unwrap_or_default();
        existing.push_str(pattern);
        existing.push('\n');
        std::fs::write(&self.fail_file, existing).unwrap();
    }

    /// Every stub invocation so far, one command line per entry.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.call_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn manage_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|line| line.starts_with("manage.py"))
            .collect()
    }

    /// Base command pointed at this project with the stub interpreter.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dul"));
        cmd.arg("--project-dir")
            .arg(self.root())
            .arg("--python")
            .arg(&self.python);
        cmd
    }
}

fn stub_script(call_log: &Path, fail_file: &Path) -> String {
    format!(
        r#"#!/bin/sh
log="{log}"
fail="{fail}"
echo "$*" >> "$log"
if [ -f "$fail" ]; then
  while IFS= read -r pattern; do
    [ -n "$pattern" ] || continue
    case "$*" in
      *"$pattern"*) exit 1 ;;
    esac
  done < "$fail"
fi
prev=""
for a in "$@"; do
  if [ "$prev" = "venv" ]; then
    mkdir -p "$a/bin"
    cp "$0" "$a/bin/python"
    chmod +x "$a/bin/python"
  fi
  prev="$a"
done
exit 0
"#,
        log = call_log.display(),
        fail = fail_file.display(),
    )
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
