//! Single-trial upgrade mode and install mode against the stub interpreter.

#![cfg(unix)]

mod util;

use predicates::str::contains;
use util::StubProject;

fn position(calls: &[String], needle: &str) -> usize {
    calls
        .iter()
        .position(|line| line.contains(needle))
        .unwrap_or_else(|| panic!("no call containing `{needle}` in {calls:?}"))
}

#[test]
fn upgrade_steps_run_in_order() {
    let project = StubProject::new();
    let prev = project.add_archive("buffalogs-2.7.0.tar.gz");
    let new = project.add_archive("buffalogs-2.8.0.tar.gz");

    project
        .cmd()
        .args(["upgrade", "--previous-version"])
        .arg(&prev)
        .arg("--new-version")
        .arg(&new)
        .arg("--fixture")
        .arg(project.fixture())
        .assert()
        .success()
        .stdout(contains("Upgrade test completed without errors."));

    let calls = project.calls();
    let requirements = position(&calls, "install -r");
    let prev_install = position(&calls, "buffalogs-2.7.0.tar.gz");
    let loaddata = position(&calls, "loaddata");
    let new_install = position(&calls, "buffalogs-2.8.0.tar.gz");
    assert!(requirements < prev_install, "base requirements go in first");
    assert!(prev_install < loaddata, "fixture loads after the old version is in");
    assert!(loaddata < new_install, "new version installs after the fixture");

    // Migrations run twice: once per installed version.
    let migrates = calls
        .iter()
        .filter(|line| line.contains("manage.py migrate"))
        .count();
    assert_eq!(migrates, 2);
}

#[test]
fn upgrade_failure_exits_nonzero_and_stops() {
    let project = StubProject::new();
    let prev = project.add_archive("buffalogs-2.7.0.tar.gz");
    let new = project.add_archive("buffalogs-2.8.0.tar.gz");
    project.fail_on("buffalogs-2.8.0.tar.gz");

    project
        .cmd()
        .args(["upgrade", "--previous-version"])
        .arg(&prev)
        .arg("--new-version")
        .arg(&new)
        .arg("--fixture")
        .arg(project.fixture())
        .assert()
        .failure()
        .stderr(contains("package install"));

    // The old version's three manage.py steps ran; nothing after the failed
    // destination install.
    assert_eq!(project.manage_calls().len(), 3);
}

#[test]
fn upgrade_with_scratch_venv_builds_and_uses_it() {
    let project = StubProject::new();
    let prev = project.add_archive("buffalogs-2.7.0.tar.gz");
    let new = project.add_archive("buffalogs-2.8.0.tar.gz");
    let venv = project.root().join("scratch_venv");

    project
        .cmd()
        .args(["upgrade", "--previous-version"])
        .arg(&prev)
        .arg("--new-version")
        .arg(&new)
        .arg("--fixture")
        .arg(project.fixture())
        .arg("--venv")
        .arg(&venv)
        .assert()
        .success();

    assert!(venv.join("bin").join("python").exists(), "venv interpreter created");
    let calls = project.calls();
    assert!(calls.iter().any(|line| line.contains("-m venv")));
    assert!(calls.iter().any(|line| line.contains("install --upgrade pip")));
    let venv_created = position(&calls, "-m venv");
    let prev_install = position(&calls, "buffalogs-2.7.0.tar.gz");
    assert!(venv_created < prev_install);
}

#[test]
fn missing_archive_is_a_config_error() {
    let project = StubProject::new();
    let new = project.add_archive("buffalogs-2.8.0.tar.gz");

    project
        .cmd()
        .args(["upgrade", "--previous-version", "/no/such/app-2.7.0.tar.gz"])
        .arg("--new-version")
        .arg(&new)
        .arg("--fixture")
        .arg(project.fixture())
        .assert()
        .failure()
        .stderr(contains("previous version archive"));

    assert!(project.calls().is_empty());
}

#[test]
fn install_mode_installs_every_archive_in_a_folder() {
    let project = StubProject::new();
    project.add_archive("buffalogs-2.7.0.tar.gz");
    project.add_archive("buffalogs-2.8.0.whl");
    std::fs::write(project.packages_dir().join("README.txt"), "not a package").unwrap();

    project
        .cmd()
        .args(["install", "--target"])
        .arg(project.packages_dir())
        .assert()
        .success()
        .stdout(contains("App(s) installed successfully."))
        .stdout(contains("INSTALLED_APPS"));

    let installs: Vec<_> = project
        .calls()
        .into_iter()
        .filter(|line| line.contains("pip install") && line.contains("buffalogs"))
        .collect();
    assert_eq!(installs.len(), 2, "one install per archive: {installs:?}");
}

#[test]
fn install_mode_single_archive() {
    let project = StubProject::new();
    let archive = project.add_archive("buffalogs-2.7.0.tar.gz");

    project
        .cmd()
        .args(["install", "--target"])
        .arg(&archive)
        .assert()
        .success();

    let installs = project
        .calls()
        .iter()
        .filter(|line| line.contains("buffalogs-2.7.0.tar.gz"))
        .count();
    assert_eq!(installs, 1);
}

#[test]
fn install_mode_rejects_missing_target() {
    let project = StubProject::new();

    project
        .cmd()
        .args(["install", "--target", "/no/such/thing.tar.gz"])
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}
