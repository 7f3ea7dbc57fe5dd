//! The upgrade-compatibility matrix driver.
//!
//! For every ordered pair of distinct versions found in the package
//! directory, run one trial: reset the environment, install the source
//! archive, migrate and load the fixture, install the destination archive,
//! migrate again. Outcomes land in a square table keyed by the sorted
//! version list on both axes.
//!
//! Trials are strictly sequential. The install set is one shared resource,
//! so two trials can never run against the environment at the same time.

use std::path::Path;

use anyhow::Result;
use semver::Version;
use serde::Serialize;
use tracing::{info, warn};

use crate::env::Environment;
use crate::upgrade::run_upgrade;
use crate::version::{Artifact, scan_artifacts};

/// Result of one attempted upgrade between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialOutcome {
    Success,
    Failure,
    /// Same-version pairs are never attempted.
    Skipped,
}

impl TrialOutcome {
    /// The cell text used in both the console grid and the markdown table.
    pub fn cell(self) -> &'static str {
        match self {
            TrialOutcome::Success => "YES",
            TrialOutcome::Failure => "NO",
            TrialOutcome::Skipped => "",
        }
    }
}

/// Square table of trial outcomes, indexed by the sorted version list.
#[derive(Debug, Clone)]
pub struct Matrix {
    versions: Vec<Version>,
    /// Row-major cells; `cells[i][j]` is the outcome of upgrading
    /// `versions[i]` to `versions[j]`.
    cells: Vec<Vec<TrialOutcome>>,
}

impl Matrix {
    /// A fresh matrix with every cell marked skipped.
    pub fn new(versions: Vec<Version>) -> Self {
        let n = versions.len();
        Self {
            versions,
            cells: vec![vec![TrialOutcome::Skipped; n]; n],
        }
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn cell(&self, src: usize, dst: usize) -> TrialOutcome {
        self.cells[src][dst]
    }

    pub fn set(&mut self, src: usize, dst: usize, outcome: TrialOutcome) {
        self.cells[src][dst] = outcome;
    }

    pub fn rows(&self) -> &[Vec<TrialOutcome>] {
        &self.cells
    }

    /// Number of cells that were actually attempted (everything off the
    /// diagonal).
    pub fn evaluated(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|o| **o != TrialOutcome::Skipped)
            .count()
    }

    /// Ordered (src, dst) index pairs to evaluate, diagonal excluded.
    pub fn trial_pairs(n: usize) -> Vec<(usize, usize)> {
        let mut pairs = Vec::with_capacity(n.saturating_mul(n).saturating_sub(n));
        for src in 0..n {
            for dst in 0..n {
                if src != dst {
                    pairs.push((src, dst));
                }
            }
        }
        pairs
    }
}

/// A completed matrix run, ready to be rendered and persisted.
#[derive(Debug)]
pub struct MatrixRun {
    pub matrix: Matrix,
    pub trials_failed: usize,
}

/// Drive the full N×N matrix over the archives in `packages_dir`.
///
/// A failed trial is recorded as `NO` and the loop moves on; the per-trial
/// environment reset sits inside the trial scope, so its failure also counts
/// against that pair rather than aborting the run. (The run-level reset
/// happens before dispatch and is fatal there.)
pub fn run_matrix(env: &Environment, packages_dir: &Path, fixture: &Path) -> Result<MatrixRun> {
    let artifacts = scan_artifacts(packages_dir)?;
    let versions: Vec<Version> = artifacts.iter().map(|a| a.version.clone()).collect();
    info!(
        "running upgrade compatibility matrix over {} versions: {}",
        versions.len(),
        versions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut matrix = Matrix::new(versions);
    let pairs = Matrix::trial_pairs(artifacts.len());
    let total = pairs.len();
    let mut trials_failed = 0usize;

    for (done, (src, dst)) in pairs.into_iter().enumerate() {
        let from = &artifacts[src];
        let to = &artifacts[dst];
        info!(
            "trial {}/{}: {} -> {}",
            done + 1,
            total,
            from.version,
            to.version
        );
        let outcome = match run_trial(env, from, to, fixture) {
            Ok(()) => TrialOutcome::Success,
            Err(err) => {
                warn!("trial {} -> {} failed: {err:#}", from.version, to.version);
                trials_failed += 1;
                TrialOutcome::Failure
            }
        };
        matrix.set(src, dst, outcome);
    }

    Ok(MatrixRun {
        matrix,
        trials_failed,
    })
}

fn run_trial(env: &Environment, from: &Artifact, to: &Artifact, fixture: &Path) -> Result<()> {
    env.uninstall_all()?;
    run_upgrade(env, &from.path, &to.path, fixture)
}
