//! Versioned artifact discovery.
//!
//! App archives carry their version in the filename
//! (`buffalogs-2.7.0.tar.gz`); anything without a dotted-triple substring is
//! not a candidate and is dropped from the scan. Ordering is semantic, so
//! `2.10.0` sorts after `2.9.0`.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use thiserror::Error;
use tracing::{debug, warn};

/// Archive suffixes recognized as installable app packages.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".whl"];

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+\.\d+)").expect("version regex"));

/// Errors raised while scanning a package directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read package directory {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no versioned app archives found in {0}")]
    NoArtifacts(PathBuf),
}

/// One installable archive and the version parsed out of its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub version: Version,
    pub path: PathBuf,
}

/// Whether a filename looks like an installable archive.
pub fn has_archive_suffix(name: &str) -> bool {
    ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Pull a `MAJOR.MINOR.PATCH` version out of a filename.
///
/// Returns `None` when no dotted-triple substring is present.
pub fn extract_version(filename: &str) -> Option<Version> {
    let raw = VERSION_RE.find(filename)?.as_str();
    // The pattern only matches digit triples, which are always valid semver.
    Version::parse(raw).ok()
}

/// Enumerate the versioned archives in `dir`, sorted ascending by version.
///
/// Entries without an archive suffix or without a parsable version are
/// skipped. When two archives carry the same version the later one (by path
/// order) wins and the collision is logged.
pub fn scan_artifacts(dir: &Path) -> Result<Vec<Artifact>, ScanError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ScanError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut artifacts = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !has_archive_suffix(name) {
            continue;
        }
        match extract_version(name) {
            Some(version) => artifacts.push(Artifact { version, path }),
            None => debug!("skipping {name}: no version in filename"),
        }
    }

    artifacts.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));

    // Same version in two archives is ambiguous; keep the later one so the
    // behavior is deterministic, but say so.
    let mut deduped: Vec<Artifact> = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        match deduped.last_mut() {
            Some(prev) if prev.version == artifact.version => {
                warn!(
                    "duplicate version {}: keeping {} over {}",
                    artifact.version,
                    artifact.path.display(),
                    prev.path.display()
                );
                *prev = artifact;
            }
            _ => deduped.push(artifact),
        }
    }

    if deduped.is_empty() {
        return Err(ScanError::NoArtifacts(dir.to_path_buf()));
    }
    Ok(deduped)
}
