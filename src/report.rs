//! Rendering and persistence of matrix results.
//!
//! The same table is rendered twice: a bordered grid for the console and a
//! GitHub-flavored markdown table for the report file. Cell text comes from
//! [`TrialOutcome::cell`], so the diagonal stays blank in both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::matrix::{Matrix, MatrixRun};

/// Where the matrix report lands unless `--output` overrides it, relative to
/// the project directory.
pub const DEFAULT_REPORT_PATH: &str = "upgrade_logs/compatibility_matrix.md";

fn column_width(matrix: &Matrix) -> usize {
    matrix
        .versions()
        .iter()
        .map(|v| v.to_string().len())
        .chain(std::iter::once("YES".len()))
        .max()
        .unwrap_or(3)
}

/// Bordered console grid, sorted versions on both axes, blank diagonal.
pub fn render_grid(matrix: &Matrix) -> String {
    let width = column_width(matrix);
    let versions: Vec<String> = matrix.versions().iter().map(ToString::to_string).collect();

    let rule = {
        let mut line = String::from("+");
        for _ in 0..=versions.len() {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');

    out.push_str(&format!("| {:width$} ", ""));
    for v in &versions {
        out.push_str(&format!("| {v:width$} "));
    }
    out.push_str("|\n");
    out.push_str(&rule);
    out.push('\n');

    for (i, row) in matrix.rows().iter().enumerate() {
        out.push_str(&format!("| {:width$} ", versions[i]));
        for outcome in row {
            out.push_str(&format!("| {:width$} ", outcome.cell()));
        }
        out.push_str("|\n");
        out.push_str(&rule);
        out.push('\n');
    }
    out
}

/// GitHub-flavored markdown table of the same cells.
pub fn render_markdown(matrix: &Matrix) -> String {
    let width = column_width(matrix);
    let versions: Vec<String> = matrix.versions().iter().map(ToString::to_string).collect();

    let mut out = String::new();
    out.push_str(&format!("| {:width$} ", ""));
    for v in &versions {
        out.push_str(&format!("| {v:width$} "));
    }
    out.push_str("|\n");

    for _ in 0..=versions.len() {
        out.push_str(&format!("|{}", "-".repeat(width + 2)));
    }
    out.push_str("|\n");

    for (i, row) in matrix.rows().iter().enumerate() {
        out.push_str(&format!("| {:width$} ", versions[i]));
        for outcome in row {
            out.push_str(&format!("| {:width$} ", outcome.cell()));
        }
        out.push_str("|\n");
    }
    out
}

/// Write the markdown report with its run metadata, creating the parent
/// directory when needed.
pub fn write_report(
    path: &Path,
    matrix: &Matrix,
    packages_dir: &Path,
    fixture: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }

    let content = format!(
        "# Upgrade Compatibility Matrix\n\n\
         Generated: {}\n\n\
         Fixture used: `{}`\n\n\
         Packages folder: `{}`\n\n\
         {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        fixture.display(),
        packages_dir.display(),
        render_markdown(matrix)
    );
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Machine-readable summary for `--json` runs.
pub fn json_summary(run: &MatrixRun, report_path: &Path) -> serde_json::Value {
    json!({
        "versions": run.matrix.versions().iter().map(ToString::to_string).collect::<Vec<_>>(),
        "matrix": run.matrix.rows(),
        "trials_evaluated": run.matrix.evaluated(),
        "trials_failed": run.trials_failed,
        "report": report_path,
    })
}

/// Resolve the report path: explicit override as-is, otherwise the default
/// location under the project directory.
pub fn report_path(project_dir: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| project_dir.join(DEFAULT_REPORT_PATH))
}
