//! Flat-file line sources for targets and search columns.

use std::path::Path;

use tracing::debug;

use super::ReportError;

/// Reads one entry per line, trimmed, with blank lines dropped.
///
/// # Errors
///
/// Returns [`ReportError::Read`] if the file cannot be read.
pub async fn read_lines(path: &Path) -> Result<Vec<String>, ReportError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReportError::read(path, e))?;
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!(path = %path.display(), count = lines.len(), "read line source");
    Ok(lines)
}
