//! CSV results and failed-target list writers.

use std::path::Path;

use tracing::info;

use super::{LEADING_COLUMNS, REMARKS_COLUMN, ReportError, ReportRow};

/// Writes the results CSV: fixed leading columns, one column per search label, remarks.
///
/// # Errors
///
/// Returns [`ReportError::Csv`] if the file cannot be created or written.
pub fn write_results<S: AsRef<str>>(
    path: &Path,
    columns: &[S],
    rows: &[ReportRow],
) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| ReportError::csv(path, e))?;

    let mut header: Vec<&str> = LEADING_COLUMNS.to_vec();
    header.extend(columns.iter().map(AsRef::as_ref));
    header.push(REMARKS_COLUMN);
    writer
        .write_record(&header)
        .map_err(|e| ReportError::csv(path, e))?;

    for row in rows {
        writer
            .write_record(row.to_record())
            .map_err(|e| ReportError::csv(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| ReportError::write(path, e))?;

    info!(path = %path.display(), rows = rows.len(), "results written");
    Ok(())
}

/// Writes one failed target per line.
///
/// # Errors
///
/// Returns [`ReportError::Write`] if the file cannot be written.
pub fn write_failures<S: AsRef<str>>(path: &Path, targets: &[S]) -> Result<(), ReportError> {
    let mut content = String::new();
    for target in targets {
        content.push_str(target.as_ref());
        content.push('\n');
    }
    std::fs::write(path, content).map_err(|e| ReportError::write(path, e))?;
    info!(path = %path.display(), count = targets.len(), "failed targets written");
    Ok(())
}
