//! Report rows: column matching over disclosure files and row rules.
//!
//! Every input line yields exactly one [`ReportRow`]. The row's
//! [`RowStatus`] decides whether the line also lands in the failed list.

mod error;
mod input;
mod writer;

pub use error::ReportError;
pub use input::read_lines;
pub use writer::{write_failures, write_results};

/// Remark for a disclosure file served with a non-text content type.
pub const REMARK_NOT_TEXT: &str = "Text content not found.";

/// Remark for unclassifiable input.
pub const REMARK_UNRECOGNIZED: &str = "Unrecognized target.";

/// Value shown in a cell with no data.
pub const EMPTY_CELL: &str = "-";

/// ADS.TXT cell of a permanently failed line.
pub const FAILED_CELL: &str = "Failed";

/// Fixed leading columns of the results file.
pub const LEADING_COLUMNS: [&str; 5] = ["TARGET", "APP_NAME", "URL", "ADS.TXT", "IS HTTPS?"];

/// Trailing column of the results file.
pub const REMARKS_COLUMN: &str = "REMARKS";

/// How a search column is turned into a cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Matching lines joined with `"; "`, or `-`.
    #[default]
    Lines,
    /// `True` if the label occurs anywhere in the body, else `False`.
    Presence,
}

/// One search column and its accepted spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    label: String,
    spaced: String,
    compact: String,
}

impl Column {
    fn new(label: &str) -> Self {
        let parts: Vec<String> = label
            .split(',')
            .map(|part| part.trim().to_lowercase())
            .collect();
        Self {
            label: label.to_string(),
            spaced: parts.join(", "),
            compact: parts.join(","),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        lowered.contains(&self.spaced) || lowered.contains(&self.compact)
    }
}

/// Case-insensitive substring matcher for search columns.
///
/// A label such as `google.com, pub-123` matches both
/// `google.com, pub-123` and `google.com,pub-123` in any case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMatcher {
    columns: Vec<Column>,
    mode: MatchMode,
}

impl ColumnMatcher {
    /// Builds a matcher from column labels in output order.
    #[must_use]
    pub fn new<S: AsRef<str>>(labels: &[S], mode: MatchMode) -> Self {
        Self {
            columns: labels.iter().map(|l| Column::new(l.as_ref())).collect(),
            mode,
        }
    }

    /// Returns the column labels in output order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.label.as_str())
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if there are no search columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the match mode.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Computes one cell per column for a disclosure body.
    #[must_use]
    pub fn extract(&self, body: &str, lines: &[&str]) -> Vec<String> {
        match self.mode {
            MatchMode::Lines => {
                let lowered: Vec<String> = lines.iter().map(|l| l.to_lowercase()).collect();
                self.columns
                    .iter()
                    .map(|column| {
                        let hits: Vec<&str> = lines
                            .iter()
                            .zip(&lowered)
                            .filter(|(_, low)| column.matches(low))
                            .map(|(line, _)| *line)
                            .collect();
                        if hits.is_empty() {
                            EMPTY_CELL.to_string()
                        } else {
                            hits.join("; ")
                        }
                    })
                    .collect()
            }
            MatchMode::Presence => {
                let lowered = body.to_lowercase();
                self.columns
                    .iter()
                    .map(|column| {
                        if column.matches(&lowered) { "True" } else { "False" }.to_string()
                    })
                    .collect()
            }
        }
    }

    /// One `-` per column.
    #[must_use]
    pub fn empty_cells(&self) -> Vec<String> {
        vec![EMPTY_CELL.to_string(); self.columns.len()]
    }
}

/// Splits a disclosure body into its non-blank lines, carriage returns stripped.
#[must_use]
pub fn disclosure_lines(body: &str) -> Vec<&str> {
    body.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_matches('\r'))
        .collect()
}

/// Returns true if a content type is plain text (or absent).
#[must_use]
pub fn is_plain_text(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|ct| ct.to_ascii_lowercase().contains("text/plain"))
}

/// How a row counts towards the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Disclosure file fetched and columns extracted.
    Succeeded,
    /// Fetched but too short; reported with a remark only.
    SoftFailed,
    /// Hard failure; the target goes to the failed list.
    Failed,
    /// Unclassifiable input.
    Malformed,
}

impl RowStatus {
    /// Returns true if the target belongs in the failed list.
    #[must_use]
    pub fn is_hard_failure(self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// One row of the results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// The raw input line.
    pub target: String,
    /// App name or `-`.
    pub app_name: String,
    /// Developer origin or website URL, or `-`.
    pub url: String,
    /// Disclosure-file URL, `-`, or `Failed`.
    pub disclosure_url: String,
    /// `True`, `False` or `-`.
    pub is_https: String,
    /// One cell per search column.
    pub columns: Vec<String>,
    /// Free-text remark.
    pub remarks: String,
    /// Summary classification.
    pub status: RowStatus,
}

/// Input for a row whose disclosure file was fetched.
#[derive(Debug, Clone, Copy)]
pub struct FetchedRow<'a> {
    /// The raw input line.
    pub target: &'a str,
    /// App name or `-`.
    pub app_name: &'a str,
    /// Developer origin or website URL.
    pub url: &'a str,
    /// Disclosure-file URL.
    pub disclosure_url: &'a str,
    /// Whether the final URL used HTTPS.
    pub is_https: bool,
    /// Response content type.
    pub content_type: Option<&'a str>,
    /// Response body.
    pub body: &'a str,
}

fn bool_cell(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

impl ReportRow {
    /// Builds the row for a fetched disclosure file.
    #[must_use]
    pub fn fetched(fetched: &FetchedRow<'_>, matcher: &ColumnMatcher, min_lines: usize) -> Self {
        if !is_plain_text(fetched.content_type) {
            return Self {
                target: fetched.target.to_string(),
                app_name: EMPTY_CELL.to_string(),
                url: EMPTY_CELL.to_string(),
                disclosure_url: EMPTY_CELL.to_string(),
                is_https: bool_cell(fetched.is_https),
                columns: matcher.empty_cells(),
                remarks: REMARK_NOT_TEXT.to_string(),
                status: RowStatus::Failed,
            };
        }

        let lines = disclosure_lines(fetched.body);
        let (columns, remarks, status) = if lines.len() < min_lines {
            (
                matcher.empty_cells(),
                format!("{} lines only.", lines.len()),
                RowStatus::SoftFailed,
            )
        } else {
            (
                matcher.extract(fetched.body, &lines),
                String::new(),
                RowStatus::Succeeded,
            )
        };

        Self {
            target: fetched.target.to_string(),
            app_name: fetched.app_name.to_string(),
            url: fetched.url.to_string(),
            disclosure_url: fetched.disclosure_url.to_string(),
            is_https: bool_cell(fetched.is_https),
            columns,
            remarks,
            status,
        }
    }

    /// Builds the row for a permanently failed line.
    #[must_use]
    pub fn failed(
        target: &str,
        app_name: Option<&str>,
        url: Option<&str>,
        remark: &str,
        matcher: &ColumnMatcher,
    ) -> Self {
        Self {
            target: target.to_string(),
            app_name: app_name.unwrap_or(EMPTY_CELL).to_string(),
            url: url.unwrap_or(EMPTY_CELL).to_string(),
            disclosure_url: FAILED_CELL.to_string(),
            is_https: EMPTY_CELL.to_string(),
            columns: matcher.empty_cells(),
            remarks: remark.to_string(),
            status: RowStatus::Failed,
        }
    }

    /// Builds the row for unclassifiable input.
    #[must_use]
    pub fn unrecognized(target: &str, matcher: &ColumnMatcher) -> Self {
        Self {
            target: target.to_string(),
            app_name: EMPTY_CELL.to_string(),
            url: EMPTY_CELL.to_string(),
            disclosure_url: EMPTY_CELL.to_string(),
            is_https: EMPTY_CELL.to_string(),
            columns: matcher.empty_cells(),
            remarks: REMARK_UNRECOGNIZED.to_string(),
            status: RowStatus::Malformed,
        }
    }

    /// Returns the CSV record in header order.
    #[must_use]
    pub fn to_record(&self) -> Vec<&str> {
        let mut record = vec![
            self.target.as_str(),
            self.app_name.as_str(),
            self.url.as_str(),
            self.disclosure_url.as_str(),
            self.is_https.as_str(),
        ];
        record.extend(self.columns.iter().map(String::as_str));
        record.push(self.remarks.as_str());
        record
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BODY: &str = "google.com, pub-1, DIRECT, f08c47fec0942fa0\r\n\
        \r\n\
        GOOGLE.COM,pub-2,RESELLER\r\n\
        appnexus.com, 123, DIRECT\n\
        rubiconproject.com, 9, RESELLER\n\
        openx.com, 5, DIRECT\n";

    fn fetched<'a>(content_type: Option<&'a str>, body: &'a str) -> FetchedRow<'a> {
        FetchedRow {
            target: "https://play.google.com/store/apps/details?id=com.example",
            app_name: "Example",
            url: "https://example.com",
            disclosure_url: "https://example.com/app-ads.txt",
            is_https: true,
            content_type,
            body,
        }
    }

    #[test]
    fn test_disclosure_lines_drops_blank_and_cr() {
        let lines = disclosure_lines("a\r\n\r\n  \nb\r\nc");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_column_matches_both_comma_spellings() {
        let matcher = ColumnMatcher::new(&["Google.com , DIRECT", "google.com,reseller"], MatchMode::Lines);
        let lines = disclosure_lines(BODY);
        let cells = matcher.extract(BODY, &lines);
        assert_eq!(cells[0], "-");
        assert_eq!(cells[1], "-");

        let matcher = ColumnMatcher::new(&["google.com", "pub-2,reseller", "nothing.here"], MatchMode::Lines);
        let cells = matcher.extract(BODY, &lines);
        assert_eq!(
            cells[0],
            "google.com, pub-1, DIRECT, f08c47fec0942fa0; GOOGLE.COM,pub-2,RESELLER"
        );
        assert_eq!(cells[1], "GOOGLE.COM,pub-2,RESELLER");
        assert_eq!(cells[2], "-");
    }

    #[test]
    fn test_spaced_label_matches_compact_line() {
        let matcher = ColumnMatcher::new(&["google.com, pub-2"], MatchMode::Lines);
        let lines = disclosure_lines(BODY);
        assert_eq!(matcher.extract(BODY, &lines), vec!["GOOGLE.COM,pub-2,RESELLER"]);
    }

    #[test]
    fn test_presence_mode() {
        let matcher = ColumnMatcher::new(&["openx.com, 5", "pubmatic.com"], MatchMode::Presence);
        let lines = disclosure_lines(BODY);
        assert_eq!(matcher.extract(BODY, &lines), vec!["True", "False"]);
    }

    #[test]
    fn test_fetched_row_success() {
        let matcher = ColumnMatcher::new(&["appnexus.com"], MatchMode::Lines);
        let row = ReportRow::fetched(&fetched(Some("text/plain; charset=utf-8"), BODY), &matcher, 5);
        assert_eq!(row.status, RowStatus::Succeeded);
        assert_eq!(row.columns, vec!["appnexus.com, 123, DIRECT"]);
        assert_eq!(row.is_https, "True");
        assert_eq!(row.remarks, "");
    }

    #[test]
    fn test_too_few_lines_is_soft_failure() {
        let matcher = ColumnMatcher::new(&["a.com"], MatchMode::Lines);
        let row = ReportRow::fetched(&fetched(Some("text/plain"), "a.com, 1\nb.com, 2\n\nc.com, 3\n"), &matcher, 5);
        assert_eq!(row.remarks, "3 lines only.");
        assert_eq!(row.columns, vec!["-"]);
        assert_eq!(row.status, RowStatus::SoftFailed);
        assert!(!row.status.is_hard_failure());
        assert_eq!(row.disclosure_url, "https://example.com/app-ads.txt");
    }

    #[test]
    fn test_html_is_hard_failure() {
        let matcher = ColumnMatcher::new(&["a.com"], MatchMode::Lines);
        let row = ReportRow::fetched(&fetched(Some("text/html"), "<html></html>"), &matcher, 5);
        assert_eq!(row.remarks, REMARK_NOT_TEXT);
        assert_eq!(row.app_name, "-");
        assert_eq!(row.url, "-");
        assert_eq!(row.disclosure_url, "-");
        assert_eq!(row.is_https, "True");
        assert!(row.status.is_hard_failure());
    }

    #[test]
    fn test_missing_content_type_counts_as_text() {
        assert!(is_plain_text(None));
        assert!(is_plain_text(Some("Text/Plain")));
        assert!(!is_plain_text(Some("application/octet-stream")));
    }

    #[test]
    fn test_failed_and_unrecognized_rows() {
        let matcher = ColumnMatcher::new(&["x", "y"], MatchMode::Lines);
        let row = ReportRow::failed("t", Some("App"), None, "HTTP 500 fetching u", &matcher);
        assert_eq!(row.disclosure_url, FAILED_CELL);
        assert_eq!(row.url, "-");
        assert_eq!(row.to_record(), vec!["t", "App", "-", "Failed", "-", "-", "-", "HTTP 500 fetching u"]);

        let row = ReportRow::unrecognized("???", &matcher);
        assert_eq!(row.remarks, REMARK_UNRECOGNIZED);
        assert_eq!(row.status, RowStatus::Malformed);
        assert!(!row.status.is_hard_failure());
    }
}
