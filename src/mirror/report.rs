// src/mirror/report.rs
// =============================================================================
// The summary of one mirror run.
//
// Branch failures never stop the run; they are collected here instead and
// printed at the end (as a table, or as JSON with --json).
// =============================================================================

use serde::{Deserialize, Serialize};

// Why a branch of the tree was not mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The url could not be fetched (network error, timeout, non-2xx)
    Fetch,
    /// A directory or file could not be created or written
    Filesystem,
    /// Another url already maps to the same local file name
    NameCollision,
    /// Directory not descended because of --max-depth
    DepthLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub url: String,
    pub kind: FailureKind,
    /// HTTP status, when the server answered with a non-2xx code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub url: String,
    pub path: String,
    pub bytes: u64,
    /// Number of writes it took on disk
    pub chunks: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    /// Local directories made (or found already present) for listings
    pub directories: usize,
    pub files: Vec<DownloadedFile>,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn bytes_written(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }

    // Failures that make the run partial. Depth-limited branches were skipped
    // on request, so they do not count.
    pub fn error_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.kind != FailureKind::DepthLimit)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.error_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(kind: FailureKind) -> Failure {
        Failure {
            url: "http://x/data/f".to_string(),
            kind,
            status: None,
            message: String::new(),
        }
    }

    #[test]
    fn test_depth_limit_does_not_make_run_partial() {
        let mut report = Report::default();
        report.failures.push(failure(FailureKind::DepthLimit));
        assert!(report.is_complete());

        report.failures.push(failure(FailureKind::Fetch));
        assert!(!report.is_complete());
        assert_eq!(report.error_count(), 1);

        report.failures.push(failure(FailureKind::NameCollision));
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = Report::default();
        report.files.push(DownloadedFile {
            url: "http://x/data/f.bin".to_string(),
            path: "/tmp/data/f.bin".to_string(),
            bytes: 3,
            chunks: 1,
        });
        let mut missing = failure(FailureKind::Fetch);
        missing.status = Some(404);
        report.failures.push(missing);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["bytes"], 3);
        assert_eq!(json["failures"][0]["kind"], "fetch");
        assert_eq!(json["failures"][0]["status"], 404);
        assert_eq!(report.bytes_written(), 3);
    }
}
