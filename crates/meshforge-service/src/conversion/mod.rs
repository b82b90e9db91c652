//! Conversion job operations: submit, status, download, cancel.

pub mod download;
pub mod service;

pub use download::{ArtifactDownload, DownloadService};
pub use service::ConversionService;

use meshforge_core::error::AppError;
use meshforge_core::types::JobId;

/// Parse a caller-supplied job id. Malformed ids are indistinguishable from
/// unknown ones.
pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, AppError> {
    raw.trim()
        .parse::<JobId>()
        .map_err(|_| AppError::not_found(format!("Job {raw} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshforge_core::error::ErrorKind;

    #[test]
    fn test_parse_job_id() {
        let id = JobId::new();
        assert_eq!(parse_job_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_job_id(&format!(" {id}\n")).unwrap(), id);

        let err = parse_job_id("not-a-job").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
