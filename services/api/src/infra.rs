use chrono::NaiveDate;
use job_tracker::applications::{
    ExchangeFormat, InMemoryApplicationRepository, JobApplicationService,
};
use job_tracker::config::{AppConfig, StorageConfig};
use job_tracker::error::AppError;
use job_tracker::telemetry::{self, LogOutput};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type TrackerService = JobApplicationService<InMemoryApplicationRepository>;

/// Load configuration, letting a `--data-file` flag win over `APP_DATA_FILE`.
pub(crate) fn load_config(data_file: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = data_file {
        config.storage.data_file = Some(path);
    }
    Ok(config)
}

/// Snapshot-backed store when a data file is configured, otherwise memory only.
pub(crate) fn open_repository(
    storage: &StorageConfig,
) -> Result<InMemoryApplicationRepository, AppError> {
    match &storage.data_file {
        Some(path) => Ok(InMemoryApplicationRepository::with_snapshot(path)?),
        None => Ok(InMemoryApplicationRepository::default()),
    }
}

/// Service for one-shot CLI commands. These only make sense against a file.
pub(crate) fn open_file_service(data_file: Option<PathBuf>) -> Result<TrackerService, AppError> {
    let config = load_config(data_file)?;
    telemetry::init(&config.telemetry, LogOutput::Stderr)?;
    config.storage.require_data_file()?;
    let repository = open_repository(&config.storage)?;
    Ok(JobApplicationService::new(
        Arc::new(repository),
        config.listing,
    ))
}

/// Guess an exchange format from a file extension.
pub(crate) fn format_for_path(path: &Path) -> Option<ExchangeFormat> {
    mime_guess::from_path(path)
        .iter()
        .find_map(|media| ExchangeFormat::from_mime(&media))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_tracker::applications::ApplicationRepository;

    #[test]
    fn formats_follow_file_extensions() {
        assert_eq!(
            format_for_path(Path::new("exports/applications.csv")),
            Some(ExchangeFormat::Csv)
        );
        assert_eq!(
            format_for_path(Path::new("applications.JSON")),
            Some(ExchangeFormat::Json)
        );
        assert_eq!(format_for_path(Path::new("applications.xlsx")), None);
        assert_eq!(format_for_path(Path::new("applications")), None);
    }

    #[test]
    fn dates_must_be_iso() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15).expect("valid");
        assert_eq!(parse_date(" 2025-08-15 "), Ok(expected));
        let err = parse_date("15/08/2025").expect_err("not iso");
        assert!(err.contains("YYYY-MM-DD"));
    }

    #[test]
    fn repository_without_data_file_is_memory_only() {
        let repository = open_repository(&StorageConfig::default()).expect("opens");
        assert!(repository.snapshot_path().is_none());
        assert!(repository.all().expect("readable").is_empty());
    }
}
