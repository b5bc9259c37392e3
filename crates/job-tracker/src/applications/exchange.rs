use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::JobApplication;
use super::validation::ApplicationPayload;

/// Column order shared by CSV export and import.
pub const CSV_HEADERS: [&str; 14] = [
    "company",
    "role",
    "location",
    "job_url",
    "source",
    "status",
    "stage",
    "salary",
    "applied_date",
    "follow_up_date",
    "priority",
    "resume_version",
    "tags",
    "notes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeFormat {
    #[default]
    Json,
    Csv,
}

impl ExchangeFormat {
    pub const fn content_type(self) -> &'static str {
        match self {
            ExchangeFormat::Json => "application/json",
            ExchangeFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            ExchangeFormat::Json => "applications.json",
            ExchangeFormat::Csv => "applications.csv",
        }
    }

    /// Pick a format from a media type, ignoring parameters such as charset.
    pub fn from_mime(value: &mime::Mime) -> Option<Self> {
        if value.essence_str() == mime::APPLICATION_JSON.essence_str() {
            Some(ExchangeFormat::Json)
        } else if value.essence_str() == mime::TEXT_CSV.essence_str() {
            Some(ExchangeFormat::Csv)
        } else {
            None
        }
    }
}

impl FromStr for ExchangeFormat {
    type Err = ExchangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExchangeFormat::Json),
            "csv" => Ok(ExchangeFormat::Csv),
            other => Err(ExchangeError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExchangeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeFormat::Json => f.write_str("json"),
            ExchangeFormat::Csv => f.write_str("csv"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("unsupported format '{0}', expected json or csv")]
    UnsupportedFormat(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One spreadsheet row. Every cell is text; empty cells mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CsvRow {
    #[serde(default)]
    company: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    job_url: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    stage: String,
    #[serde(default)]
    salary: String,
    #[serde(default)]
    applied_date: String,
    #[serde(default)]
    follow_up_date: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    resume_version: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    notes: String,
}

impl From<&JobApplication> for CsvRow {
    fn from(record: &JobApplication) -> Self {
        let date = |value: Option<chrono::NaiveDate>| {
            value
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        Self {
            company: record.company.clone(),
            role: record.role.clone(),
            location: record.location.clone(),
            job_url: record.job_url.clone(),
            source: record.source.clone(),
            status: record.status.label().to_string(),
            stage: record.stage.clone(),
            salary: record.salary.clone(),
            applied_date: date(record.applied_date),
            follow_up_date: date(record.follow_up_date),
            priority: record.priority.label().to_string(),
            resume_version: record.resume_version.clone(),
            tags: record.tags.clone(),
            notes: record.notes.clone(),
        }
    }
}

impl From<CsvRow> for ApplicationPayload {
    fn from(row: CsvRow) -> Self {
        // Blank choice cells fall back to defaults; blank date cells clear.
        let text = |value: String| Some(Some(value));
        let choice = |value: String| {
            (!value.trim().is_empty()).then(|| Some(value.trim().to_string()))
        };
        let date = |value: String| Some((!value.trim().is_empty()).then_some(value));
        Self {
            company: text(row.company),
            role: text(row.role),
            location: text(row.location),
            job_url: text(row.job_url),
            source: text(row.source),
            status: choice(row.status),
            stage: text(row.stage),
            salary: text(row.salary),
            applied_date: date(row.applied_date),
            follow_up_date: date(row.follow_up_date),
            priority: choice(row.priority),
            resume_version: text(row.resume_version),
            tags: text(row.tags),
            notes: text(row.notes),
        }
    }
}

pub fn write_csv<W: Write>(records: &[JobApplication], writer: W) -> Result<(), ExchangeError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);
    if records.is_empty() {
        csv_writer.write_record(CSV_HEADERS)?;
    }
    for record in records {
        csv_writer.serialize(CsvRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(records: &[JobApplication], writer: W) -> Result<(), ExchangeError> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn export<W: Write>(
    records: &[JobApplication],
    format: ExchangeFormat,
    writer: W,
) -> Result<(), ExchangeError> {
    match format {
        ExchangeFormat::Json => write_json(records, writer),
        ExchangeFormat::Csv => write_csv(records, writer),
    }
}

/// Read create payloads from CSV with a header row. Missing columns read as
/// empty cells.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ApplicationPayload>, ExchangeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let mut payloads = Vec::new();

    for row in csv_reader.deserialize::<CsvRow>() {
        payloads.push(ApplicationPayload::from(row?));
    }

    Ok(payloads)
}

/// Read create payloads from a JSON array; exported records are accepted as is.
pub fn read_json<R: Read>(reader: R) -> Result<Vec<ApplicationPayload>, ExchangeError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn import<R: Read>(
    format: ExchangeFormat,
    reader: R,
) -> Result<Vec<ApplicationPayload>, ExchangeError> {
    match format {
        ExchangeFormat::Json => read_json(reader),
        ExchangeFormat::Csv => read_csv(reader),
    }
}
