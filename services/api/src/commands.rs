use crate::infra::{format_for_path, open_file_service, parse_date};
use chrono::{Local, NaiveDate};
use clap::Args;
use job_tracker::applications::{
    exchange, AdminFilters, AppliedWindow, ApplicationQuery, ApplicationStatus, ExchangeError,
    ExchangeFormat, ImportReport, JobApplication, Priority,
};
use job_tracker::error::AppError;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct AdminListArgs {
    /// Case-insensitive text searched across the admin search fields
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Only show applications with this status (e.g. Applied)
    #[arg(long)]
    pub(crate) status: Option<ApplicationStatus>,
    /// Only show applications with this priority (Low, Medium, High)
    #[arg(long)]
    pub(crate) priority: Option<Priority>,
    /// Applied date window: today, past-7-days, this-month, this-year, no-date, has-date
    #[arg(long)]
    pub(crate) applied: Option<AppliedWindow>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Output format; guessed from --output when omitted, JSON otherwise
    #[arg(long)]
    pub(crate) format: Option<ExchangeFormat>,
    /// Destination file (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Only export applications matching this search text
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Only export applications with this status
    #[arg(long)]
    pub(crate) status: Option<ApplicationStatus>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV or JSON file to import
    pub(crate) path: PathBuf,
    /// Input format; guessed from the file extension when omitted
    #[arg(long)]
    pub(crate) format: Option<ExchangeFormat>,
}

#[derive(Args, Debug)]
pub(crate) struct FollowupsArgs {
    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Maximum number of follow-ups to show
    #[arg(long, default_value_t = 5)]
    pub(crate) limit: usize,
}

pub(crate) fn run_admin_list(
    args: AdminListArgs,
    data_file: Option<PathBuf>,
) -> Result<(), AppError> {
    let service = open_file_service(data_file)?;
    let filters = AdminFilters {
        search: args.search,
        status: args.status,
        priority: args.priority,
        applied: args.applied.unwrap_or_default(),
    };

    let table = service.admin_table(&filters)?;
    println!("{}", table.render_text());
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs, data_file: Option<PathBuf>) -> Result<(), AppError> {
    let service = open_file_service(data_file)?;
    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(format_for_path))
        .unwrap_or_default();

    let mut query = ApplicationQuery::default();
    if let Some(search) = args.search {
        query = query.with_search(search);
    }
    if let Some(status) = args.status {
        query = query.with_status(status);
    }
    let records = service.list(&query)?;

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            exchange::export(&records, format, &mut writer)?;
            writer.flush()?;
            eprintln!(
                "Exported {} application(s) to {} as {format}",
                records.len(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            exchange::export(&records, format, &mut writer)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs, data_file: Option<PathBuf>) -> Result<(), AppError> {
    let format = match args.format.or_else(|| format_for_path(&args.path)) {
        Some(format) => format,
        None => {
            let extension = args
                .path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(ExchangeError::UnsupportedFormat(extension).into());
        }
    };

    let service = open_file_service(data_file)?;
    let reader = BufReader::new(File::open(&args.path)?);
    let payloads = exchange::import(format, reader)?;
    let report = service.import(payloads)?;

    print!("{}", render_import_report(&report));
    Ok(())
}

pub(crate) fn run_followups(
    args: FollowupsArgs,
    data_file: Option<PathBuf>,
) -> Result<(), AppError> {
    let service = open_file_service(data_file)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let records = service.upcoming_follow_ups(today, args.limit)?;

    print!("{}", render_followups(&records, today));
    Ok(())
}

fn render_import_report(report: &ImportReport) -> String {
    let mut out = format!(
        "Imported {} application(s), {} failed\n",
        report.created, report.failed
    );
    for failure in &report.errors {
        let fields: Vec<String> = failure
            .errors
            .fields()
            .map(|field| format!("{field}: {}", failure.errors.messages(field).join(" ")))
            .collect();
        out.push_str(&format!("- row {}: {}\n", failure.row, fields.join("; ")));
    }
    out
}

fn render_followups(records: &[JobApplication], today: NaiveDate) -> String {
    if records.is_empty() {
        return format!("No follow-ups due on or after {today}\n");
    }

    let mut out = format!("Upcoming follow-ups from {today}\n");
    for record in records {
        let due = record
            .follow_up_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "- {due}  {} [{}]\n",
            record.display_name(),
            record.status
        ));
    }
    out
}
