//! Back-office list view over job applications.
//!
//! The view is plain data: which columns to show, which filters and search
//! fields to offer, and how to order rows. Nothing here is registered or
//! mutated at runtime.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::domain::{ApplicationStatus, JobApplication, Priority};
use super::query::{sort_records, OrderingTerm, SearchField, SortField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminColumn {
    Company,
    Role,
    Status,
    Priority,
    AppliedDate,
    UpdatedAt,
}

impl AdminColumn {
    pub const fn header(self) -> &'static str {
        match self {
            AdminColumn::Company => "company",
            AdminColumn::Role => "role",
            AdminColumn::Status => "status",
            AdminColumn::Priority => "priority",
            AdminColumn::AppliedDate => "applied_date",
            AdminColumn::UpdatedAt => "updated_at",
        }
    }

    fn render(self, record: &JobApplication) -> String {
        match self {
            AdminColumn::Company => record.company.clone(),
            AdminColumn::Role => record.role.clone(),
            AdminColumn::Status => record.status.label().to_string(),
            AdminColumn::Priority => record.priority.label().to_string(),
            AdminColumn::AppliedDate => record
                .applied_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| EMPTY_CELL.to_string()),
            AdminColumn::UpdatedAt => record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Placeholder shown for unset values.
pub const EMPTY_CELL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminFilterField {
    Status,
    Priority,
    AppliedDate,
}

/// Declarative list view configuration.
#[derive(Debug)]
pub struct AdminListView {
    pub list_display: &'static [AdminColumn],
    pub list_filter: &'static [AdminFilterField],
    pub search_fields: &'static [SearchField],
    pub ordering: &'static [OrderingTerm],
}

pub static ADMIN_LIST_VIEW: AdminListView = AdminListView {
    list_display: &[
        AdminColumn::Company,
        AdminColumn::Role,
        AdminColumn::Status,
        AdminColumn::Priority,
        AdminColumn::AppliedDate,
        AdminColumn::UpdatedAt,
    ],
    list_filter: &[
        AdminFilterField::Status,
        AdminFilterField::Priority,
        AdminFilterField::AppliedDate,
    ],
    search_fields: &[
        SearchField::Company,
        SearchField::Role,
        SearchField::Tags,
        SearchField::Notes,
        SearchField::Location,
        SearchField::Source,
    ],
    ordering: &[
        OrderingTerm::desc(SortField::AppliedDate),
        OrderingTerm::desc(SortField::UpdatedAt),
    ],
};

/// Preset windows offered by the `applied_date` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppliedWindow {
    #[default]
    AnyDate,
    Today,
    PastSevenDays,
    ThisMonth,
    ThisYear,
    NoDate,
    HasDate,
}

impl AppliedWindow {
    pub fn contains(self, value: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self, value) {
            (AppliedWindow::AnyDate, _) => true,
            (AppliedWindow::NoDate, value) => value.is_none(),
            (AppliedWindow::HasDate, value) => value.is_some(),
            (_, None) => false,
            (AppliedWindow::Today, Some(date)) => date == today,
            (AppliedWindow::PastSevenDays, Some(date)) => {
                date >= today - Duration::days(7) && date <= today
            }
            (AppliedWindow::ThisMonth, Some(date)) => {
                date.year() == today.year() && date.month() == today.month()
            }
            (AppliedWindow::ThisYear, Some(date)) => date.year() == today.year(),
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            AppliedWindow::AnyDate => "any",
            AppliedWindow::Today => "today",
            AppliedWindow::PastSevenDays => "past-7-days",
            AppliedWindow::ThisMonth => "this-month",
            AppliedWindow::ThisYear => "this-year",
            AppliedWindow::NoDate => "no-date",
            AppliedWindow::HasDate => "has-date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown applied date window '{0}'")]
pub struct UnknownWindow(pub String);

impl FromStr for AppliedWindow {
    type Err = UnknownWindow;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let window = match value.trim() {
            "" | "any" => AppliedWindow::AnyDate,
            "today" => AppliedWindow::Today,
            "past-7-days" => AppliedWindow::PastSevenDays,
            "this-month" => AppliedWindow::ThisMonth,
            "this-year" => AppliedWindow::ThisYear,
            "no-date" => AppliedWindow::NoDate,
            "has-date" => AppliedWindow::HasDate,
            other => return Err(UnknownWindow(other.to_string())),
        };
        Ok(window)
    }
}

impl fmt::Display for AppliedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Filters selected in the admin list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminFilters {
    pub search: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub priority: Option<Priority>,
    pub applied: AppliedWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub count: usize,
}

impl AdminTable {
    /// Fixed-width text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|column| column.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}", width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(line(self.columns.clone()));
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        out.push(line(rule.iter().map(String::as_str).collect()));
        for row in &self.rows {
            out.push(line(row.iter().map(String::as_str).collect()));
        }
        out.push(format!("{} application(s)", self.count));
        out.join("\n")
    }
}

impl AdminListView {
    pub fn headers(&self) -> Vec<&'static str> {
        self.list_display.iter().map(|column| column.header()).collect()
    }

    pub fn matches(
        &self,
        record: &JobApplication,
        filters: &AdminFilters,
        today: NaiveDate,
    ) -> bool {
        let offered = |field| self.list_filter.contains(&field);

        let status_ok = !offered(AdminFilterField::Status)
            || filters.status.map_or(true, |status| record.status == status);
        let priority_ok = !offered(AdminFilterField::Priority)
            || filters.priority.map_or(true, |priority| record.priority == priority);
        let applied_ok = !offered(AdminFilterField::AppliedDate)
            || filters.applied.contains(record.applied_date, today);

        let search_ok = match filters.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let needle = term.to_lowercase();
                self.search_fields
                    .iter()
                    .any(|field| field.value(record).to_lowercase().contains(&needle))
            }
        };

        status_ok && priority_ok && applied_ok && search_ok
    }

    pub fn table(
        &self,
        records: Vec<JobApplication>,
        filters: &AdminFilters,
        today: NaiveDate,
    ) -> AdminTable {
        let mut selected: Vec<JobApplication> = records
            .into_iter()
            .filter(|record| self.matches(record, filters, today))
            .collect();
        sort_records(&mut selected, self.ordering);

        let rows: Vec<Vec<String>> = selected
            .iter()
            .map(|record| {
                self.list_display
                    .iter()
                    .map(|column| column.render(record))
                    .collect()
            })
            .collect();

        AdminTable {
            columns: self.headers(),
            count: rows.len(),
            rows,
        }
    }
}
