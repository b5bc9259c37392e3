use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, JobApplication, Priority};
use super::validation::{parse_iso_date, ValidationErrors, INVALID_DATE};

/// Text columns that free-text search can look into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Company,
    Role,
    Location,
    Source,
    Stage,
    Tags,
    Notes,
}

impl SearchField {
    pub fn value(self, record: &JobApplication) -> &str {
        match self {
            SearchField::Company => &record.company,
            SearchField::Role => &record.role,
            SearchField::Location => &record.location,
            SearchField::Source => &record.source,
            SearchField::Stage => &record.stage,
            SearchField::Tags => &record.tags,
            SearchField::Notes => &record.notes,
        }
    }
}

/// Fields searched by the public list endpoint.
pub const API_SEARCH_FIELDS: &[SearchField] = &[
    SearchField::Company,
    SearchField::Role,
    SearchField::Location,
    SearchField::Source,
    SearchField::Stage,
    SearchField::Tags,
    SearchField::Notes,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    AppliedDate,
    Company,
    Role,
    Priority,
    Status,
    UpdatedAt,
    CreatedAt,
    FollowUpDate,
}

impl SortField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "applied_date" => Some(SortField::AppliedDate),
            "company" => Some(SortField::Company),
            "role" => Some(SortField::Role),
            "priority" => Some(SortField::Priority),
            "status" => Some(SortField::Status),
            "updated_at" => Some(SortField::UpdatedAt),
            "created_at" => Some(SortField::CreatedAt),
            "follow_up_date" => Some(SortField::FollowUpDate),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SortField::AppliedDate => "applied_date",
            SortField::Company => "company",
            SortField::Role => "role",
            SortField::Priority => "priority",
            SortField::Status => "status",
            SortField::UpdatedAt => "updated_at",
            SortField::CreatedAt => "created_at",
            SortField::FollowUpDate => "follow_up_date",
        }
    }

    /// Ascending comparison. Missing dates sort before any date, and choice
    /// fields compare by their stored label.
    fn compare(self, left: &JobApplication, right: &JobApplication) -> Ordering {
        match self {
            SortField::AppliedDate => left.applied_date.cmp(&right.applied_date),
            SortField::FollowUpDate => left.follow_up_date.cmp(&right.follow_up_date),
            SortField::Company => left.company.cmp(&right.company),
            SortField::Role => left.role.cmp(&right.role),
            SortField::Priority => left.priority.label().cmp(right.priority.label()),
            SortField::Status => left.status.label().cmp(right.status.label()),
            SortField::UpdatedAt => left.updated_at.cmp(&right.updated_at),
            SortField::CreatedAt => left.created_at.cmp(&right.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingTerm {
    pub field: SortField,
    pub descending: bool,
}

impl OrderingTerm {
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    fn compare(&self, left: &JobApplication, right: &JobApplication) -> Ordering {
        let ordering = self.field.compare(left, right);
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// `-applied_date, -updated_at`
pub const DEFAULT_ORDERING: &[OrderingTerm] = &[
    OrderingTerm::desc(SortField::AppliedDate),
    OrderingTerm::desc(SortField::UpdatedAt),
];

/// Parse `-applied_date,company` style ordering. Unknown names are dropped;
/// nothing usable falls back to the default ordering.
pub fn parse_ordering(raw: &str) -> Vec<OrderingTerm> {
    let terms: Vec<OrderingTerm> = raw
        .split(',')
        .map(str::trim)
        .filter_map(|term| match term.strip_prefix('-') {
            Some(name) => SortField::parse(name).map(OrderingTerm::desc),
            None => SortField::parse(term).map(OrderingTerm::asc),
        })
        .collect();

    if terms.is_empty() {
        DEFAULT_ORDERING.to_vec()
    } else {
        terms
    }
}

pub fn sort_records(records: &mut [JobApplication], ordering: &[OrderingTerm]) {
    records.sort_by(|left, right| {
        ordering
            .iter()
            .map(|term| term.compare(left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| left.id.cmp(&right.id))
    });
}

/// Inclusive bounds on an optional date column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub gte: Option<NaiveDate>,
    pub lte: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }

    /// A missing date only satisfies an unbounded range.
    pub fn contains(&self, value: Option<NaiveDate>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(date) = value else {
            return false;
        };
        self.gte.map_or(true, |low| date >= low) && self.lte.map_or(true, |high| date <= high)
    }
}

/// Raw list query string, as sent by clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(
        default,
        rename = "applied_date__gte",
        skip_serializing_if = "Option::is_none"
    )]
    pub applied_date_gte: Option<String>,
    #[serde(
        default,
        rename = "applied_date__lte",
        skip_serializing_if = "Option::is_none"
    )]
    pub applied_date_lte: Option<String>,
    #[serde(
        default,
        rename = "follow_up_date__gte",
        skip_serializing_if = "Option::is_none"
    )]
    pub follow_up_date_gte: Option<String>,
    #[serde(
        default,
        rename = "follow_up_date__lte",
        skip_serializing_if = "Option::is_none"
    )]
    pub follow_up_date_lte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,
}

impl ListParams {
    /// Every supplied parameter except `page`, in a stable order, for building
    /// pagination links.
    pub fn filter_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("search", &self.search),
            ("status", &self.status),
            ("priority", &self.priority),
            ("applied_date__gte", &self.applied_date_gte),
            ("applied_date__lte", &self.applied_date_lte),
            ("follow_up_date__gte", &self.follow_up_date_gte),
            ("follow_up_date__lte", &self.follow_up_date_lte),
            ("ordering", &self.ordering),
            ("page_size", &self.page_size),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }

    pub fn wants_page(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }
}

/// Validated search, filter and ordering criteria for listing applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationQuery {
    pub search: Option<String>,
    pub search_fields: &'static [SearchField],
    pub status: Option<ApplicationStatus>,
    pub priority: Option<Priority>,
    pub applied_date: DateRange,
    pub follow_up_date: DateRange,
    pub ordering: Vec<OrderingTerm>,
}

impl Default for ApplicationQuery {
    fn default() -> Self {
        Self {
            search: None,
            search_fields: API_SEARCH_FIELDS,
            status: None,
            priority: None,
            applied_date: DateRange::default(),
            follow_up_date: DateRange::default(),
            ordering: DEFAULT_ORDERING.to_vec(),
        }
    }
}

impl ApplicationQuery {
    pub fn from_params(params: &ListParams) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let status = non_blank(&params.status).and_then(|raw| match raw.parse() {
            Ok(status) => Some(status),
            Err(_) => {
                errors.add("status", invalid_filter_choice(raw));
                None
            }
        });
        let priority = non_blank(&params.priority).and_then(|raw| match raw.parse() {
            Ok(priority) => Some(priority),
            Err(_) => {
                errors.add("priority", invalid_filter_choice(raw));
                None
            }
        });

        let applied_date = DateRange {
            gte: date_bound(&params.applied_date_gte, "applied_date__gte", &mut errors),
            lte: date_bound(&params.applied_date_lte, "applied_date__lte", &mut errors),
        };
        let follow_up_date = DateRange {
            gte: date_bound(&params.follow_up_date_gte, "follow_up_date__gte", &mut errors),
            lte: date_bound(&params.follow_up_date_lte, "follow_up_date__lte", &mut errors),
        };

        let ordering = params
            .ordering
            .as_deref()
            .map(parse_ordering)
            .unwrap_or_else(|| DEFAULT_ORDERING.to_vec());

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            search: non_blank(&params.search).map(str::to_string),
            search_fields: API_SEARCH_FIELDS,
            status,
            priority,
            applied_date,
            follow_up_date,
            ordering,
        })
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = (!term.trim().is_empty()).then(|| term.trim().to_string());
        self
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_ordering(mut self, ordering: Vec<OrderingTerm>) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn matches(&self, record: &JobApplication) -> bool {
        self.status.map_or(true, |status| record.status == status)
            && self.priority.map_or(true, |priority| record.priority == priority)
            && self.applied_date.contains(record.applied_date)
            && self.follow_up_date.contains(record.follow_up_date)
            && self.matches_search(record)
    }

    fn matches_search(&self, record: &JobApplication) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let needle = term.to_lowercase();
        self.search_fields
            .iter()
            .any(|field| field.value(record).to_lowercase().contains(&needle))
    }

    /// Filter then order.
    pub fn apply(&self, records: Vec<JobApplication>) -> Vec<JobApplication> {
        let mut selected: Vec<JobApplication> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();
        sort_records(&mut selected, &self.ordering);
        selected
    }
}

fn invalid_filter_choice(raw: &str) -> String {
    format!("Select a valid choice. {raw} is not one of the available choices.")
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn date_bound(
    value: &Option<String>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<NaiveDate> {
    let raw = non_blank(value)?;
    let parsed = parse_iso_date(raw);
    if parsed.is_none() {
        errors.add(field, INVALID_DATE);
    }
    parsed
}
