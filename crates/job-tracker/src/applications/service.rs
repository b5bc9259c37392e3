use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::admin::{AdminFilters, AdminTable, ADMIN_LIST_VIEW};
use super::domain::{ApplicationId, JobApplication};
use super::pagination::{InvalidPage, Page, PageRequest};
use super::query::{ApplicationQuery, DateRange, ListParams, OrderingTerm, SortField};
use super::repository::{ApplicationRepository, RepositoryError};
use super::validation::{ApplicationPayload, ValidationErrors, WriteMode};
use crate::config::ListingConfig;

/// Source of "now" for timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// CRUD, listing and bulk import over a repository.
pub struct JobApplicationService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    listing: ListingConfig,
}

impl<R> JobApplicationService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, listing: ListingConfig) -> Self {
        Self::with_clock(repository, Arc::new(SystemClock), listing)
    }

    pub fn with_clock(repository: Arc<R>, clock: Arc<dyn Clock>, listing: ListingConfig) -> Self {
        Self {
            repository,
            clock,
            listing,
        }
    }

    pub fn listing(&self) -> ListingConfig {
        self.listing
    }

    pub fn create(
        &self,
        payload: ApplicationPayload,
    ) -> Result<JobApplication, ApplicationServiceError> {
        let changes = payload.validate(WriteMode::Create).map_err(|errors| {
            tracing::debug!(%errors, "rejected application create");
            errors
        })?;

        let mut record = JobApplication::new(String::new(), String::new(), self.clock.now());
        changes.apply_to(&mut record);

        let stored = self.repository.insert(record)?;
        tracing::info!(
            application_id = %stored.id,
            company = %stored.company,
            "application created"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<JobApplication, ApplicationServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<JobApplication>, ApplicationServiceError> {
        let records = self.repository.all()?;
        Ok(query.apply(records))
    }

    /// Parse raw list parameters, then list. Paginates when the caller asked
    /// for a page.
    pub fn list_from_params(
        &self,
        params: &ListParams,
        base_path: &str,
    ) -> Result<Listing, ApplicationServiceError> {
        let query = ApplicationQuery::from_params(params)?;
        let records = self.list(&query)?;
        if !params.wants_page() {
            return Ok(Listing::All(records));
        }
        let request = PageRequest::from_params(params, self.listing.default_page_size)?;
        let page = Page::paginate(records, request, base_path, params)?;
        Ok(Listing::Page(page))
    }

    /// Full update: `company` and `role` must be supplied again.
    pub fn replace(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
    ) -> Result<JobApplication, ApplicationServiceError> {
        self.update(id, payload, WriteMode::Replace)
    }

    pub fn patch(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
    ) -> Result<JobApplication, ApplicationServiceError> {
        self.update(id, payload, WriteMode::Patch)
    }

    fn update(
        &self,
        id: &ApplicationId,
        payload: ApplicationPayload,
        mode: WriteMode,
    ) -> Result<JobApplication, ApplicationServiceError> {
        let mut record = self.get(id)?;
        let changes = payload.validate(mode).map_err(|errors| {
            tracing::debug!(application_id = %id, %errors, "rejected application update");
            errors
        })?;

        changes.apply_to(&mut record);
        record.touch(self.clock.now());

        let stored = self.repository.update(record)?;
        tracing::info!(application_id = %stored.id, status = %stored.status, "application updated");
        Ok(stored)
    }

    pub fn delete(&self, id: &ApplicationId) -> Result<(), ApplicationServiceError> {
        self.repository.remove(id)?;
        tracing::info!(application_id = %id, "application deleted");
        Ok(())
    }

    /// Create each payload independently; one bad row never blocks the rest.
    pub fn import(
        &self,
        payloads: Vec<ApplicationPayload>,
    ) -> Result<ImportReport, ApplicationServiceError> {
        let mut report = ImportReport::default();
        for (row, payload) in payloads.into_iter().enumerate() {
            match self.create(payload) {
                Ok(_) => report.created += 1,
                Err(ApplicationServiceError::Validation(errors)) => {
                    report.failed += 1;
                    report.errors.push(ImportFailure {
                        row: row + 1,
                        errors,
                    });
                }
                Err(other) => return Err(other),
            }
        }
        tracing::info!(
            created = report.created,
            failed = report.failed,
            "application import finished"
        );
        Ok(report)
    }

    /// Follow-ups due on or after `today`, soonest first.
    pub fn upcoming_follow_ups(
        &self,
        today: NaiveDate,
        limit: usize,
    ) -> Result<Vec<JobApplication>, ApplicationServiceError> {
        let query = ApplicationQuery {
            follow_up_date: DateRange {
                gte: Some(today),
                lte: None,
            },
            ordering: vec![OrderingTerm::asc(SortField::FollowUpDate)],
            ..ApplicationQuery::default()
        };
        let mut records = self.list(&query)?;
        records.truncate(limit);
        Ok(records)
    }

    /// Project records through the static admin list configuration.
    pub fn admin_table(
        &self,
        filters: &AdminFilters,
    ) -> Result<AdminTable, ApplicationServiceError> {
        let today = self.clock.now().date_naive();
        let records = self.repository.all()?;
        Ok(ADMIN_LIST_VIEW.table(records, filters, today))
    }
}

/// List output: a bare collection, or one page of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    All(Vec<JobApplication>),
    Page(Page<JobApplication>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<ImportFailure>,
}

/// A rejected import row; `row` is 1-based over the submitted records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub row: usize,
    pub errors: ValidationErrors,
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApplicationServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApplicationServiceError::Repository(RepositoryError::NotFound)
        )
    }
}
