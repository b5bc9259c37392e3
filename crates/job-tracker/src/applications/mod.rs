//! Job application records: schema, validation, listing, and HTTP surface.

pub mod admin;
pub mod domain;
pub mod exchange;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use admin::{AdminFilters, AdminListView, AdminTable, AppliedWindow, ADMIN_LIST_VIEW};
pub use domain::{ApplicationId, ApplicationStatus, JobApplication, Priority};
pub use exchange::{ExchangeError, ExchangeFormat};
pub use pagination::{InvalidPage, Page, PageRequest};
pub use query::{ApplicationQuery, DateRange, ListParams, OrderingTerm, SortField};
pub use repository::{ApplicationRepository, InMemoryApplicationRepository, RepositoryError};
pub use router::{application_router, APPLICATIONS_PATH};
pub use service::{
    ApplicationServiceError, Clock, ImportReport, JobApplicationService, Listing, SystemClock,
};
pub use validation::{ApplicationPayload, ValidationErrors, WriteMode};
