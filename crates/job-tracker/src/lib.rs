//! Job application tracking: a single `JobApplication` record exposed through
//! a searchable, filterable CRUD API and a static admin list view.

pub mod applications;
pub mod config;
pub mod error;
pub mod telemetry;
