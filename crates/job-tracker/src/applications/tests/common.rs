use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::applications::domain::{ApplicationId, JobApplication};
use crate::applications::repository::{
    ApplicationRepository, InMemoryApplicationRepository, RepositoryError,
};
use crate::applications::service::{Clock, JobApplicationService};
use crate::applications::validation::ApplicationPayload;
use crate::applications::application_router;
use crate::config::ListingConfig;

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Clock that advances one second on every reading.
pub(super) struct StepClock {
    current: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub(super) fn starting_at(instant: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(instant),
        }
    }

    pub(super) fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().expect("clock mutex poisoned") = instant;
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut guard = self.current.lock().expect("clock mutex poisoned");
        let now = *guard;
        *guard = now + Duration::seconds(1);
        now
    }
}

pub(super) type MemoryService = JobApplicationService<InMemoryApplicationRepository>;

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryApplicationRepository>,
    Arc<StepClock>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let clock = Arc::new(StepClock::starting_at(start()));
    let service = JobApplicationService::with_clock(
        repository.clone(),
        clock.clone(),
        ListingConfig::default(),
    );
    (service, repository, clock)
}

pub(super) fn payload(value: Value) -> ApplicationPayload {
    serde_json::from_value(value).expect("payload deserializes")
}

pub(super) fn seed(service: &MemoryService, value: Value) -> JobApplication {
    service.create(payload(value)).expect("seed record is valid")
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: JobApplication) -> Result<JobApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn update(&self, _record: JobApplication) -> Result<JobApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn remove(&self, _id: &ApplicationId) -> Result<JobApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn all(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }
}

/// In-memory store that remembers which threads performed writes.
#[derive(Default)]
pub(super) struct WriterThreads {
    inner: InMemoryApplicationRepository,
    writers: Mutex<Vec<ThreadId>>,
}

impl WriterThreads {
    pub(super) fn writers(&self) -> Vec<ThreadId> {
        self.writers.lock().expect("writers lock").clone()
    }

    fn note_writer(&self) {
        self.writers
            .lock()
            .expect("writers lock")
            .push(thread::current().id());
    }
}

impl ApplicationRepository for WriterThreads {
    fn insert(&self, record: JobApplication) -> Result<JobApplication, RepositoryError> {
        self.note_writer();
        self.inner.insert(record)
    }

    fn update(&self, record: JobApplication) -> Result<JobApplication, RepositoryError> {
        self.note_writer();
        self.inner.update(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn remove(&self, id: &ApplicationId) -> Result<JobApplication, RepositoryError> {
        self.note_writer();
        self.inner.remove(id)
    }

    fn all(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        self.inner.all()
    }
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    application_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializes")))
        .expect("request builds")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn companies(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .expect("array payload")
        .iter()
        .map(|record| record["company"].as_str().expect("company").to_string())
        .collect()
}
