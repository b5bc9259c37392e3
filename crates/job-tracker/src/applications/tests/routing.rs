use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::applications::repository::ApplicationRepository;
use crate::applications::application_router;
use crate::applications::service::JobApplicationService;
use crate::applications::validation::{INVALID_URL, NULL, REQUIRED};
use crate::config::ListingConfig;

#[tokio::test]
async fn create_route_returns_created_record() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/applications",
            json!({ "company": "Acme Corp", "role": "Engineer", "tags": "rust, remote" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "Saved");
    assert_eq!(payload["priority"], "Medium");
    assert_eq!(payload["applied_date"], serde_json::Value::Null);
    assert_eq!(payload["tags"], "rust, remote");
    assert_eq!(payload["created_at"], "2025-08-15T12:00:00Z");
    let id = payload["id"].as_str().expect("id string");
    assert_eq!(id.len(), 36);
    assert_eq!(id, id.to_lowercase());
}

#[tokio::test]
async fn create_route_reports_field_errors() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/applications",
            json!({ "role": "Engineer", "status": "Hired" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["company"], json!([REQUIRED]));
    assert_eq!(payload["status"], json!(["\"Hired\" is not a valid choice."]));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let request = Request::builder()
        .method("POST")
        .uri("/api/applications")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"company\": "))
        .expect("request builds");
    let response = router.oneshot(request).await.expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["non_field_errors"].is_array());
}

#[tokio::test]
async fn retrieve_handler_returns_found_records() {
    let (service, _, _) = build_service();
    let record = seed(&service, json!({ "company": "Acme Corp", "role": "Engineer" }));
    let service = Arc::new(service);

    let response = crate::applications::router::retrieve_handler(
        State(service.clone()),
        Path(record.id.to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["id"], record.id.to_string());
    assert_eq!(payload["company"], "Acme Corp");
}

#[tokio::test]
async fn unknown_or_malformed_ids_are_not_found() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    for uri in [
        "/api/applications/6f1c1b9e-8a53-4d52-9d43-0f7f4f0b1a2c",
        "/api/applications/not-a-uuid",
    ] {
        let response = router
            .clone()
            .oneshot(empty_request("GET", uri))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let payload = read_json_body(response).await;
        assert_eq!(payload, json!({ "detail": "Not found." }));
    }
}

#[tokio::test]
async fn put_patch_and_delete_round_through_the_router() {
    let (service, _, _) = build_service();
    let record = seed(&service, json!({ "company": "Acme Corp", "role": "Engineer" }));
    let router = router_with_service(service);
    let uri = format!("/api/applications/{}", record.id);

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            json!({ "status": "Interview", "follow_up_date": "2025-08-20" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let patched = read_json_body(response).await;
    assert_eq!(patched["status"], "Interview");
    assert_eq!(patched["follow_up_date"], "2025-08-20");

    let response = router
        .clone()
        .oneshot(json_request("PUT", &uri, json!({ "role": "Lead" })))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            &uri,
            json!({ "company": "Acme Corp", "role": "Lead", "follow_up_date": null }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let replaced = read_json_body(response).await;
    assert_eq!(replaced["role"], "Lead");
    assert_eq!(replaced["status"], "Interview");
    assert_eq!(replaced["follow_up_date"], serde_json::Value::Null);

    let response = router
        .clone()
        .oneshot(empty_request("DELETE", &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn null_on_non_nullable_fields_is_a_field_error() {
    let (service, _, _) = build_service();
    let record = seed(
        &service,
        json!({ "company": "Acme Corp", "role": "Engineer", "status": "Offer" }),
    );
    let router = router_with_service(service);
    let uri = format!("/api/applications/{}", record.id);

    let response = router
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            json!({ "company": null, "status": null, "location": null }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let errors = read_json_body(response).await;
    assert_eq!(errors["company"], json!([NULL]));
    assert_eq!(errors["status"], json!([NULL]));
    assert_eq!(errors["location"], json!([NULL]));

    let response = router
        .clone()
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("route executes");
    let unchanged = read_json_body(response).await;
    assert_eq!(unchanged["company"], "Acme Corp");
    assert_eq!(unchanged["status"], "Offer");

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/applications",
            json!({ "company": "Initech", "role": "Analyst", "status": null, "priority": null }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let errors = read_json_body(response).await;
    assert_eq!(errors["status"], json!([NULL]));
    assert_eq!(errors["priority"], json!([NULL]));
}

#[tokio::test]
async fn job_url_must_be_written_out_in_full() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/applications",
            json!({ "company": "Acme Corp", "role": "Engineer", "job_url": "http:example.com" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let errors = read_json_body(response).await;
    assert_eq!(errors["job_url"], json!([INVALID_URL]));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/applications",
            json!({
                "company": "Acme Corp",
                "role": "Engineer",
                "job_url": "ftp://files.example.com/posting.pdf",
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["job_url"], "ftp://files.example.com/posting.pdf");
}

#[tokio::test]
async fn writes_run_off_the_request_thread() {
    let repository = Arc::new(WriterThreads::default());
    let service = JobApplicationService::new(repository.clone(), ListingConfig::default());
    let router = application_router(Arc::new(service));
    let request_thread = std::thread::current().id();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/applications",
            json!({ "company": "Acme Corp", "role": "Engineer" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    let uri = format!("/api/applications/{}", created["id"].as_str().expect("id"));

    let response = router
        .clone()
        .oneshot(json_request("PATCH", &uri, json!({ "status": "Applied" })))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(empty_request("DELETE", &uri))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let writers = repository.writers();
    assert_eq!(writers.len(), 3);
    assert!(writers.iter().all(|writer| *writer != request_thread));
}

#[tokio::test]
async fn list_route_combines_filters_search_and_ordering() {
    let (service, _, _) = build_service();
    seed(&service, json!({ "company": "Acme Corp", "role": "Engineer", "status": "Applied", "applied_date": "2025-08-01" }));
    seed(&service, json!({ "company": "Acme Labs", "role": "Analyst", "status": "Applied", "applied_date": "2025-08-10" }));
    seed(&service, json!({ "company": "Acme Retail", "role": "Engineer", "status": "Saved" }));
    seed(&service, json!({ "company": "Other", "role": "Engineer", "status": "Applied" }));
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(empty_request(
            "GET",
            "/api/applications?search=acme&status=Applied",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(companies(&payload), ["Acme Labs", "Acme Corp"]);

    let response = router
        .oneshot(empty_request(
            "GET",
            "/api/applications?ordering=company,bogus&applied_date__gte=2025-08-01",
        ))
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;
    assert_eq!(companies(&payload), ["Acme Corp", "Acme Labs"]);
}

#[tokio::test]
async fn list_route_rejects_unknown_status() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/api/applications?status=Hired"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["status"].is_array());
}

#[tokio::test]
async fn paginated_list_links_preserve_filters() {
    let (service, _, _) = build_service();
    for company in ["Acme A", "Acme B", "Acme C"] {
        seed(&service, json!({ "company": company, "role": "Engineer" }));
    }
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(empty_request(
            "GET",
            "/api/applications?search=acme&ordering=company&page_size=2",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["count"], 3);
    assert_eq!(payload["previous"], serde_json::Value::Null);
    assert_eq!(
        payload["next"],
        "/api/applications?search=acme&ordering=company&page_size=2&page=2"
    );
    assert_eq!(companies(&payload["results"]), ["Acme A", "Acme B"]);

    let response = router
        .oneshot(empty_request("GET", "/api/applications?page=9"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload, json!({ "detail": "Invalid page." }));
}

#[tokio::test]
async fn export_route_serves_filtered_csv() {
    let (service, _, _) = build_service();
    seed(&service, json!({ "company": "Acme Corp", "role": "Engineer", "status": "Offer" }));
    seed(&service, json!({ "company": "Globex", "role": "Engineer" }));
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request(
            "GET",
            "/api/applications/export?format=csv&status=Offer",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"applications.csv\""
    );
    let text = String::from_utf8(read_body(response).await).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("\"Acme Corp\",\"Engineer\""));
}

#[tokio::test]
async fn export_route_rejects_unknown_format() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/api/applications/export?format=xml"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["format"].is_array());
}

#[tokio::test]
async fn import_route_accepts_csv_and_reports_rows() {
    let (service, repository, _) = build_service();
    let router = router_with_service(service);

    let body = "company,role,status,applied_date\n\
                Acme Corp,Engineer,Applied,2025-08-04\n\
                ,Analyst,,\n\
                Globex,Analyst,,\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/applications/import")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(body))
        .expect("request builds");
    let response = router.oneshot(request).await.expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["created"], 2);
    assert_eq!(payload["failed"], 1);
    assert_eq!(payload["errors"][0]["row"], 2);
    assert!(payload["errors"][0]["errors"]["company"].is_array());

    let stored = repository.all().expect("readable");
    assert!(stored
        .iter()
        .any(|record| record.company == "Globex" && record.status.label() == "Saved"));
}

#[tokio::test]
async fn import_route_rejects_unsupported_media_type() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let request = Request::builder()
        .method("POST")
        .uri("/api/applications/import")
        .header(header::CONTENT_TYPE, "application/xml")
        .body(Body::from("<applications/>"))
        .expect("request builds");
    let response = router.oneshot(request).await.expect("route executes");

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn admin_route_renders_configured_columns() {
    let (service, _, _) = build_service();
    seed(&service, json!({ "company": "Acme Corp", "role": "Engineer", "applied_date": "2025-08-10" }));
    seed(&service, json!({ "company": "Globex", "role": "Analyst", "stage": "Acme referral" }));
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/admin/applications?search=acme"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["columns"],
        json!(["company", "role", "status", "priority", "applied_date", "updated_at"])
    );
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["rows"][0][0], "Acme Corp");

    let response = router
        .oneshot(empty_request("GET", "/api/admin/applications?applied=fortnight"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repository_failure_is_an_internal_error() {
    let service = Arc::new(JobApplicationService::new(
        Arc::new(UnavailableRepository),
        ListingConfig::default(),
    ));

    let response = crate::applications::router::list_handler(
        State(service),
        Ok(axum::extract::Query(Default::default())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("disk full"));
}
