use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::Router;
use axum::http::{self, Request, StatusCode};
use fetchd_core::app::{DispatchMode, FetchService};
use fetchd_core::domain::{Request as StoredRequest, Response};
use fetchd_core::impls::{InMemoryRequestStore, MockFetchClient};
use fetchd_server::app;
use fetchd_server::routes::{ErrorBody, Health};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tracing::Span;

fn service(mode: DispatchMode) -> Arc<FetchService> {
    Arc::new(FetchService::new(
        mode,
        Arc::new(InMemoryRequestStore::new()),
        Arc::new(MockFetchClient::new()),
        Span::none(),
    ))
}

fn sync_app() -> (Router, Arc<FetchService>) {
    let svc = service(DispatchMode::Sync);
    (app(Arc::clone(&svc)), svc)
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

async fn submit(router: &Router, url: &str) -> Response {
    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/requests/request",
            &format!(r#"{{"method":"GET","url":"{url}"}}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

// --- submit ---

#[tokio::test]
async fn sync_submit_returns_response() {
    let (router, _) = sync_app();
    let response = submit(&router, "http://example.com").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.length, 0);
}

#[tokio::test]
async fn wrong_method_returns_400() {
    let (router, svc) = sync_app();
    let resp = router
        .oneshot(json_request(
            "POST",
            "/v1/requests/request",
            r#"{"method":"PUT","url":"http://example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = body_json(resp).await;
    assert!(body.error.contains("PUT"));
    assert!(svc.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn relative_url_returns_400() {
    let (router, _) = sync_app();
    let resp = router
        .oneshot(json_request(
            "POST",
            "/v1/requests/request",
            r#"{"method":"GET","url":"/nowhere"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_returns_400_with_error_body() {
    let (router, _) = sync_app();
    let resp = router
        .oneshot(json_request("POST", "/v1/requests/request", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = body_json(resp).await;
    assert!(!body.error.is_empty());
}

#[tokio::test]
async fn async_submit_returns_202_and_is_answered_after_shutdown() {
    let svc = service(DispatchMode::Async {
        pool_size: NonZeroUsize::new(2).unwrap(),
    });
    let router = app(Arc::clone(&svc));

    for _ in 0..3 {
        let resp = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/v1/requests/request",
                r#"{"method":"GET","url":"http://example.com"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }
    svc.shutdown().await.unwrap();

    let resp = router.clone().oneshot(get("/v1/requests/list")).await.unwrap();
    let all: Vec<StoredRequest> = body_json(resp).await;
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|r| r.response.as_ref().map(|r| r.status) == Some(200)));

    // closed dispatcher
    let resp = router
        .oneshot(json_request(
            "POST",
            "/v1/requests/request",
            r#"{"method":"GET","url":"http://example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// --- list ---

#[tokio::test]
async fn list_is_empty_at_start() {
    let (router, _) = sync_app();
    let resp = router.oneshot(get("/v1/requests/list")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let all: Vec<StoredRequest> = body_json(resp).await;
    assert!(all.is_empty());
}

#[tokio::test]
async fn list_pages_in_insertion_order() {
    let (router, _) = sync_app();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(submit(&router, &format!("http://example.com/{i}")).await.id);
    }

    let resp = router
        .clone()
        .oneshot(get("/v1/requests/list?page=1&requestsPerPage=2"))
        .await
        .unwrap();
    let page: Vec<StoredRequest> = body_json(resp).await;
    assert_eq!(page.iter().map(|r| r.id).collect::<Vec<_>>(), ids[2..4]);

    let resp = router.oneshot(get("/v1/requests/list")).await.unwrap();
    let all: Vec<StoredRequest> = body_json(resp).await;
    assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
}

#[tokio::test]
async fn non_numeric_page_returns_400() {
    let (router, _) = sync_app();
    let resp = router
        .oneshot(get("/v1/requests/list?page=two"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- get ---

#[tokio::test]
async fn get_returns_stored_request() {
    let (router, _) = sync_app();
    let response = submit(&router, "http://example.com/a").await;

    let resp = router
        .oneshot(get(&format!("/v1/requests/{}", response.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let stored: StoredRequest = body_json(resp).await;
    assert_eq!(stored.fetch.url.as_str(), "http://example.com/a");
    assert_eq!(stored.response, Some(response));
}

#[tokio::test]
async fn get_unknown_id_returns_404() {
    let (router, _) = sync_app();
    let resp = router
        .oneshot(get("/v1/requests/01ARZ3NDEKTSV4RRFFQ69G5FAV"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_malformed_id_returns_400() {
    let (router, _) = sync_app();
    let resp = router.oneshot(get("/v1/requests/not-an-id")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- delete ---

#[tokio::test]
async fn delete_then_delete_again() {
    let (router, _) = sync_app();
    let response = submit(&router, "http://example.com").await;
    let body = format!(r#"{{"id":"{}"}}"#, response.id);

    let resp = router
        .clone()
        .oneshot(json_request("DELETE", "/v1/requests/request", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(json_request("DELETE", "/v1/requests/request", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- health ---

#[tokio::test]
async fn health_reports_mode() {
    let (router, _) = sync_app();
    let resp = router.oneshot(get("/v1/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: Health = body_json(resp).await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.dispatch, "sync");
    assert!(health.dispatcher.is_none());
}
