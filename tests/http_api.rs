//! End-to-end tests of the HTTP surface, driven through the assembled router.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shelf_kernel::Settings;
use tower::ServiceExt;

fn app() -> Router {
    let settings = Settings::default();
    let registry = shelf_app::assemble(&settings);
    shelf_http::build_router(&registry, &settings)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn add(app: &Router, title: &str, count: u32) -> String {
    let (status, book) = call(
        app,
        Method::POST,
        "/books",
        Some(json!({"title": title, "author": "Frank Herbert", "availableCount": count})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    book["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn add_and_fetch_a_book() {
    let app = app();
    let id = add(&app, "Dune", 2).await;

    let (status, book) = call(&app, Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        book,
        json!({"id": id, "title": "Dune", "author": "Frank Herbert", "availableCount": 2})
    );

    let (status, books) = call(&app, Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn adding_same_title_increments_copies() {
    let app = app();
    let id = add(&app, "Dune", 2).await;

    let (status, book) = call(
        &app,
        Method::POST,
        "/books",
        Some(json!({"title": "Dune", "availableCount": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["id"], id.as_str());
    assert_eq!(book["availableCount"], 5);

    let (_, books) = call(&app, Method::GET, "/books", None).await;
    assert_eq!(books.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/books")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn invalid_identity_is_bad_request_on_every_route() {
    let app = app();
    let cases = [
        (Method::GET, "/books/not-an-id", None),
        (Method::PUT, "/books/not-an-id", Some(json!({"title": "X"}))),
        (Method::DELETE, "/books/not-an-id", None),
        (Method::POST, "/books/rent/not-an-id", None),
        (Method::POST, "/books/return/not-an-id", None),
    ];

    for (method, uri, body) in cases {
        let (status, error) = call(&app, method.clone(), uri, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(error["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn unknown_book_is_not_found() {
    let app = app();
    let missing = "0190a2b4-7c3e-7000-8000-000000000000";

    let (status, _) = call(&app, Method::GET, &format!("/books/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::DELETE, &format!("/books/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/books/{missing}"),
        Some(json!({"title": "X"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_merges_patch() {
    let app = app();
    let id = add(&app, "Dune", 2).await;

    let (status, book) = call(
        &app,
        Method::PUT,
        &format!("/books/{id}"),
        Some(json!({"author": "F. Herbert"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["title"], "Dune");
    assert_eq!(book["author"], "F. Herbert");
    assert_eq!(book["availableCount"], 2);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/books/{id}"),
        Some(json!({"availableCount": -3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rent_return_and_list_rentals() {
    let app = app();
    let id = add(&app, "Dune", 2).await;

    let (status, book) = call(&app, Method::POST, &format!("/books/rent/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["availableCount"], 1);

    let (status, rentals) = call(&app, Method::GET, "/rentals", None).await;
    assert_eq!(status, StatusCode::OK);
    let rentals = rentals.as_array().unwrap();
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0]["bookID"], id.as_str());

    let (status, book) = call(&app, Method::POST, &format!("/books/return/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["availableCount"], 2);

    let (_, rentals) = call(&app, Method::GET, "/rentals", None).await;
    assert!(rentals.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_and_unrented_books_are_conflicts() {
    let app = app();
    let id = add(&app, "Dune", 1).await;

    let (status, error) = call(&app, Method::POST, &format!("/books/return/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "failed_precondition");

    call(&app, Method::POST, &format!("/books/rent/{id}"), None).await;
    let (status, error) = call(&app, Method::POST, &format!("/books/rent/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "conflict");
    assert_eq!(error["error"]["details"][0]["book_id"], id.as_str());
}

#[tokio::test]
async fn delete_confirms_and_cascades_one_rental() {
    let app = app();
    let id = add(&app, "Dune", 2).await;
    call(&app, Method::POST, &format!("/books/rent/{id}"), None).await;

    let (status, body) = call(&app, Method::DELETE, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Book deleted successfully"}));

    let (status, _) = call(&app, Method::GET, &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, rentals) = call(&app, Method::GET, "/rentals", None).await;
    assert!(rentals.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = app();
    for uri in ["/healthz", "/books/health"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn routes_follow_the_configured_prefix() {
    let mut settings = Settings::default();
    settings.server.api_prefix = "/api".to_string();
    let registry = shelf_app::assemble(&settings);
    let app = shelf_http::build_router(&registry, &settings);

    let (status, _) = call(&app, Method::GET, "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/api/rentals", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn swagger_document_lists_every_ledger_route() {
    let app = app();

    let (status, spec) = call(&app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    for path in [
        "/books",
        "/books/{id}",
        "/books/rent/{id}",
        "/books/return/{id}",
        "/rentals",
    ] {
        assert!(spec["paths"][path].is_object(), "missing {path}");
    }
    assert!(spec["components"]["schemas"]["BookPatch"].is_object());
    assert!(spec["components"]["schemas"]["Rental"].is_object());
}
