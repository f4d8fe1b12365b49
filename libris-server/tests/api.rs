//! HTTP API tests.
//!
//! Most tests drive the router in-process with `oneshot`; the last one
//! starts a real server and speaks raw HTTP/1.1 to it.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use libris_core::BookAuthorStore;
use libris_server::{CatalogServer, ServerConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tower::ServiceExt;

const TUFTE_URL: &str = "/author/Edward%20R.%20Tufte/1942";
const VDQI_URL: &str = "/book/The%20Visual%20Display%20of%20Quantitative%20Information/1983";
const ENVISIONING_URL: &str = "/book/Envisioning%20Information/1990";

fn app() -> Router {
    CatalogServer::new(ServerConfig::for_testing()).router()
}

fn vdqi() -> Value {
    json!([{"title": "The Visual Display of Quantitative Information", "pubdate": 1983}])
}

fn envisioning() -> Value {
    json!([{"title": "Envisioning Information", "pubdate": 1990}])
}

fn tufte() -> Value {
    json!([{"name": "Edward R. Tufte", "dob": 1942}])
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn put_json(app: &Router, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_root_is_not_found() {
    let app = app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_get_unknown_author() {
    let app = app();
    let (status, body) = get(&app, TUFTE_URL).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_put_creates_author() {
    let app = app();
    let (status, body) = put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, vdqi());

    let (status, body) = get(&app, TUFTE_URL).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, vdqi());
}

#[tokio::test]
async fn test_put_is_idempotent() {
    let app = app();
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    let (status, body) = put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, vdqi());
}

#[tokio::test]
async fn test_post_creates_author() {
    let app = app();
    let (status, body) = put_json(&app, "POST", TUFTE_URL, &vdqi()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, vdqi());
}

#[tokio::test]
async fn test_put_merges_second_book() {
    let app = app();
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    let (status, body) = put_json(&app, "PUT", TUFTE_URL, &envisioning()).await;
    assert_eq!(status, StatusCode::OK);
    // Lists are ordered by title, then year.
    assert_eq!(
        body,
        json!([
            {"title": "Envisioning Information", "pubdate": 1990},
            {"title": "The Visual Display of Quantitative Information", "pubdate": 1983},
        ])
    );
}

#[tokio::test]
async fn test_put_creates_back_links() {
    let app = app();
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    let (status, body) = get(&app, VDQI_URL).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, tufte());
}

#[tokio::test]
async fn test_trailing_slash_accepted() {
    let app = app();
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    let (status, body) = get(&app, &format!("{TUFTE_URL}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, vdqi());
}

#[tokio::test]
async fn test_delete_book_returns_its_authors() {
    let app = app();
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    put_json(&app, "PUT", TUFTE_URL, &envisioning()).await;

    let (status, body) = delete(&app, ENVISIONING_URL).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, tufte());

    let (_, body) = get(&app, TUFTE_URL).await;
    assert_eq!(body, vdqi());

    let (status, body) = get(&app, VDQI_URL).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, tufte());

    let (status, body) = get(&app, ENVISIONING_URL).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_delete_cascades_to_sole_author() {
    let app = app();
    put_json(&app, "PUT", "/author/Plato/-424", &json!([{"title": "The Republic", "pubdate": -360}]))
        .await;

    let (status, _) = delete(&app, "/book/The%20Republic/-360").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/author/Plato/-424").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_delete_unknown_is_not_found() {
    let app = app();
    let (status, body) = delete(&app, TUFTE_URL).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_book_put_with_authors() {
    let app = app();
    let authors = json!([
        {"name": "Andries van Dam", "dob": 1938},
        {"name": "James D. Foley", "dob": 1942},
    ]);
    let (status, body) = put_json(&app, "PUT", "/book/Computer%20Graphics/1995", &authors).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, authors);

    let (status, body) = get(&app, "/author/James%20D.%20Foley/1942").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"title": "Computer Graphics", "pubdate": 1995}]));
}

#[tokio::test]
async fn test_author_by_books() {
    let app = app();
    let (status, body) = get(&app, "/query/author_by_books").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));

    put_json(&app, "PUT", "/author/Plato/-424", &json!([{"title": "The Republic", "pubdate": -360}]))
        .await;
    let (status, body) = get(&app, "/query/author_by_books").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"name": "Plato", "dob": -424, "count": 1}]));

    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    put_json(&app, "PUT", TUFTE_URL, &envisioning()).await;
    let (_, body) = get(&app, "/query/author_by_books").await;
    assert_eq!(
        body,
        json!([
            {"name": "Edward R. Tufte", "dob": 1942, "count": 2},
            {"name": "Plato", "dob": -424, "count": 1},
        ])
    );

    let (status, alias) = get(&app, "/query/author/order_by_prolific").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(alias, body);
}

#[tokio::test]
async fn test_book_by_authors() {
    let app = app();
    put_json(
        &app,
        "PUT",
        "/book/Computer%20Graphics/1995",
        &json!([{"name": "Andries van Dam", "dob": 1938}, {"name": "James D. Foley", "dob": 1942}]),
    )
    .await;
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;

    let (status, body) = get(&app, "/query/book_by_authors").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {"title": "Computer Graphics", "pubdate": 1995, "count": 2},
            {"title": "The Visual Display of Quantitative Information", "pubdate": 1983, "count": 1},
        ])
    );

    let (_, alias) = get(&app, "/query/book/order_by_prolific").await;
    assert_eq!(alias, body);
}

#[tokio::test]
async fn test_unknown_query_and_kind() {
    let app = app();
    let (status, _) = get(&app, "/query/most_popular").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/publisher/Graphics%20Press/1982").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));

    let (status, _) = put_json(&app, "PUT", "/publisher/Graphics%20Press/1982", &vdqi()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_method_is_not_found() {
    let app = app();
    put_json(&app, "PUT", "/author/Edward%20R.%20Tufte/1942", &vdqi()).await;

    let (status, body) = put_json(&app, "PATCH", "/author/Edward%20R.%20Tufte/1942", &vdqi()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));

    let (status, body) = put_json(&app, "PUT", "/query/author_by_books", &tufte()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!([]));

    let (status, _) = get(&app, "/author/Edward%20R.%20Tufte/1942").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_non_integer_year_rejected() {
    let app = app();
    let (status, body) = get(&app, "/author/Plato/circa-424").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("integer"));
}

#[tokio::test]
async fn test_wrong_content_type_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri(TUFTE_URL)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(vdqi().to_string()))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());

    let (status, _) = get(&app, TUFTE_URL).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_relation_list_rejected() {
    let app = app();
    let (status, body) = put_json(&app, "PUT", TUFTE_URL, &json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));

    let request = Request::builder().method("PUT").uri(TUFTE_URL).body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, TUFTE_URL).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = app();
    let (status, _) = put_json(&app, "PUT", TUFTE_URL, &json!([{"name": "wrong kind", "dob": 1}])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = put_json(&app, "PUT", TUFTE_URL, &json!({"title": "not a list", "pubdate": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let config = ServerConfig {
        max_body_bytes: 32,
        ..ServerConfig::for_testing()
    };
    let app = CatalogServer::new(config).router();
    let (status, _) = put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_router_shares_caller_store() {
    let store = Arc::new(BookAuthorStore::new());
    let app = CatalogServer::with_store(ServerConfig::for_testing(), store.clone()).router();
    put_json(&app, "PUT", TUFTE_URL, &vdqi()).await;

    assert_eq!(store.author_count().unwrap(), 1);
    assert_eq!(store.book_count().unwrap(), 1);
    store.check_invariants().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_upsert_reply_survives_concurrent_delete() {
    let app = app();
    let book = json!([{"title": "Shared", "pubdate": 2000}]);

    let writers: Vec<_> = (0..64)
        .map(|i| {
            let app = app.clone();
            let book = book.clone();
            tokio::spawn(async move {
                put_json(&app, "PUT", &format!("/author/writer-{i}/1900"), &book).await
            })
        })
        .collect();
    let deleter = {
        let app = app.clone();
        tokio::spawn(async move {
            for _ in 0..64 {
                delete(&app, "/book/Shared/2000").await;
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        let (status, body) = writer.await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, book);
    }
    deleter.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_keep_store_consistent() {
    let store = Arc::new(BookAuthorStore::new());
    let app = CatalogServer::with_store(ServerConfig::for_testing(), store.clone()).router();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let author = format!("/author/author-{}/1900", i % 4);
                let books = json!([{"title": format!("book-{}", i % 6), "pubdate": 2000}]);
                put_json(&app, "PUT", &author, &books).await;
                if i % 3 == 0 {
                    delete(&app, &format!("/book/book-{}/2000", i % 6)).await;
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    store.check_invariants().unwrap();
}

/// Serve on an ephemeral port; returns the address and a shutdown trigger.
async fn start_test_server() -> (std::net::SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let server = CatalogServer::new(ServerConfig::for_testing());
    tokio::spawn(async move {
        server
            .serve(listener, async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (addr, tx)
}

async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_end_to_end_over_tcp() {
    let (addr, shutdown) = start_test_server().await;

    let body = vdqi().to_string();
    let put = format!(
        "PUT {TUFTE_URL} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let response = raw_request(addr, &put).await;
    assert!(response.starts_with("HTTP/1.1 201"), "unexpected response: {response}");
    assert!(
        response.contains(r#""title":"The Visual Display of Quantitative Information""#),
        "unexpected body: {response}"
    );

    let get = format!("GET {VDQI_URL} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    let response = raw_request(addr, &get).await;
    assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
    assert!(response.contains("Edward R. Tufte"));

    let _ = shutdown.send(());
}
