//! HTTP routes over a shared [`BookAuthorStore`].
//!
//! ```text
//! PUT|POST /{kind}/{label}/{year}       merge body relations, return current list
//! GET      /{kind}/{label}/{year}       current relation list
//! DELETE   /{kind}/{label}/{year}       delete, return the list it had
//! GET      /query/author_by_books       authors ranked by book count
//! GET      /query/book_by_authors       books ranked by author count
//! GET      /query/{author,book}/order_by_prolific   aliases of the two rankings
//! ```
//!
//! `kind` is `author` or `book`. Bodies are JSON arrays of opposite-kind
//! records. 201 on creation, 404 whenever the returned list is empty
//! (rankings included). Unknown routes and unsupported methods are 404 `[]`.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use libris_core::{AuthorRecord, BookAuthorStore, BookRecord, Ranked, UpsertOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Author,
    Book,
}

impl FromStr for EntityKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "author" => Ok(EntityKind::Author),
            "book" => Ok(EntityKind::Book),
            _ => Err(ApiError::NotFound),
        }
    }
}

/// Relation list of either kind, serialized as a bare JSON array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Relations {
    Books(Vec<BookRecord>),
    Authors(Vec<AuthorRecord>),
}

impl Relations {
    fn is_empty(&self) -> bool {
        match self {
            Relations::Books(books) => books.is_empty(),
            Relations::Authors(authors) => authors.is_empty(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<BookAuthorStore>,
}

/// Build the router. Request bodies above `max_body_bytes` get a 413.
pub fn router(store: Arc<BookAuthorStore>, max_body_bytes: usize) -> Router {
    let entity = get(read_entity)
        .put(upsert_entity)
        .post(upsert_entity)
        .delete(delete_entity);

    Router::new()
        .route("/query/author_by_books", get(author_ranking))
        .route("/query/author/order_by_prolific", get(author_ranking))
        .route("/query/book_by_authors", get(book_ranking))
        .route("/query/book/order_by_prolific", get(book_ranking))
        .route("/{kind}/{label}/{year}", entity.clone())
        .route("/{kind}/{label}/{year}/", entity)
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(AppState { store })
}

fn parse_year(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidRequest(format!("Year must be an integer, got {raw:?}")))
}

/// Decode a JSON array of records. An empty body is an empty array.
fn parse_records<R: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<Vec<R>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    if !mime.eq_ignore_ascii_case("application/json") {
        return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed relation list: {e}")))
}

/// 404 for an empty list, `status` otherwise.
fn relations_response(status: StatusCode, relations: Relations) -> Response {
    let status = if relations.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        status
    };
    (status, Json(relations)).into_response()
}

fn read_relations(store: &BookAuthorStore, kind: EntityKind, label: &str, year: i64) -> Result<Relations> {
    Ok(match kind {
        EntityKind::Author => Relations::Books(store.author_read(label, year)?),
        EntityKind::Book => Relations::Authors(store.book_read(label, year)?),
    })
}

async fn read_entity(
    State(state): State<AppState>,
    Path((kind, label, year)): Path<(String, String, String)>,
) -> Result<Response> {
    let kind: EntityKind = kind.parse()?;
    let year = parse_year(&year)?;
    log::trace!("GET {kind:?} {label}/{year}");

    let relations = read_relations(&state.store, kind, &label, year)?;
    Ok(relations_response(StatusCode::OK, relations))
}

async fn upsert_entity(
    State(state): State<AppState>,
    method: Method,
    Path((kind, label, year)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let kind: EntityKind = kind.parse()?;
    let year = parse_year(&year)?;
    let body = body?;
    log::debug!("{method} {kind:?} {label}/{year} ({} byte body)", body.len());

    // Merge and read back under one lock so a concurrent delete cannot empty the reply.
    let store = &state.store;
    let (outcome, relations): (UpsertOutcome, Relations) = match kind {
        EntityKind::Author => {
            let books = parse_records::<BookRecord>(&headers, &body)?;
            let (outcome, books) = store.author_merge(&label, year, &books)?;
            (outcome, Relations::Books(books))
        }
        EntityKind::Book => {
            let authors = parse_records::<AuthorRecord>(&headers, &body)?;
            let (outcome, authors) = store.book_merge(&label, year, &authors)?;
            (outcome, Relations::Authors(authors))
        }
    };

    if outcome.created {
        return Ok((StatusCode::CREATED, Json(relations)).into_response());
    }
    Ok(relations_response(StatusCode::OK, relations))
}

async fn delete_entity(
    State(state): State<AppState>,
    Path((kind, label, year)): Path<(String, String, String)>,
) -> Result<Response> {
    let kind: EntityKind = kind.parse()?;
    let year = parse_year(&year)?;
    log::debug!("DELETE {kind:?} {label}/{year}");

    // Read and delete under one lock so the returned list is exactly what was removed.
    let relations = match kind {
        EntityKind::Author => Relations::Books(state.store.author_remove(&label, year)?.unwrap_or_default()),
        EntityKind::Book => Relations::Authors(state.store.book_remove(&label, year)?.unwrap_or_default()),
    };
    Ok(relations_response(StatusCode::OK, relations))
}

async fn author_ranking(State(state): State<AppState>) -> Result<Response> {
    log::trace!("Ranking authors by book count");
    Ok(ranked_list(state.store.author_by_books()?))
}

async fn book_ranking(State(state): State<AppState>) -> Result<Response> {
    log::trace!("Ranking books by author count");
    Ok(ranked_list(state.store.book_by_authors()?))
}

fn ranked_list<R: Serialize>(ranked: Vec<Ranked<R>>) -> Response {
    let status = if ranked.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(ranked)).into_response()
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
