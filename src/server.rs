//! HTTP server for the document portal.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`   | `/upload-files` | Create a document (multipart: `file` + fields) |
//! | `PUT`    | `/update-file/{id}` | Update a document, recording the previous version |
//! | `GET`    | `/get-file/{id}` | One document with its version history |
//! | `GET`    | `/get-files?username=` | Every document of one owner |
//! | `GET`    | `/get-assets-files?username=&page=&limit=` | One owner's documents, paginated |
//! | `GET`    | `/all-files?page=&limit=` | All documents by business date, paginated |
//! | `DELETE` | `/delete-file/{id}` | Delete a document and its history |
//! | `GET`    | `/user-documents?username=` | Document count of one owner |
//! | `GET`    | `/total-documents` | Document count |
//! | `GET`    | `/total-users` | Account count |
//! | `GET`    | `/new-users` | Accounts created inside the metrics window |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! Omitted pagination parameters default to `page=1` and the configured
//! page size (10 for the owner listing, 7 for the global listing). Oversized
//! limits are clamped to `pagination.max_page_size`; non-numeric or
//! non-positive values are rejected with 400.
//!
//! # Error Contract
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Internal errors are logged in full and reported without detail.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use docport_core::error::DocError;
use docport_core::models::{parse_effective_date, DocumentFields, NewDocument, UpdateDocument};
use docport_core::query::{ListQuery, PageRequest, DEFAULT_PAGE};
use docport_core::store::DocumentStore;

use crate::accounts;
use crate::api::{
    CountBody, DocumentBody, ErrorBody, ErrorDetail, FilesBody, HealthBody, MessageBody, PageBody,
    STATUS_OK,
};
use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::uploads::FileStorage;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    /// Pool holding the `users` table, read for the account counters.
    accounts: SqlitePool,
    files: FileStorage,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        let accounts = store.pool().clone();
        Self {
            files: FileStorage::new(config.storage.files_dir.clone()),
            config: Arc::new(config),
            store: Arc::new(store),
            accounts,
        }
    }
}

/// Builds the router with every endpoint, CORS and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/upload-files", post(handle_upload))
        .route("/update-file/{id}", put(handle_update))
        .route("/get-file/{id}", get(handle_get_file))
        .route("/get-files", get(handle_get_files))
        .route("/get-assets-files", get(handle_owner_page))
        .route("/all-files", get(handle_all_files))
        .route("/delete-file/{id}", delete(handle_delete))
        .route("/user-documents", get(handle_user_documents))
        .route("/total-documents", get(handle_total_documents))
        .route("/total-users", get(handle_total_users))
        .route("/new-users", get(handle_new_users))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Opens the store, binds `[server].bind` and serves until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let state = AppState::new(config.clone(), store);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(addr = %listener.local_addr()?, "docport server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<DocError> for AppError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::NotFound(id) => not_found(format!("File not found: {}", id)),
            DocError::Validation(message) => bad_request(message),
            DocError::Store(inner) => {
                error!(error = %format!("{:#}", inner), "store failure");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: "internal server error".to_string(),
                }
            }
        }
    }
}

// ============ Request parsing ============

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    username: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

impl ListParams {
    fn username(&self) -> Result<String, AppError> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .ok_or_else(|| bad_request("Username parameter is required"))
    }

    fn page_request(&self, default_limit: u32, max_limit: u32) -> Result<PageRequest, AppError> {
        let page = parse_int("page", self.page.as_deref(), DEFAULT_PAGE)?;
        let limit = parse_int("limit", self.limit.as_deref(), default_limit)?;
        Ok(PageRequest::new(page, limit)?.clamped(max_limit))
    }
}

fn parse_int(name: &str, raw: Option<&str>, default: u32) -> Result<i64, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(i64::from(default)),
        Some(s) => s
            .parse::<i64>()
            .map_err(|_| bad_request(format!("{} must be an integer, got '{}'", name, s))),
    }
}

struct UploadedFile {
    name: String,
    bytes: Bytes,
}

/// Multipart form of an upload or update request.
#[derive(Default)]
struct UploadForm {
    text: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(format!("Failed to read multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file: {}", e)))?;
                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile {
                    name: file_name,
                    bytes,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read {}: {}", name, e)))?;
                form.text.insert(name, text);
            }
        }
        Ok(form)
    }

    fn optional(&self, name: &str) -> String {
        self.text
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn required(&self, name: &str) -> Result<String, AppError> {
        let value = self.optional(name);
        if value.is_empty() {
            return Err(bad_request(format!("{} is required", name)));
        }
        Ok(value)
    }

    fn fields(&self) -> Result<DocumentFields, AppError> {
        let title = self.required("title")?;
        let date = self.required("date")?;
        Ok(DocumentFields {
            title,
            application: self.optional("application"),
            description: self.optional("description"),
            effective_date: parse_effective_date(&date)?,
        })
    }
}

// ============ Document handlers ============

async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentBody>), AppError> {
    let form = UploadForm::read(multipart).await?;
    let owner = form.required("username")?;
    let fields = form.fields()?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| bad_request("file is required"))?;

    let content_ref = state.files.save(&file.name, &file.bytes).await?;
    let input = NewDocument {
        owner_username: owner,
        fields,
        content_ref: content_ref.clone(),
    };

    match state.store.create(input).await {
        Ok(doc) => {
            info!(id = %doc.id, owner = %doc.owner_username, "file uploaded");
            Ok((
                StatusCode::CREATED,
                Json(DocumentBody {
                    status: STATUS_OK.to_string(),
                    message: Some("File and details saved successfully".to_string()),
                    data: doc,
                }),
            ))
        }
        Err(e) => {
            state.files.discard(&content_ref).await;
            Err(e.into())
        }
    }
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<DocumentBody>, AppError> {
    let form = UploadForm::read(multipart).await?;
    let fields = form.fields()?;

    let content_ref = match &form.file {
        Some(file) => Some(state.files.save(&file.name, &file.bytes).await?),
        None => None,
    };
    let update = UpdateDocument {
        fields,
        content_ref: content_ref.clone(),
    };

    match state.store.update(&id, update).await {
        Ok(doc) => {
            info!(id = %doc.id, versions = doc.history.len(), "file updated");
            Ok(Json(DocumentBody {
                status: STATUS_OK.to_string(),
                message: Some("File and details updated successfully".to_string()),
                data: doc,
            }))
        }
        Err(e) => {
            if let Some(fresh) = &content_ref {
                state.files.discard(fresh).await;
            }
            Err(e.into())
        }
    }
}

async fn handle_get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentBody>, AppError> {
    let doc = state.store.get(&id).await?;
    Ok(Json(DocumentBody {
        status: STATUS_OK.to_string(),
        message: None,
        data: doc,
    }))
}

async fn handle_get_files(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<FilesBody>, AppError> {
    let owner = params.username()?;
    let page = state
        .store
        .list(&ListQuery::owner(owner, PageRequest::everything()))
        .await?;
    Ok(Json(FilesBody {
        status: STATUS_OK.to_string(),
        data: page.items,
    }))
}

async fn handle_owner_page(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageBody>, AppError> {
    let owner = params.username()?;
    let pagination = &state.config.pagination;
    let request = params.page_request(pagination.owner_page_size, pagination.max_page_size)?;
    let page = state.store.list(&ListQuery::owner(owner, request)).await?;
    Ok(Json(PageBody {
        status: STATUS_OK.to_string(),
        data: page.items,
        current_page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }))
}

async fn handle_all_files(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageBody>, AppError> {
    let pagination = &state.config.pagination;
    let request = params.page_request(pagination.global_page_size, pagination.max_page_size)?;
    let page = state.store.list(&ListQuery::global(request)).await?;
    Ok(Json(PageBody {
        status: STATUS_OK.to_string(),
        data: page.items,
        current_page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    state.store.delete(&id).await?;
    info!(id = %id, "file deleted");
    Ok(Json(MessageBody {
        status: STATUS_OK.to_string(),
        message: "File deleted successfully".to_string(),
    }))
}

// ============ Counters ============

fn count_body(count: u64) -> Json<CountBody> {
    Json(CountBody {
        status: STATUS_OK.to_string(),
        count,
    })
}

async fn handle_user_documents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CountBody>, AppError> {
    let owner = params.username()?;
    let count = state.store.count_by_owner(&owner).await?;
    if count == 0 {
        return Err(not_found("User not found or no documents available"));
    }
    Ok(count_body(count))
}

async fn handle_total_documents(
    State(state): State<AppState>,
) -> Result<Json<CountBody>, AppError> {
    Ok(count_body(state.store.count_all().await?))
}

async fn handle_total_users(State(state): State<AppState>) -> Result<Json<CountBody>, AppError> {
    Ok(count_body(accounts::count_users(&state.accounts).await?))
}

async fn handle_new_users(State(state): State<AppState>) -> Result<Json<CountBody>, AppError> {
    let since = accounts::window_start(state.config.metrics.new_users_window_days);
    Ok(count_body(
        accounts::count_users_since(&state.accounts, since).await?,
    ))
}

async fn handle_health() -> Json<HealthBody> {
    Json(HealthBody {
        status: STATUS_OK.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
