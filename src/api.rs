//! JSON bodies exchanged between the HTTP server and [`crate::client`].
//!
//! Success bodies carry `"status": "ok"`. Error bodies always have the shape
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: 42" } }
//! ```

use serde::{Deserialize, Serialize};

use docport_core::models::Document;

pub const STATUS_OK: &str = "ok";

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBody {
    pub status: String,
    pub data: Vec<Document>,
    pub current_page: u32,
    pub total_pages: u32,
    /// Records matching the listing across all pages.
    pub total_items: u64,
}

/// An unpaginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesBody {
    pub status: String,
    pub data: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBody {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountBody {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (`bad_request`, `not_found`, `internal`).
    pub code: String,
    pub message: String,
}
