//! HTTP client for a running docport server.
//!
//! [`PortalClient`] wraps each endpoint; [`GlobalPages`] and [`OwnerPages`]
//! adapt the two paginated listings to the core [`PageSource`] trait so the
//! report and export commands can walk every page with
//! [`docport_core::aggregate::walk_pages`].
//!
//! Owner-scoped calls take an explicit [`Session`] instead of reading a
//! process-wide "current user".

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use docport_core::aggregate::PageSource;
use docport_core::error::{DocError, DocResult};
use docport_core::models::Document;
use docport_core::query::{Page, PageRequest};

use crate::api::{CountBody, DocumentBody, ErrorBody, MessageBody, PageBody};
use crate::config::ClientConfig;

/// The identity owner-scoped calls act for. Created at login, dropped at logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
}

impl Session {
    /// Credentials are checked by the account service; this only rejects
    /// an empty identity.
    pub fn login(username: impl Into<String>) -> DocResult<Self> {
        let username = username.into().trim().to_string();
        if username.is_empty() {
            return Err(DocError::validation("username is required"));
        }
        Ok(Self { username })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> DocResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(DocError::store)?;
        decode(response).await
    }

    /// One page of the global listing, ordered by business date.
    pub async fn list_all_files(&self, page: u32, limit: u32) -> DocResult<Page<Document>> {
        let body: PageBody = self
            .get_json(
                "/all-files",
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(into_page(body))
    }

    /// One page of the session owner's documents, newest first.
    pub async fn list_owner_files(
        &self,
        session: &Session,
        page: u32,
        limit: u32,
    ) -> DocResult<Page<Document>> {
        let body: PageBody = self
            .get_json(
                "/get-assets-files",
                &[
                    ("username", session.username.clone()),
                    ("page", page.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(into_page(body))
    }

    /// Number of documents the session owner has. An owner with none is
    /// reported by the server as not found and comes back as zero.
    pub async fn user_document_count(&self, session: &Session) -> DocResult<u64> {
        let result: DocResult<CountBody> = self
            .get_json("/user-documents", &[("username", session.username.clone())])
            .await;
        match result {
            Ok(body) => Ok(body.count),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    pub async fn total_documents(&self) -> DocResult<u64> {
        let body: CountBody = self.get_json("/total-documents", &[]).await?;
        Ok(body.count)
    }

    pub async fn total_users(&self) -> DocResult<u64> {
        let body: CountBody = self.get_json("/total-users", &[]).await?;
        Ok(body.count)
    }

    pub async fn new_users(&self) -> DocResult<u64> {
        let body: CountBody = self.get_json("/new-users", &[]).await?;
        Ok(body.count)
    }

    pub async fn get_file(&self, id: &str) -> DocResult<Document> {
        let body: DocumentBody = self.get_json(&format!("/get-file/{}", id), &[]).await?;
        Ok(body.data)
    }

    pub async fn delete_file(&self, id: &str) -> DocResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/delete-file/{}", id)))
            .send()
            .await
            .map_err(DocError::store)?;
        let _: MessageBody = decode(response).await?;
        Ok(())
    }
}

fn into_page(body: PageBody) -> Page<Document> {
    Page {
        items: body.data,
        page: body.current_page,
        total_pages: body.total_pages,
        total_items: body.total_items,
    }
}

/// Maps the server's status and error body back onto [`DocError`].
async fn decode<T: DeserializeOwned>(response: Response) -> DocResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(DocError::store);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);

    Err(match status {
        StatusCode::NOT_FOUND => DocError::NotFound(message),
        StatusCode::BAD_REQUEST => DocError::Validation(message),
        _ => DocError::Store(anyhow!("server returned {}: {}", status, message)),
    })
}

/// Global listing as a [`PageSource`].
pub struct GlobalPages<'a> {
    client: &'a PortalClient,
}

impl<'a> GlobalPages<'a> {
    pub fn new(client: &'a PortalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for GlobalPages<'_> {
    async fn fetch_page(&self, request: PageRequest) -> DocResult<Page<Document>> {
        self.client
            .list_all_files(request.page(), request.page_size())
            .await
    }
}

/// One owner's listing as a [`PageSource`].
pub struct OwnerPages<'a> {
    client: &'a PortalClient,
    session: &'a Session,
}

impl<'a> OwnerPages<'a> {
    pub fn new(client: &'a PortalClient, session: &'a Session) -> Self {
        Self { client, session }
    }
}

#[async_trait]
impl PageSource for OwnerPages<'_> {
    async fn fetch_page(&self, request: PageRequest) -> DocResult<Page<Document>> {
        self.client
            .list_owner_files(self.session, request.page(), request.page_size())
            .await
    }
}
