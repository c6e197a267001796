//! # docport core
//!
//! Shared, I/O-free logic for docport: the document data model, the
//! version history discipline, pagination and ordering rules, the
//! [`store::DocumentStore`] abstraction and the page aggregation walk used by
//! clients that need a full-dataset view.
//!
//! This crate contains no tokio, sqlx, HTTP or filesystem dependencies.
//! The SQLite store, server and client live in the `docport` crate.

pub mod aggregate;
pub mod error;
pub mod models;
pub mod query;
pub mod store;
pub mod version;

pub use error::{DocError, DocResult};
pub use models::{Document, DocumentFields, NewDocument, UpdateDocument, VersionSnapshot};
