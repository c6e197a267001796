//! # docport
//!
//! A versioned document portal. Owners upload documents with free-text
//! metadata and a business date; every update keeps the superseded state as
//! an immutable version snapshot. Documents are listed per owner (newest
//! first) or globally (by business date), paginated, and an admin report
//! walks every page to sort, filter and export the whole set.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ HTTP client  │──▶│  HTTP server │──▶│ SQLite store  │
//! │ report/export│   │  (axum)      │   │ docs+versions │
//! └──────────────┘   └──────┬───────┘   └───────────────┘
//!                           │
//!                           ▼
//!                    ┌──────────────┐
//!                    │ file storage │
//!                    └──────────────┘
//! ```
//!
//! Data types, pagination, versioning and page aggregation live in the
//! `docport-core` crate; this crate supplies persistence, HTTP and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite [`DocumentStore`](docport_core::store::DocumentStore) |
//! | [`locks`] | Per-document mutual exclusion |
//! | [`accounts`] | Account counters |
//! | [`uploads`] | Payload file storage |
//! | [`api`] | JSON wire types |
//! | [`server`] | HTTP server |
//! | [`client`] | HTTP client and page sources |
//! | [`report`] | Owner dashboard and admin report |
//! | [`export`] | CSV export |
//! | [`get`] | Single-document view |
//! | [`stats`] | Dashboard counters |
//! | [`logging`] | Tracing subscriber setup |

pub mod accounts;
pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod export;
pub mod get;
pub mod locks;
pub mod logging;
pub mod migrate;
pub mod report;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod uploads;
