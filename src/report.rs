//! Owner dashboard and admin report over HTTP.
//!
//! `docport files` shows one owner's count and a page of their documents.
//! `docport report` walks every page of the global listing, sorts and
//! filters the aggregate in memory, then prints one local page of it. A walk
//! that hit `client.max_pages` or failed part-way is reported, and whatever
//! was fetched before that point is still shown.

use anyhow::{bail, Result};
use tracing::warn;

use docport_core::aggregate::{build_report, local_page, Report, ReportFilter};
use docport_core::models::{parse_effective_date, Document};
use docport_core::query::PageRequest;

use crate::client::{GlobalPages, PortalClient, Session};
use crate::config::Config;

/// Builds a [`ReportFilter`] from command-line strings.
pub fn build_filter(
    title: Option<String>,
    owner: Option<String>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<ReportFilter> {
    let from = from.map(parse_effective_date).transpose()?;
    let to = to.map(parse_effective_date).transpose()?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            bail!("--from {} is after --to {}", f, t);
        }
    }
    Ok(ReportFilter {
        title_contains: title,
        owner_contains: owner,
        from,
        to,
    })
}

/// Walks the whole global listing through `client`.
///
/// Pages are requested at `pagination.max_page_size` to keep the number of
/// round trips low; the walk is bounded by `client.max_pages`.
pub async fn fetch_report(
    config: &Config,
    client: &PortalClient,
    filter: &ReportFilter,
) -> Report {
    let source = GlobalPages::new(client);
    let report = build_report(
        &source,
        config.pagination.max_page_size,
        config.client.max_pages,
        filter,
    )
    .await;

    if report.truncated {
        warn!(
            pages_fetched = report.pages_fetched,
            total_pages = report.total_pages,
            "report truncated at client.max_pages"
        );
    }
    if let Some(err) = &report.error {
        warn!(
            error = %err,
            pages_fetched = report.pages_fetched,
            "report walk failed, showing partial results"
        );
    }
    report
}

pub async fn run_report(config: &Config, filter: &ReportFilter, page: u32) -> Result<()> {
    let client = PortalClient::new(&config.client)?;
    let report = fetch_report(config, &client, filter).await;

    let matched = report.documents.len();
    let view = local_page(report.documents, page, config.pagination.global_page_size)?;

    println!(
        "{} of {} documents match ({} page{} fetched)",
        matched,
        report.scanned,
        report.pages_fetched,
        if report.pages_fetched == 1 { "" } else { "s" }
    );
    if report.truncated {
        println!(
            "warning: stopped after {} of {} pages",
            report.pages_fetched, report.total_pages
        );
    }
    if let Some(err) = &report.error {
        println!("warning: listing incomplete: {}", err);
    }
    println!();
    print_table(&view.items);
    println!();
    println!("page {} of {}", view.page, view.total_pages.max(1));

    Ok(())
}

/// Owner dashboard: document count plus one server page.
pub async fn run_files(config: &Config, username: &str, page: u32) -> Result<()> {
    let session = Session::login(username)?;
    let client = PortalClient::new(&config.client)?;

    let count = client.user_document_count(&session).await?;
    let request = PageRequest::new(
        i64::from(page),
        i64::from(config.pagination.owner_page_size),
    )?;
    let listing = client
        .list_owner_files(&session, request.page(), request.page_size())
        .await?;

    println!("{}: {} document{}", session.username(), count, if count == 1 { "" } else { "s" });
    println!();
    print_table(&listing.items);
    println!();
    println!("page {} of {}", listing.page, listing.total_pages.max(1));

    Ok(())
}

fn print_table(items: &[Document]) {
    if items.is_empty() {
        println!("  (no documents)");
        return;
    }
    println!(
        "  {:<36} {:<10} {:<16} {:>4}  {}",
        "ID", "DATE", "OWNER", "VER", "TITLE"
    );
    println!("  {}", "-".repeat(90));
    for doc in items {
        println!(
            "  {:<36} {:<10} {:<16} {:>4}  {}",
            doc.id,
            doc.effective_date.to_string(),
            truncate(&doc.owner_username, 16),
            doc.history.len() + 1,
            doc.title
        );
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
