//! CSV export of the aggregated report.
//!
//! Runs the same walk, filter and sort as `docport report` and writes every
//! matching document as one CSV row. Writes to a file when a path is given,
//! otherwise to stdout for piping.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use docport_core::aggregate::ReportFilter;
use docport_core::models::Document;

use crate::client::PortalClient;
use crate::config::Config;
use crate::get::format_ts;
use crate::report::fetch_report;

pub const CSV_HEADER: [&str; 10] = [
    "id",
    "owner",
    "title",
    "application",
    "description",
    "effective_date",
    "created_at",
    "updated_at",
    "content_ref",
    "versions",
];

/// Writes `documents` as CSV with [`CSV_HEADER`]. `versions` counts the
/// live state plus every superseded one.
pub fn write_csv<W: Write>(writer: W, documents: &[Document]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for doc in documents {
        let row: [String; 10] = [
            doc.id.clone(),
            doc.owner_username.clone(),
            doc.title.clone(),
            doc.application.clone(),
            doc.description.clone(),
            doc.effective_date.to_string(),
            format_ts(doc.created_at),
            format_ts(doc.updated_at),
            doc.content_ref.clone(),
            (doc.history.len() + 1).to_string(),
        ];
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

pub async fn run_export(
    config: &Config,
    filter: &ReportFilter,
    output: Option<&Path>,
) -> Result<()> {
    let client = PortalClient::new(&config.client)?;
    let report = fetch_report(config, &client, filter).await;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(std::io::BufWriter::new(file), &report.documents)?;
            eprintln!(
                "Exported {} documents to {}",
                report.documents.len(),
                path.display()
            );
        }
        None => {
            write_csv(std::io::stdout().lock(), &report.documents)?;
        }
    }

    if report.truncated || report.error.is_some() {
        eprintln!(
            "warning: export is partial ({} of {} pages fetched)",
            report.pages_fetched, report.total_pages
        );
    }
    Ok(())
}
