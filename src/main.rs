//! # docport CLI
//!
//! ```bash
//! docport --config ./config/docport.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docport init` | Create the SQLite database and run schema migrations |
//! | `docport serve` | Start the HTTP server |
//! | `docport get <id>` | Print a document and its version history |
//! | `docport stats` | Dashboard counters with a per-owner breakdown |
//! | `docport files --user <name>` | Owner dashboard (via HTTP) |
//! | `docport report` | Sorted, filtered report over every page (via HTTP) |
//! | `docport export` | The same report as CSV |
//!
//! ## Examples
//!
//! ```bash
//! docport init
//! docport serve
//! docport files --user alice --page 2
//! docport report --title budget --from 2024-01-01 --to 2024-03-31
//! docport export --owner alice --output ./out/alice.csv
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use docport::{config, export, get, logging, migrate, report, server, stats};

/// docport: a versioned document portal.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docport.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "docport", version, about = "A versioned document portal")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docport.toml")]
    config: PathBuf,

    /// Debug-level logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Report filters shared by `report` and `export`.
#[derive(Args)]
struct FilterArgs {
    /// Case-insensitive substring of the title.
    #[arg(long)]
    title: Option<String>,

    /// Case-insensitive substring of the owner username.
    #[arg(long)]
    owner: Option<String>,

    /// Earliest business date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    from: Option<String>,

    /// Latest business date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    to: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents, document_versions
    /// and users tables. Safe to run repeatedly.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print a document and its version history.
    Get {
        /// Document ID.
        id: String,
    },

    /// Show dashboard counters and a per-owner breakdown.
    Stats,

    /// Show one owner's document count and a page of their documents.
    Files {
        /// Owner username.
        #[arg(long)]
        user: String,

        /// Page number (1-based).
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Walk every page of the global listing and print a filtered report.
    Report {
        #[command(flatten)]
        filter: FilterArgs,

        /// Page of the report to print (1-based).
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Export the filtered report as CSV.
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file path. Writes to stdout if omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl FilterArgs {
    fn into_filter(self) -> anyhow::Result<docport_core::aggregate::ReportFilter> {
        report::build_filter(
            self.title,
            self.owner,
            self.from.as_deref(),
            self.to.as_deref(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Files { user, page } => {
            report::run_files(&cfg, &user, page).await?;
        }
        Commands::Report { filter, page } => {
            let filter = filter.into_filter()?;
            report::run_report(&cfg, &filter, page).await?;
        }
        Commands::Export { filter, output } => {
            let filter = filter.into_filter()?;
            export::run_export(&cfg, &filter, output.as_deref()).await?;
        }
    }

    Ok(())
}
