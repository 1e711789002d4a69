//! fedi-friends - roster report of followed accounts

use clap::Parser;
use std::path::PathBuf;

use libfedigest::client::mastodon::MastodonFeed;
use libfedigest::report::{render_roster, report_stem, ReportWriter};
use libfedigest::{Config, FeedClient, Result};

#[derive(Parser, Debug)]
#[command(name = "fedi-friends")]
#[command(version, about = "Roster report of followed accounts")]
#[command(long_about = r#"List the accounts the authenticated user follows, sorted by handle.

The default writes a Markdown report and prints its path; --format json
prints the roster to stdout instead, for scripting.

EXAMPLES:
    # Write the roster report
    fedi-friends

    # Pipe handles into another tool
    fedi-friends --format json | jq -r '.[].handle'

EXIT CODES:
    0 - Success
    1 - Collection or report error
    2 - Authentication error
"#)]
struct Cli {
    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Use a specific config file instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    libfedigest::logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let client = MastodonFeed::from_config(&config)?;
    let snapshot = client.rate_limit_status().await?;
    tracing::info!(
        limit = snapshot.limit,
        remaining = snapshot.remaining,
        reset = %snapshot.reset,
        "rate limit status"
    );

    let mut subjects = client.list_subjects().await?;
    subjects.sort_by(|a, b| a.handle.cmp(&b.handle));
    tracing::info!(count = subjects.len(), "roster fetched");

    if cli.format == "json" {
        let json = serde_json::to_string_pretty(&subjects).map_err(std::io::Error::other)?;
        println!("{}", json);
        return Ok(());
    }

    let body = render_roster("friends", &subjects);
    let writer = ReportWriter::new(shellexpand::tilde(&config.reports.dir).to_string());
    let stem = report_stem("friends", chrono::Local::now());
    let path = writer.write(&stem, &body)?;
    println!("{}", path.display());

    Ok(())
}
