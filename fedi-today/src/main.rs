//! fedi-today - per-day digests of followed accounts' timelines

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use libfedigest::bucket::bucketize;
use libfedigest::client::mastodon::MastodonFeed;
use libfedigest::extract::extract_handles_from_files;
use libfedigest::governor::ConsolePrompt;
use libfedigest::report::{day_report_stem, render_day_report, ReportWriter};
use libfedigest::{
    CollectionWindow, Config, FedigestError, RateLimitGovernor, Result, SubjectAggregator,
};

#[derive(Parser, Debug)]
#[command(name = "fedi-today")]
#[command(version, about = "Per-day digests of followed accounts' timelines")]
#[command(long_about = r#"Collect the timelines of every followed account back to a day
boundary and write one Markdown digest per calendar day.

Collection is sequential and paced: the instance's rate limit is one
shared budget. When it runs out, you are asked whether to wait for the
reset, wait without further prompts, or abort with what was collected
so far.

EXAMPLES:
    # Today's digest for all followed accounts
    fedi-today

    # Today plus the previous three days (four digests)
    fedi-today --days 3

    # Collect for the @handles found in text files instead of the roster
    fedi-today --subjects guests.txt --subjects speakers.md

    # Use a different config file
    fedi-today --config ./fedigest.toml

EXIT CODES:
    0 - Success (including an empty collection)
    1 - Collection or report error
    2 - Authentication error
    3 - Invalid input
"#)]
struct Cli {
    /// How many days back to collect (0 = today only)
    #[arg(short, long, default_value_t = 0, value_name = "N")]
    days: u32,

    /// Text file to scan for @handles instead of using the roster
    /// (repeatable)
    #[arg(short, long = "subjects", value_name = "FILE")]
    subjects: Vec<PathBuf>,

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

    let window = CollectionWindow::days_back(cli.days)?;
    tracing::info!(
        current = %window.now().with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
        origin = %window.origin().with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
        days = cli.days,
        "collection window"
    );

    let client = MastodonFeed::from_config(&config)?;
    let mut governor = RateLimitGovernor::new(Box::new(ConsolePrompt::new()));
    let mut aggregator = SubjectAggregator::new(&client, &mut governor)
        .with_page_size(config.collection.page_size)
        .with_pacing(Duration::from_secs(config.collection.pacing_secs));

    let archive = if cli.subjects.is_empty() {
        aggregator.collect_roster(&window).await?
    } else {
        let handles = extract_handles_from_files(&cli.subjects)?;
        if handles.is_empty() {
            return Err(FedigestError::InvalidInput(
                "no @handles found in the given files".to_string(),
            ));
        }
        tracing::info!(count = handles.len(), "subjects from files");
        aggregator.collect_handles(&handles, &window).await
    };

    if archive.is_empty() {
        tracing::info!("nothing collected; no reports written");
        return Ok(());
    }
    tracing::info!(
        subjects = archive.subjects().len(),
        items = archive.item_count(),
        "collection finished"
    );

    let writer = ReportWriter::new(shellexpand::tilde(&config.reports.dir).to_string());
    let now_local = window.now().with_timezone(&chrono::Local);
    for bucket in &bucketize(&archive, &window)? {
        let body = render_day_report("today", bucket, &window);
        let path = writer.write(&day_report_stem("today", bucket, now_local), &body)?;
        println!("{}", path.display());
    }

    Ok(())
}
