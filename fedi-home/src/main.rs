//! fedi-home - timeline report for the authenticated user's home feed

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use libfedigest::client::mastodon::MastodonFeed;
use libfedigest::client::FeedRef;
use libfedigest::collect::StopReason;
use libfedigest::governor::ConsolePrompt;
use libfedigest::report::{render_timeline_report, report_stem, ReportWriter};
use libfedigest::{CollectionWindow, Config, CursorPager, RateLimitGovernor, Result};

#[derive(Parser, Debug)]
#[command(name = "fedi-home")]
#[command(version, about = "Timeline report for the authenticated user's home feed")]
#[command(long_about = r#"Collect the home timeline back to a day boundary and write a single
Markdown report, newest items first.

Note: servers cap how deep the home timeline can be paged; in practice
only about two days of history come back regardless of --days. This is
a limit of the API, not of the collection.

EXAMPLES:
    # Today's home timeline
    fedi-home

    # Today and yesterday
    fedi-home --days 1

EXIT CODES:
    0 - Success (including an empty timeline)
    1 - Collection or report error
    2 - Authentication error
    3 - Invalid input
"#)]
struct Cli {
    /// How many days back to collect (0 = today only)
    #[arg(short, long, default_value_t = 0, value_name = "N")]
    days: u32,

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
    let walk = CursorPager::new(&client, &mut governor)
        .with_page_size(config.collection.page_size)
        .with_pacing(Duration::from_secs(config.collection.pacing_secs))
        .collect(&FeedRef::Home, &window)
        .await;

    if let StopReason::Failed(error) = &walk.stop {
        tracing::warn!(error = %error, kept = walk.items.len(), "walk failed; writing partial report");
    }
    tracing::info!(items = walk.items.len(), "collection finished");

    let body = render_timeline_report("home", None, &walk.items, &window);
    let writer = ReportWriter::new(shellexpand::tilde(&config.reports.dir).to_string());
    let stem = report_stem("home", window.now().with_timezone(&chrono::Local));
    let path = writer.write(&stem, &body)?;
    println!("{}", path.display());

    Ok(())
}
