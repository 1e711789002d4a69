//! fedi-user - timeline report for one account

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use libfedigest::client::mastodon::MastodonFeed;
use libfedigest::client::FeedRef;
use libfedigest::collect::StopReason;
use libfedigest::governor::ConsolePrompt;
use libfedigest::report::{render_timeline_report, report_stem, ReportWriter};
use libfedigest::{
    CollectionWindow, Config, CursorPager, FedigestError, FeedClient, RateLimitGovernor, Result,
};

#[derive(Parser, Debug)]
#[command(name = "fedi-user")]
#[command(version, about = "Timeline report for one account")]
#[command(long_about = r#"Collect one account's timeline back to a day boundary and write a
single Markdown report, newest items first.

EXAMPLES:
    # Today's items from @maruko
    fedi-user maruko

    # The last week
    fedi-user --days 7 taro

    # Full address form also works
    fedi-user alice@mastodon.social

EXIT CODES:
    0 - Success (including an empty timeline)
    1 - Collection or report error
    2 - Authentication error
    3 - Invalid input
"#)]
struct Cli {
    /// Handle of the account to collect, with or without the leading @
    #[arg(value_name = "HANDLE")]
    handle: String,

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
    let handle = cli.handle.trim().trim_start_matches('@').to_string();
    if handle.is_empty() {
        return Err(FedigestError::InvalidInput(
            "no handle specified".to_string(),
        ));
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let window = CollectionWindow::days_back(cli.days)?;

    let client = MastodonFeed::from_config(&config)?;
    let subject = client.lookup_subject(&handle).await?;
    tracing::info!(handle = %subject.handle, name = %subject.name, "collecting subject");

    let mut governor = RateLimitGovernor::new(Box::new(ConsolePrompt::new()));
    let walk = CursorPager::new(&client, &mut governor)
        .with_page_size(config.collection.page_size)
        .with_pacing(Duration::from_secs(config.collection.pacing_secs))
        .collect(&FeedRef::Account(subject.id.clone()), &window)
        .await;

    if let StopReason::Failed(error) = &walk.stop {
        tracing::warn!(error = %error, kept = walk.items.len(), "walk failed; writing partial report");
    }
    tracing::info!(items = walk.items.len(), "collection finished");

    let body = render_timeline_report("user", Some(&subject), &walk.items, &window);
    let writer = ReportWriter::new(shellexpand::tilde(&config.reports.dir).to_string());
    let stem = report_stem("user", window.now().with_timezone(&chrono::Local));
    let path = writer.write(&stem, &body)?;
    println!("{}", path.display());

    Ok(())
}
