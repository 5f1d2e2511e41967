use anyhow::Context;
use clap::Parser;
use feed_digest::render::{open_in_viewer, render_html, render_json, write_output};
use feed_digest::{Aggregator, DigestConfig, FetchConfig, Fetcher, GroupSelector, SourceRegistry};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Collect the latest entries of every feed in a group into one page.
#[derive(Parser, Debug)]
#[command(name = "feed-digest", version, about)]
struct Cli {
    /// Group name (a file in <root>/opml/), optionally suffixed with '#' or '!', or "all"
    group: String,

    /// Entries to check per feed
    #[arg(default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    max_entries: u64,

    /// Look up each entry's duration (slow)
    #[arg(default_value_t = false, action = clap::ArgAction::Set)]
    enrich: bool,

    /// Directory holding opml/ and out/; defaults to the executable's directory
    #[arg(long, env = "FEED_DIGEST_ROOT")]
    root: Option<PathBuf>,

    /// Only keep entries from the last N days
    #[arg(long, default_value_t = 7)]
    days: u32,

    /// Limit simultaneous fetches
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    concurrency: Option<u64>,

    /// Write the page without opening it
    #[arg(long)]
    no_open: bool,

    /// Print the ranked groups as JSON instead of writing HTML
    #[arg(long)]
    json: bool,
}

fn executable_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("could not locate executable")?;
    Ok(exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => executable_dir()?,
    };

    let registry = SourceRegistry::new(&root);
    let selector = GroupSelector::from(cli.group.as_str());
    let groups = registry
        .resolve(&selector)
        .with_context(|| format!("could not resolve {:?} in {}", cli.group, registry.dir().display()))?;

    info!(
        "Fetching {} groups ({} feeds)",
        groups.len(),
        groups.iter().map(|g| g.targets.len()).sum::<usize>()
    );

    let config = DigestConfig {
        max_entries: cli.max_entries as usize,
        enrich: cli.enrich,
        window_days: i64::from(cli.days),
        max_concurrency: cli.concurrency.map(|n| n as usize),
        ..Default::default()
    };
    let fetcher = Fetcher::new(FetchConfig::default())?;
    let aggregator = Aggregator::new(fetcher, config)?;
    let ranked = aggregator.run(&groups).await;

    if cli.json {
        println!("{}", render_json(&ranked)?);
        return Ok(());
    }

    let path = write_output(&root, &render_html(&ranked))?;
    info!("Wrote {}", path.display());
    if !cli.no_open {
        open_in_viewer(&path);
    }

    Ok(())
}
