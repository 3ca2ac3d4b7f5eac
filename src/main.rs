//! Where's My Value main entry point
//!
//! This is the command-line interface for the domain-scoped value search crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wheres_my_value::config::{load_config_with_hash, Config};
use wheres_my_value::output::{export_results, print_results};
use wheres_my_value::WebCrawler;

/// Where's My Value: find where values live on a website
///
/// Crawls pages on the start URL's host, breadth first, and searches each
/// one for the configured values as text, element id, CSS class and
/// attribute. Press Ctrl+C to stop early; partial results are still shown.
#[derive(Parser, Debug)]
#[command(name = "wheres-my-value")]
#[command(version)]
#[command(about = "A domain-scoped crawler that finds values on web pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the visited history file when starting
    #[arg(long)]
    fresh: bool,

    /// Export results to a timestamped file, overriding the config
    #[arg(long)]
    export: bool,

    /// Print the result payload as JSON instead of the text listing
    #[arg(long)]
    json: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.export {
        config.output.export_results = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wheres_my_value=info,warn"),
            1 => EnvFilter::new("wheres_my_value=debug,info"),
            2 => EnvFilter::new("wheres_my_value=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated crawl settings
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    println!("=== Crawler Configuration ===");
    println!("URL: {}", crawler.base_url);
    println!("Searching for: {}", crawler.search_values.join(", "));
    println!("Maximum pages: {}", crawler.max_pages);
    println!("Concurrent workers: {}", crawler.max_workers);
    println!("Delay between requests: {} seconds", crawler.sleep_time);
    println!("Request timeout: {} seconds", crawler.timeout);
    println!("Maximum crawl depth: {}", crawler.max_depth);

    if crawler.respect_robots {
        println!("Respecting robots.txt");
    }
    if config.history.enabled {
        if let Some(file) = &config.history.file {
            println!("Using history file {} to avoid duplicates", file.display());
        }
    }
    if config.output.verbose {
        println!("Verbose mode enabled");
    }
    if config.output.export_results {
        println!("Results will be exported to {}", config.output.export_dir.display());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let verbose = config.output.verbose;
    let export = config.output.export_results;
    let export_dir = config.output.export_dir.clone();

    let crawler = if cli.fresh {
        tracing::info!("Starting fresh crawl (ignoring history)");
        WebCrawler::fresh(config)?
    } else {
        WebCrawler::new(config)?
    };

    // Ctrl+C requests a cooperative stop; the run still returns its results
    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C detected, stopping crawl...");
            stop.stop();
        }
    });

    let report = crawler.run().await;
    if report.termination.is_seeding_failure() {
        tracing::error!("Crawl did not start: {}", report.termination.description());
    }

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_results(&report, verbose);
    }

    if export {
        if let Err(e) = export_results(&report, &export_dir) {
            tracing::error!("Error exporting results: {}", e);
        }
    }

    Ok(())
}
