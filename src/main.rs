//! Site-Discovery main entry point
//!
//! This is the command-line interface for the Site-Discovery crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use site_discovery::config::{load_config_with_hash, validate, BackendKind, Config};
use site_discovery::output::print_summary;
use site_discovery::{crawl, AdmissionFilter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Discovery: a breadth-first site crawler
///
/// Site-Discovery crawls a website from one or more seed URLs, combining
/// several link extraction strategies so that client-rendered sites are
/// discovered as completely as server-rendered ones.
#[derive(Parser, Debug)]
#[command(name = "site-discovery")]
#[command(version)]
#[command(about = "A breadth-first site discovery crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the full crawl report as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Override the maximum number of pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Override the fetch backend
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Static,
    Rendered,
    Auto,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Static => BackendKind::Static,
            BackendArg::Rendered => BackendKind::Rendered,
            BackendArg::Auto => BackendKind::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration, then apply command-line overrides before validating
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(backend) = cli.backend {
        config.crawl.backend = backend.into();
    }
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config, cli.report).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_discovery=info,warn"),
            1 => EnvFilter::new("site_discovery=debug,info"),
            2 => EnvFilter::new("site_discovery=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let filter = AdmissionFilter::from_config(config).context("cannot build domain set")?;

    println!("=== Site-Discovery Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Max pages: {}", config.crawl.max_pages);
    println!("  Backend: {:?}", config.crawl.backend);
    println!("  Workers: {}", config.crawl.workers);
    println!("  Page timeout: {}ms", config.crawl.page_timeout_ms);
    println!("  Max frontier size: {}", config.crawl.max_frontier_size);
    match config.crawl.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    if let Some(secs) = config.crawl.crawl_deadline_secs {
        println!("  Deadline: {}s", secs);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSeeds ({}):", config.crawl.seeds.len());
    for seed in &config.crawl.seeds {
        println!("  - {}", seed);
    }

    println!("\nAccepted Domains ({}):", filter.accepted_domains().len());
    for domain in filter.accepted_domains() {
        println!("  - {}", domain);
    }

    if !config.filter.exclude_patterns.is_empty() {
        println!("\nExcluded Patterns: {}", config.filter.exclude_patterns.join(" "));
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, report_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, extra domains: {}",
        config.crawl.seeds.len(),
        config.crawl.extra_domains.len()
    );

    let report = crawl(config).await.context("crawl could not start")?;

    print_summary(&report);

    if let Some(path) = report_path {
        report
            .write_json(&path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("✓ Report written to: {}", path.display());
    }

    Ok(())
}
