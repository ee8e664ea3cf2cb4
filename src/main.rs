//! LightCrawl main entry point
//!
//! This is the command-line interface for the LightCrawl crawl orchestrator.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lightcrawl::config::{load_config_with_hash, Config};
use lightcrawl::crawler::{CrawlContext, CrawlOptions, CrawlRequest, Orchestrator, RateLimiter};
use lightcrawl::output::{load_statistics, print_statistics, write_seeds, write_seeds_to_file};
use lightcrawl::sitemap::{SchemaRelationship, SitemapWalker};
use lightcrawl::storage::{SharedStorage, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use url::Url;

/// LightCrawl: a policy-aware crawl orchestrator
///
/// LightCrawl checks robots.txt, paces requests per host and rotates egress
/// proxies before handing a URL to the structural mining and OCR engines.
/// It can also walk sitemaps to discover seed URLs.
#[derive(Parser, Debug)]
#[command(name = "lightcrawl")]
#[command(version)]
#[command(about = "A policy-aware crawl orchestrator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one URL and print the result as JSON
    Crawl {
        url: String,

        /// Run structural mining on the page
        #[arg(long)]
        mine: bool,

        /// Image URL to run OCR on (repeatable)
        #[arg(long = "image", value_name = "URL")]
        images: Vec<String>,
    },

    /// Walk a sitemap tree and print the discovered seed URLs as JSON
    Seed {
        sitemap: String,

        /// Keep URLs whose path contains this schema type name
        #[arg(long)]
        schema_type: Option<String>,

        /// Keep URLs whose path contains this fragment
        #[arg(long)]
        target_path: Option<String>,

        /// Keep URLs containing this keyword (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Write seeds to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show proxy and crawl statistics from the database
    Stats,

    /// Validate the configuration and show what is enabled
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Crawl { url, mine, images } => handle_crawl(&config, &url, mine, &images).await,
        Command::Seed {
            sitemap,
            schema_type,
            target_path,
            keywords,
            output,
        } => {
            let filter = SchemaRelationship {
                schema_type,
                target_path,
                keywords: (!keywords.is_empty()).then_some(keywords),
            };
            handle_seed(&config, &sitemap, filter, output.as_deref()).await
        }
        Command::Stats => handle_stats(&config),
        Command::Check => {
            handle_check(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lightcrawl=info,warn"),
            1 => EnvFilter::new("lightcrawl=debug,info"),
            2 => EnvFilter::new("lightcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_storage(config: &Config) -> anyhow::Result<Option<SharedStorage>> {
    let Some(path) = config.output.database_path.as_deref() else {
        return Ok(None);
    };

    let storage = SqliteStorage::new(Path::new(path))
        .with_context(|| format!("failed to open database {}", path))?;
    Ok(Some(Arc::new(Mutex::new(storage))))
}

fn parse_url(raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid URL: {}", raw))
}

/// Handles the crawl command: runs one orchestrated crawl
async fn handle_crawl(
    config: &Config,
    url: &str,
    mine: bool,
    images: &[String],
) -> anyhow::Result<()> {
    let images = images
        .iter()
        .map(|raw| parse_url(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let request = CrawlRequest::new(parse_url(url)?).with_options(CrawlOptions {
        mine_structure: mine,
        extract_images: !images.is_empty(),
        images,
    });

    let storage = open_storage(config)?;
    let context = CrawlContext::from_config(config, storage.clone())?;
    let orchestrator = Orchestrator::from_config(config, context, storage).await?;

    let result = orchestrator.crawl(&request).await;
    orchestrator.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        bail!("crawl of {} did not complete", result.url);
    }
    Ok(())
}

/// Handles the seed command: walks a sitemap and exports seeds
async fn handle_seed(
    config: &Config,
    sitemap: &str,
    filter: SchemaRelationship,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let seed = parse_url(sitemap)?;
    let walker = SitemapWalker::from_config(config)?
        .with_rate_limiter(Arc::new(RateLimiter::from_config(&config.rate_limit)));

    let filter = (!filter.is_empty()).then_some(filter);
    let report = walker.walk_with_report(&seed, filter.as_ref()).await;

    tracing::info!(
        "Discovered {} seed URLs from {} sitemap(s), {} failed",
        report.seeds.len(),
        report.stats.nodes_fetched,
        report.stats.nodes_failed
    );
    if report.stats.truncated {
        tracing::warn!("Walk stopped at the sitemap node limit; results are partial");
    }

    match output {
        Some(path) => write_seeds_to_file(path, &report.seeds)?,
        None => write_seeds(std::io::stdout().lock(), &report.seeds)?,
    }

    Ok(())
}

/// Handles the stats command: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.output.database_path.as_deref() else {
        bail!("no output.database-path configured");
    };
    println!("Database: {}\n", path);

    let storage = SqliteStorage::new(Path::new(path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the check command: prints the effective configuration
fn handle_check(config: &Config) {
    println!("=== LightCrawl Configuration ===\n");

    println!("User Agent: {}", config.user_agent.header_value());
    println!("Service ID: {}", config.crawler.service_id);

    println!("\nRobots:");
    println!("  Cache TTL: {}s", config.robots.cache_ttl_secs);
    println!("  Fetch timeout: {}ms", config.robots.fetch_timeout_ms);

    println!("\nRate Limits:");
    match config.rate_limit.default_rps {
        Some(rps) => println!("  Default: {} req/s", rps),
        None => println!("  Default: unlimited"),
    }
    for entry in &config.rate_limit.hosts {
        println!("  - {}: {} req/s", entry.host, entry.rps);
    }

    println!(
        "\nProxies ({}, {}):",
        config.proxy.servers.len(),
        if config.proxy.enabled { "enabled" } else { "disabled" }
    );
    for server in &config.proxy.servers {
        println!(
            "  - {}: {}://{}:{}",
            server.id, server.protocol, server.host, server.port
        );
    }

    println!("\nEngines:");
    println!(
        "  Structural mining: {}",
        engine_status(config.layers3d.enabled, config.layers3d.endpoint.as_deref())
    );
    println!(
        "  OCR: {} (batch size {})",
        engine_status(config.ocr.enabled, config.ocr.endpoint.as_deref()),
        config.ocr.batch_size
    );

    println!("\nSitemap:");
    println!("  Max nodes per walk: {}", config.sitemap.max_nodes);

    println!("\nOutput:");
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("(none)")
    );

    println!("\n✓ Configuration is valid");
}

fn engine_status(enabled: bool, endpoint: Option<&str>) -> String {
    match (enabled, endpoint) {
        (true, Some(endpoint)) => format!("enabled at {}", endpoint),
        (true, None) => "enabled (no endpoint)".to_string(),
        (false, _) => "disabled".to_string(),
    }
}
