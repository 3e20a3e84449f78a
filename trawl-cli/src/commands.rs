//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use trawl_core::{FetchMode, TrawlConfig};
use trawl_search::{MediaSearchService, MediaType, SearchReport, SearchRequest};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the JSON API server
    Server {
        /// Host to bind to (overrides TRAWL_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides TRAWL_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        #[command(flatten)]
        sources: SourceOptions,
    },
    /// Run one search and print the results
    Search {
        /// Search terms
        query: String,
        /// Media type: videos or gifs
        #[arg(short = 't', long = "type", default_value = "videos")]
        media_type: String,
        /// Result page, starting at 1
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
        /// Restrict the search to one source (name or alias)
        #[arg(short, long)]
        source: Option<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        sources: SourceOptions,
    },
    /// List the sources in the driver catalogue
    Drivers {
        #[command(flatten)]
        sources: SourceOptions,
    },
}

/// Options selecting the catalogue and fetch mode.
#[derive(Args, Debug, Default)]
pub struct SourceOptions {
    /// Driver catalogue file (overrides TRAWL_DRIVERS_FILE)
    #[arg(long)]
    drivers: Option<PathBuf>,
    /// Fetch mode (overrides TRAWL_MOCK_MODE)
    #[arg(long, value_enum)]
    mode: Option<FetchMode>,
    /// Read recorded fixtures instead of contacting sites, same as `--mode mock`
    #[arg(long, conflicts_with = "mode")]
    mock: bool,
    /// Fixture root for mock mode (overrides TRAWL_FIXTURES_DIR)
    #[arg(long)]
    fixtures: Option<PathBuf>,
}

impl SourceOptions {
    fn apply(self, config: &mut TrawlConfig) {
        if let Some(drivers) = self.drivers {
            config.search.drivers_file = drivers;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.mock {
            config.mode = FetchMode::Mock;
        }
        if let Some(fixtures) = self.fixtures {
            config.fetch.fixtures_dir = fixtures;
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns the error of the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let mut config = TrawlConfig::from_env();

    match command {
        Commands::Server {
            host,
            port,
            sources,
        } => {
            sources.apply(&mut config);
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            start_server(config).await
        }
        Commands::Search {
            query,
            media_type,
            page,
            source,
            json,
            sources,
        } => {
            sources.apply(&mut config);
            let request = SearchRequest::new(query)
                .with_media_type(MediaType::parse_or_default(Some(&media_type)))
                .with_page(page)
                .with_source(source.as_deref());
            run_search(&config, &request, json).await
        }
        Commands::Drivers { sources } => {
            sources.apply(&mut config);
            list_drivers(&config).await
        }
    }
}

async fn start_server(config: TrawlConfig) -> anyhow::Result<()> {
    trawl_web::run_server(config)
        .await
        .context("API server stopped")
}

async fn run_search(
    config: &TrawlConfig,
    request: &SearchRequest,
    json: bool,
) -> anyhow::Result<()> {
    let service = MediaSearchService::load(config)
        .await
        .context("failed to load driver catalogue")?;
    let report = service.search_with_report(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(request, &report);
    }
    Ok(())
}

fn print_report(request: &SearchRequest, report: &SearchReport) {
    println!(
        "{} {} for '{}' (page {}, source {})",
        report.results.len(),
        request.media_type,
        request.query,
        request.page,
        request.source_label()
    );

    if report.cached {
        println!("  (served from cache)");
    }
    for source in &report.sources {
        println!("  {:<24} {:>4}  {}", source.name, source.count, source.status);
    }
    println!();

    for (position, result) in report.results.iter().enumerate() {
        let duration = result.duration.as_deref().unwrap_or("-");
        println!(
            "{:>3}. [{}] {} ({})",
            position + 1,
            result.source,
            result.title,
            duration
        );
        println!("     {}", result.url);
    }
}

async fn list_drivers(config: &TrawlConfig) -> anyhow::Result<()> {
    let service = MediaSearchService::load(config)
        .await
        .context("failed to load driver catalogue")?;

    println!(
        "{} drivers from {}",
        service.registry().len(),
        config.search.drivers_file.display()
    );
    for driver in service.registry().all() {
        let descriptor = driver.descriptor();
        let media: Vec<&str> = MediaType::ALL
            .into_iter()
            .filter(|media_type| descriptor.supports(*media_type))
            .map(MediaType::as_str)
            .collect();
        println!(
            "  {:<24} {:<12} {}",
            descriptor.name,
            media.join(","),
            descriptor.base_url
        );
    }
    Ok(())
}
