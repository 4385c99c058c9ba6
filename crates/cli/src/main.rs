//! Command-line access to the vehicle catalog.
//!
//! Usage:
//!     autolist search --make porsche --sort price_desc
//!     autolist search --local --year-min 2015 --page 2
//!     autolist query --file listings.json --price-max 25000
//!     autolist show 123
//!     autolist dealerships
//!     autolist health

mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autolist_backend_http::{HttpListingSource, ListingSource, SourceConfig};
use autolist_model::{DealershipIndex, QueryFilters, SortKey, DEFAULT_PAGE_SIZE};
use autolist_normalize::{adapt_listings, HiddenSources, Normalizer};
use autolist_query::QueryState;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::output::{print_dealerships, print_listing, print_page};

#[derive(Parser)]
#[command(name = "autolist")]
#[command(about = "Browse and query aggregated vehicle listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog API base URL
    #[arg(long, env = "AUTOLIST_API_BASE", default_value = "http://127.0.0.1:8000")]
    api_base: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "12")]
    timeout_secs: u64,

    /// Extra source tags to hide, on top of the built-in list
    #[arg(long = "hide-source")]
    hide_sources: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the remote catalog
    Search {
        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Fetch the whole collection and filter/sort locally
        #[arg(long)]
        local: bool,
    },

    /// Query a local JSON file (array or envelope) without a server
    Query {
        /// Path to the listings file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Show one listing in detail
    Show {
        id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List dealerships
    Dealerships,

    /// Check the catalog API is reachable
    Health,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Free-text query
    #[arg(short, long)]
    q: Option<String>,

    #[arg(long)]
    vin: Option<String>,

    #[arg(long)]
    make: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    year_min: Option<i32>,

    #[arg(long)]
    year_max: Option<i32>,

    #[arg(long)]
    price_min: Option<f64>,

    #[arg(long)]
    price_max: Option<f64>,

    /// Source/market tag (substring)
    #[arg(long)]
    source: Option<String>,

    #[arg(long)]
    dealership: Option<String>,
}

impl From<FilterArgs> for QueryFilters {
    fn from(args: FilterArgs) -> Self {
        QueryFilters {
            q: args.q,
            vin: args.vin,
            make: args.make,
            model: args.model,
            year_min: args.year_min,
            year_max: args.year_max,
            price_min: args.price_min,
            price_max: args.price_max,
            source: args.source,
            dealership_id: args.dealership,
        }
    }
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Sort order (relevance, price_asc, price_desc, year_asc, year_desc,
    /// mileage_asc, mileage_desc); unknown values mean relevance
    #[arg(short, long, default_value = "relevance")]
    sort: String,

    /// 1-based page number
    #[arg(short, long, default_value = "1")]
    page: usize,

    /// Listings per page (defaults to the site setting)
    #[arg(long)]
    page_size: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ViewArgs {
    fn sort_key(&self) -> SortKey {
        SortKey::from(self.sort.as_str())
    }

    /// Query state for these flags; the page is applied after filters and
    /// sort so it is not reset.
    fn query_state(&self, filters: QueryFilters, page_size: usize) -> Result<QueryState> {
        let mut state = QueryState::new(page_size)?;
        state.set_filters(filters);
        state.set_sort(self.sort_key());
        state.set_page(self.page)?;
        Ok(state)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let normalizer = Normalizer::new(
        cli.hide_sources
            .iter()
            .fold(HiddenSources::default(), |hidden, tag| hidden.with(tag)),
    );
    let config = SourceConfig {
        base_url: cli.api_base,
        timeout_secs: cli.timeout_secs,
    };
    let source = HttpListingSource::new(config)?.with_normalizer(normalizer.clone());
    tracing::debug!(base_url = %source.base_url(), "Configured catalog source");

    match cli.command {
        Commands::Search {
            filters,
            view,
            local,
        } => {
            run_search(&source, filters.into(), &view, local).await?;
        }
        Commands::Query {
            file,
            filters,
            view,
        } => {
            run_file_query(&file, &normalizer, filters.into(), &view)?;
        }
        Commands::Show { id, format } => {
            run_show(&source, &id, format).await?;
        }
        Commands::Dealerships => {
            let dealerships = source.fetch_dealerships().await?;
            print_dealerships(&dealerships);
        }
        Commands::Health => {
            run_health(&source).await?;
        }
    }

    Ok(())
}

/// Explicit page size, else the site setting, else the built-in default.
async fn resolve_page_size(source: &HttpListingSource, explicit: Option<usize>) -> usize {
    if let Some(size) = explicit {
        return size;
    }
    match source.fetch_settings().await {
        Ok(settings) => settings.effective_page_size(),
        Err(e) => {
            tracing::warn!(error = %e, "Settings unavailable, using default page size");
            DEFAULT_PAGE_SIZE
        }
    }
}

async fn load_dealerships(source: &HttpListingSource) -> DealershipIndex {
    match source.fetch_dealerships().await {
        Ok(dealerships) => dealerships.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Dealerships unavailable");
            DealershipIndex::default()
        }
    }
}

async fn run_search(
    source: &HttpListingSource,
    filters: QueryFilters,
    view: &ViewArgs,
    local: bool,
) -> Result<()> {
    let page_size = resolve_page_size(source, view.page_size).await;
    let state = view.query_state(filters, page_size)?;

    let page = if local {
        let listings = source.fetch_all().await?;
        tracing::info!(listings = listings.len(), "Querying locally");
        state.run(&listings)
    } else {
        source.fetch_page(&state.to_query()).await?
    };

    let dealerships = load_dealerships(source).await;
    print_page(&page, &dealerships, view.format)
}

fn run_file_query(
    path: &Path,
    normalizer: &Normalizer,
    filters: QueryFilters,
    view: &ViewArgs,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read listings file {}", path.display()))?;
    let response: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parse listings file {}", path.display()))?;
    let listings = adapt_listings(response, None, normalizer)?.items;

    let state = view.query_state(filters, view.page_size.unwrap_or(DEFAULT_PAGE_SIZE))?;
    let page = state.run(&listings);
    print_page(&page, &DealershipIndex::default(), view.format)
}

async fn run_show(source: &HttpListingSource, id: &str, format: OutputFormat) -> Result<()> {
    let listing = source.fetch_listing(id).await?;
    let dealerships = load_dealerships(source).await;
    print_listing(&listing, dealerships.lookup(&listing), format)
}

async fn run_health(source: &HttpListingSource) -> Result<()> {
    print!("Checking {} source... ", source.name());

    match source.health_check().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
