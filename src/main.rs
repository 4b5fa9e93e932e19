//! # Assistant Link CLI (`alink`)
//!
//! Command-line front end for the assistant backend client. Every command
//! goes through the same cascade, health, and search code the dashboard
//! uses, which makes it the quickest way to diagnose connectivity.
//!
//! ## Usage
//!
//! ```bash
//! alink --config ./config/alink.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `alink candidates` | Print the ordered fallback candidates |
//! | `alink health` | Wake the backend, then probe for liveness |
//! | `alink wake` | Only send the wake-up request |
//! | `alink watch` | Re-probe on an interval and print each verdict |
//! | `alink request <METHOD> <PATH>` | Send one request through the cascade |
//! | `alink search "<query>"` | Unified search across all categories |
//! | `alink suggest "<query>"` | Search-box suggestions |
//! | `alink cache refresh` | Download resources into the offline cache |
//! | `alink login <token>` / `alink logout` | Manage the stored bearer token |

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assistant_link::config::{self, Config};
use assistant_link::health::HealthProber;
use assistant_link::models::Category;
use assistant_link::resources::{Resource, ResourceClient};
use assistant_link::search::cache::OfflineCache;
use assistant_link::search::{SearchAggregator, SearchOptions};
use assistant_link::session::{FileSession, SessionContext};
use assistant_link::transport::{Method, RequestSpec};
use assistant_link::{ClientError, Dispatcher};

/// Assistant Link CLI: resilient client for the assistant dashboard backend.
///
/// All commands except `completions` read a TOML configuration file given
/// by `--config`. See `config/alink.example.toml`.
#[derive(Parser)]
#[command(
    name = "alink",
    about = "Assistant Link: resilient client for the assistant dashboard backend",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/alink.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ordered list of base URLs the cascade tries.
    Candidates,

    /// Wake the backend, then probe the health endpoints.
    ///
    /// Exits with status 1 when no endpoint produced an HTTP response.
    Health {
        /// Print the verdict as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Send the cold-start wake-up request only.
    Wake,

    /// Probe repeatedly and print every verdict.
    Watch {
        /// Seconds between probes.
        #[arg(long, default_value_t = 30)]
        interval: u64,

        /// Stop after this many verdicts.
        #[arg(long)]
        count: Option<usize>,
    },

    /// Send one request through the fallback cascade.
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,

        /// Path relative to the backend base URL, e.g. `/api/notes`.
        path: String,

        /// JSON request body.
        #[arg(long)]
        body: Option<String>,

        /// Override the request deadline, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Search every content category at once.
    Search {
        /// The search query string.
        query: String,

        /// Comma-separated categories to include (default: all).
        #[arg(long, value_delimiter = ',')]
        only: Vec<Category>,

        /// Print the raw envelope as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show search suggestions for a partial query.
    Suggest {
        query: String,
    },

    /// Manage the offline search cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Store a bearer token for subsequent requests.
    Login {
        token: String,
    },

    /// Remove the stored bearer token.
    Logout,

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Download every cacheable resource into `search.cache_dir`.
    Refresh,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_session(cfg: &Config) -> Arc<FileSession> {
    Arc::new(FileSession::new(cfg.session.resolved_token_path()).with_unauthorized_hook(
        Arc::new(|| eprintln!("Session expired. Run `alink login <token>` to sign in again.")),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "alink", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let session = open_session(&cfg);
    let dispatcher = Arc::new(Dispatcher::from_config(&cfg, session.clone())?);

    match cli.command {
        Commands::Candidates => {
            for (i, label) in dispatcher.candidate_labels().iter().enumerate() {
                println!("{}. {}", i + 1, label);
            }
        }
        Commands::Health { json } => {
            let prober = HealthProber::from_config(dispatcher, &cfg);
            let verdict = prober.check_backend_health().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else if verdict.is_connected() {
                println!(
                    "connected: {} answered HTTP {}",
                    verdict.responding_endpoint.as_deref().unwrap_or("?"),
                    verdict.http_status.unwrap_or_default()
                );
            } else {
                println!(
                    "disconnected: {}",
                    verdict.diagnostic.as_deref().unwrap_or("no endpoint reachable")
                );
            }
            if !verdict.is_connected() {
                std::process::exit(1);
            }
        }
        Commands::Wake => {
            let prober = HealthProber::from_config(dispatcher, &cfg);
            let outcome = prober.wake_up_backend().await;
            println!("{}", outcome.message);
            if !outcome.success {
                std::process::exit(1);
            }
        }
        Commands::Watch { interval, count } => {
            let prober = Arc::new(HealthProber::from_config(dispatcher, &cfg));
            let mut monitor = prober.spawn_monitor(Duration::from_secs(interval))?;
            let mut seen = 0usize;
            while let Some(verdict) = monitor.changed().await {
                println!("{}", serde_json::to_string(&verdict)?);
                seen += 1;
                if count.is_some_and(|c| seen >= c) {
                    break;
                }
            }
            monitor.stop();
        }
        Commands::Request {
            method,
            path,
            body,
            timeout_ms,
        } => {
            run_request(&dispatcher, &method, &path, body, timeout_ms).await?;
        }
        Commands::Search { query, only, json } => {
            let aggregator = SearchAggregator::from_config(&cfg, dispatcher)?;
            let options = if only.is_empty() {
                SearchOptions::default()
            } else {
                SearchOptions::only(&only)
            };
            let envelope = aggregator.search_all(&query, &options).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
                return Ok(());
            }
            if envelope.categories.is_empty() {
                println!("No results.");
                return Ok(());
            }
            println!("{} results for \"{}\"", envelope.total_results, envelope.query);
            for (category, result) in &envelope.categories {
                println!();
                match &result.error {
                    Some(err) => println!("{}: unavailable ({})", category, err),
                    None => println!("{} ({})", category, result.count),
                }
                for item in &result.items {
                    println!("  - {} [{}]", item.title, item.id);
                    println!("    excerpt: \"{}\"", item.snippet.replace('\n', " ").trim());
                    if let Some(url) = &item.url {
                        println!("    url: {}", url);
                    }
                }
            }
        }
        Commands::Suggest { query } => {
            let aggregator = SearchAggregator::from_config(&cfg, dispatcher)?;
            for s in aggregator.get_search_suggestions(&query).await {
                println!("{}", s);
            }
        }
        Commands::Cache { action } => match action {
            CacheAction::Refresh => refresh_cache(&cfg, dispatcher).await?,
        },
        Commands::Login { token } => {
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }
            session.set_token(&token)?;
            println!("Token stored at {}", session.path().display());
        }
        Commands::Logout => {
            session.clear_token();
            println!("Logged out.");
        }
        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

async fn run_request(
    dispatcher: &Dispatcher,
    method: &str,
    path: &str,
    body: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let method: Method = method.parse()?;
    let mut spec = RequestSpec::new(method, path);
    if let Some(raw) = body {
        let parsed = serde_json::from_str(&raw).with_context(|| "--body is not valid JSON")?;
        spec = spec.with_body(parsed);
    }
    if let Some(ms) = timeout_ms {
        spec = spec.with_timeout(Duration::from_millis(ms));
    }

    match dispatcher.smart_request(&spec).await {
        Ok(resp) => {
            eprintln!("HTTP {} via {}", resp.status, resp.served_by);
            println!("{}", serde_json::to_string_pretty(&resp.body)?);
            Ok(())
        }
        Err(ClientError::BackendUnavailable { attempts }) => {
            eprintln!("Backend unavailable. Attempts:");
            for a in &attempts {
                eprintln!("  {}", a);
            }
            bail!("all {} candidates failed", attempts.len())
        }
        Err(e) => bail!("{} ({})", e.user_message(), e.code()),
    }
}

async fn refresh_cache(cfg: &Config, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let dir = cfg
        .search
        .cache_dir
        .as_ref()
        .context("search.cache_dir is not set in config")?;
    let cache = OfflineCache::new(dir);

    let mut failed = 0usize;
    for resource in Resource::ALL {
        let Some(category) = resource.search_category() else {
            continue;
        };
        let client = ResourceClient::new(dispatcher.clone(), resource);
        match client.list().await {
            Ok(records) => {
                cache.store(category, &records)?;
                println!("{:<12} {} records", category, records.len());
            }
            Err(e) => {
                failed += 1;
                println!("{:<12} FAILED: {}", category, e.user_message());
            }
        }
    }

    if failed > 0 {
        bail!("{} resources could not be cached", failed);
    }
    Ok(())
}
