//! routecache - command-line front end for the delivery backend.
//!
//! Drivers pick their company, log in and list the day's packages. The
//! session and the company directory are cached between runs; when the
//! backend cannot supply packages the demo dataset is shown instead.

use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use routecache_core::api::{cancellable, ApiResult};
use routecache_core::clock::{Clock, SystemClock};
use routecache_core::models::{Credentials, DeliveryStatus, SelectedCompany, StatusUpdate};
use routecache_core::{
    load_companies, sign_in, AppState, BackendClient, CompanyDirectoryCache, Config, FileStore,
    KeyValueStore, SessionCache,
};

// ============================================================================
// Constants
// ============================================================================

const LOG_FILE_PREFIX: &str = "routecache.log";

const USAGE: &str = "\
Usage: routecache <command> [args]

Commands:
  companies [--refresh]                      List companies (cached for a day)
  select <code>                              Choose the company to log in under
  login [username]                           Log in under the selected company
  packages [YYYY-MM-DD]                      List packages (default: today)
  tour [YYYY-MM-DD]                          Show the mobile tour
  update-status <package-id> <status> [notes]
                                             Report entregado, fallido or en camino
  stats                                      Show tour statistics
  status                                     Show session and cache state
  logout                                     Forget the session";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=routecache_core=debug).
/// Logs also go to a daily file under `log_dir` when it can be created.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Everything a command needs, built once from the config.
struct Services {
    config: Config,
    client: BackendClient,
    sessions: SessionCache,
    companies: CompanyDirectoryCache,
}

impl Services {
    fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.storage_dir()?));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let client = BackendClient::with_clock(config.client_config(), clock.clone())
            .context("Failed to create backend client")?;
        let sessions = SessionCache::new(store.clone(), clock.clone());
        let companies =
            CompanyDirectoryCache::new(store, clock).with_ttl(config.company_cache_ttl());

        Ok(Self {
            config,
            client,
            sessions,
            companies,
        })
    }

    fn restore(&self) -> AppState {
        AppState::restore(&self.sessions, &self.companies, self.config.session_max_age_hours)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _guard = init_tracing(config.storage_dir().ok().as_deref());
    info!(base_url = %config.base_url, "routecache starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    let ctx = Services::new(config)?;
    match command.as_str() {
        "companies" => cmd_companies(&ctx, rest.iter().any(|a| a == "--refresh")).await,
        "select" => {
            let code = rest.first().ok_or_else(|| anyhow!("select needs a company code"))?;
            cmd_select(&ctx, code).await
        }
        "login" => cmd_login(ctx, rest.first().cloned()).await,
        "packages" => cmd_packages(&ctx, parse_date(rest.first())?).await,
        "tour" => cmd_tour(&ctx, parse_date(rest.first())?).await,
        "update-status" => cmd_update_status(&ctx, rest).await,
        "stats" => cmd_stats(&ctx).await,
        "status" => {
            cmd_status(&ctx);
            Ok(())
        }
        "logout" => {
            ctx.restore().sign_out(&ctx.sessions);
            println!("Logged out.");
            Ok(())
        }
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command {:?}\n\n{}", other, USAGE),
    }
}

/// Await a request, aborting it on Ctrl-C.
async fn interruptible<F, T>(request: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    let (request, handle) = cancellable(request);
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });
    let result = request.await;
    watcher.abort();
    result
}

fn parse_date(arg: Option<&String>) -> Result<Option<NaiveDate>> {
    arg.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date {:?} (expected YYYY-MM-DD)", s))
    })
    .transpose()
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_companies(ctx: &Services, refresh: bool) -> Result<()> {
    let load = interruptible(load_companies(&ctx.client, &ctx.companies, refresh)).await?;
    let selected = ctx.companies.load_selected_company();

    for company in &load.directory.companies {
        let marker = match selected {
            Some(ref s) if s.code == company.code => "*",
            _ => " ",
        };
        match company.description {
            Some(ref description) => {
                println!("{} {:<14} {} ({})", marker, company.code, company.name, description)
            }
            None => println!("{} {:<14} {}", marker, company.code, company.name),
        }
    }
    if load.from_cache {
        if let Some(age) = ctx.companies.directory_age() {
            println!("\n(cached {})", age);
        }
    }
    Ok(())
}

async fn cmd_select(ctx: &Services, code: &str) -> Result<()> {
    let load = interruptible(load_companies(&ctx.client, &ctx.companies, false)).await?;
    let company = load
        .directory
        .find(code)
        .ok_or_else(|| anyhow!("No company with code {:?}; run `routecache companies`", code))?;

    let mut state = ctx.restore();
    state.select_company(SelectedCompany::from(company), &ctx.companies);
    println!("Selected {} ({})", company.name, company.code);
    Ok(())
}

async fn cmd_login(mut ctx: Services, username: Option<String>) -> Result<()> {
    let state = ctx.restore();
    let company = state
        .selected_company
        .ok_or_else(|| anyhow!("No company selected; run `routecache select <code>` first"))?;

    let username = match username.or_else(|| ctx.config.last_username.clone()) {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    if username.is_empty() {
        bail!("Username required");
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password required");
    }

    let credentials = Credentials::new(username.clone(), password, company.code.clone());
    let identity = interruptible(sign_in(
        &ctx.client,
        &ctx.sessions,
        &credentials,
        Some(&company),
    ))
    .await?;

    ctx.config.last_username = Some(username);
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {} ({})", identity.full_username, company.name);
    Ok(())
}

fn require_session(state: &AppState) -> Result<()> {
    if !state.is_authenticated() {
        bail!("Not logged in (or session expired); run `routecache login`");
    }
    Ok(())
}

async fn cmd_packages(ctx: &Services, date: Option<NaiveDate>) -> Result<()> {
    let mut state = ctx.restore();
    require_session(&state)?;

    interruptible(state.refresh_packages(&ctx.client, date)).await?;

    if let Some(ref banner) = state.banner {
        println!("{}\n", banner);
    }
    if state.packages.is_empty() {
        println!("No packages.");
    }
    for package in &state.packages {
        println!(
            "{:<14} {:<10} {:<20} {}",
            package.tracking_number, package.status, package.recipient_name, package.address
        );
        if !package.instructions.is_empty() {
            println!("{:<14} {}", "", package.instructions);
        }
    }
    Ok(())
}

async fn cmd_tour(ctx: &Services, date: Option<NaiveDate>) -> Result<()> {
    let state = ctx.restore();
    require_session(&state)?;
    let session = state.session.as_ref().ok_or_else(|| anyhow!("Not logged in"))?;

    let date = date.unwrap_or_else(|| SystemClock.now().date_naive());
    let tour = interruptible(ctx.client.get_tour(&session.matricule, date)).await?;

    for package in &tour.packages {
        println!(
            "{:<10} {:<14} {:<10} {}",
            package.id, package.ref_colis, package.status, package.address
        );
    }
    if let Some(route) = tour.optimized_route {
        println!(
            "\nRoute: {:.1} km, about {} min",
            route.total_distance, route.estimated_minutes
        );
    }
    if let Some(stats) = tour.stats {
        println!(
            "Delivered {}/{} ({} pending)",
            stats.delivered_packages, stats.total_packages, stats.pending_packages
        );
    }
    Ok(())
}

async fn cmd_update_status(ctx: &Services, args: &[String]) -> Result<()> {
    let (Some(package_id), Some(status)) = (args.first(), args.get(1)) else {
        bail!("update-status needs a package id and a status");
    };
    let status = DeliveryStatus::parse(status)
        .ok_or_else(|| anyhow!("Unknown status {:?} (entregado, fallido, en camino)", status))?;

    let state = ctx.restore();
    require_session(&state)?;

    let mut update = StatusUpdate::new(package_id.clone(), status);
    if args.len() > 2 {
        update = update.with_notes(args[2..].join(" "));
    }

    let message = interruptible(ctx.client.update_package_status(&update)).await?;
    println!("{}: {}", package_id, message.as_deref().unwrap_or(status.as_str()));
    Ok(())
}

async fn cmd_stats(ctx: &Services) -> Result<()> {
    require_session(&ctx.restore())?;
    let stats = interruptible(ctx.client.get_mobile_stats()).await?;
    println!(
        "Total {}  Delivered {}  Pending {}",
        stats.total_packages, stats.delivered_packages, stats.pending_packages
    );
    Ok(())
}

fn cmd_status(ctx: &Services) {
    let state = ctx.restore();
    match state.session {
        Some(ref session) => println!("Logged in as {}", session.full_username),
        None => println!("Not logged in"),
    }
    match state.selected_company {
        Some(ref company) => println!("Company: {} ({})", company.name, company.code),
        None => println!("Company: none selected"),
    }

    let stats = ctx.companies.cache_stats();
    println!(
        "Company cache: {} ({} companies)",
        if stats.has_valid_cache { "valid" } else { "empty or expired" },
        stats.companies_count
    );
    if let Some(age) = ctx.companies.directory_age() {
        println!("Last update: {}", age);
    }
    println!("Backend: {} (fallback: {:?})", ctx.client.base_url(), ctx.client.fallback_policy());
}
