use anyhow::{anyhow, Context, Result};
use axum::{response::Json, routing::get, Router};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use url::Url;

use loans::config::LoansConfig;
use loans::Loans;

mod request_id;
mod shutdown;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "loans";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_LIMIT: usize = 1024 * 1024;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
/// - Adds `mode=rwc` so a missing database file is created.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    match query {
        Some(q) if q.contains("mode=") => {
            out.push('?');
            out.push_str(q);
        }
        Some(q) => {
            out.push('?');
            out.push_str(q);
            out.push_str("&mode=rwc");
        }
        None => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

/// Equiploan Server - equipment loan requests for teachers and technicians
#[derive(Parser)]
#[command(name = "equiploan-server")]
#[command(about = "Equiploan Server - equipment loan requests for teachers and technicians")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database (data is lost on exit)
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Equiploan Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config).await,
    }
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(dsn: &str) -> Result<&'static str> {
    let raw = dsn.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    if raw.eq_ignore_ascii_case("sqlite::memory:") {
        return Ok("sqlite");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" | "sqlite3" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// The DSN actually connected to, and its backend. `--mock` replaces the
/// configured URL entirely.
fn resolve_dsn(
    db_config: &DatabaseConfig,
    base_dir: &Path,
    mock: bool,
) -> Result<(String, &'static str)> {
    let mut dsn = if mock {
        "sqlite::memory:".to_string()
    } else {
        db_config.url.trim().to_owned()
    };
    let backend = detect_from_dsn(&dsn)?;
    if dsn.starts_with("sqlite://") {
        dsn = absolutize_sqlite_dsn(&dsn, base_dir, true)?;
    }
    Ok((dsn, backend))
}

fn database_config(config: &AppConfig) -> DatabaseConfig {
    config.database.clone().unwrap_or_else(|| DatabaseConfig {
        url: "sqlite://database/equiploan.db".to_string(),
        max_conns: None,
        busy_timeout_ms: None,
    })
}

async fn connect(
    db_config: &DatabaseConfig,
    base_dir: &Path,
    mock: bool,
) -> Result<DatabaseConnection> {
    let (dsn, backend) = resolve_dsn(db_config, base_dir, mock)?;
    let in_memory = dsn == "sqlite::memory:";

    let mut opts = ConnectOptions::new(dsn.clone());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    if in_memory {
        // one connection, never recycled: it *is* the database
        opts.max_connections(1)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(u32::MAX as u64))
            .max_lifetime(Duration::from_secs(u32::MAX as u64));
    } else {
        opts.max_connections(db_config.max_conns.unwrap_or(10));
    }

    if backend == "sqlite" {
        let busy = Duration::from_millis(db_config.busy_timeout_ms.unwrap_or(5000) as u64);
        opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(busy));
    }

    tracing::info!("Connecting to database: {}", dsn);
    let db = Database::connect(opts)
        .await
        .with_context(|| format!("Failed to connect to {dsn}"))?;
    tracing::info!("Connected DB backend: {}", backend);
    Ok(db)
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Assemble the HTTP surface: health probe, loans routes and the request
/// middleware stack (outermost first).
fn build_router(loans: &Loans, timeout: Duration) -> Router {
    let router = loans.register_rest(Router::new().route("/health", get(health_check)));
    let x_request_id = request_id::header();

    // The body limit is applied as its own innermost layer so axum erases its
    // response body type before `TimeoutLayer` (which needs `Default`) wraps it.
    router.layer(RequestBodyLimitLayer::new(BODY_LIMIT)).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                x_request_id.clone(),
                request_id::MakeReqId,
            ))
            .layer(PropagateRequestIdLayer::new(x_request_id))
            .layer(request_id::create_trace_layer())
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    let base_dir = PathBuf::from(&config.server.home_dir);
    let db = connect(&database_config(&config), &base_dir, args.mock).await?;

    let loans_cfg: LoansConfig = config.module_config(MODULE_NAME)?;
    let loans = Loans::init(db, loans_cfg).await?;

    let timeout = match config.server.timeout_sec {
        0 => DEFAULT_TIMEOUT,
        secs => Duration::from_secs(secs),
    };
    let router = build_router(&loans, timeout);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Equiploan Server stopped");
    Ok(())
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    detect_from_dsn(&database_config(&config).url)?;
    let _: LoansConfig = config.module_config(MODULE_NAME)?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sqlite_paths_land_under_home() {
        let tmp = tempfile::tempdir().unwrap();
        let dsn = absolutize_sqlite_dsn("sqlite://database/equiploan.db", tmp.path(), true).unwrap();
        let expected = tmp.path().join("database/equiploan.db");
        assert_eq!(
            dsn,
            format!("sqlite://{}?mode=rwc", expected.to_string_lossy().replace('\\', "/"))
        );
        assert!(tmp.path().join("database").is_dir());
    }

    #[test]
    fn explicit_mode_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let dsn = absolutize_sqlite_dsn("sqlite://x.db?mode=ro", tmp.path(), false).unwrap();
        assert!(dsn.ends_with("x.db?mode=ro"));
        let dsn = absolutize_sqlite_dsn("sqlite://x.db?cache=shared", tmp.path(), false).unwrap();
        assert!(dsn.ends_with("x.db?cache=shared&mode=rwc"));
    }

    #[test]
    fn memory_dsn_is_untouched() {
        let base = Path::new("/nowhere");
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://:memory:", base, false).unwrap(),
            "sqlite::memory:"
        );
        assert!(absolutize_sqlite_dsn("postgres://x", base, false).is_err());
    }

    #[test]
    fn backend_detection() {
        assert_eq!(detect_from_dsn("sqlite://a.db").unwrap(), "sqlite");
        assert_eq!(detect_from_dsn("sqlite::memory:").unwrap(), "sqlite");
        assert_eq!(detect_from_dsn("postgres://u:p@h/db").unwrap(), "postgres");
        assert!(detect_from_dsn("mysql://h/db").is_err());
        assert!(detect_from_dsn("  ").is_err());
    }

    #[test]
    fn mock_overrides_configured_backend() {
        let cfg = DatabaseConfig {
            url: "postgres://u:p@h/db".to_string(),
            max_conns: None,
            busy_timeout_ms: None,
        };
        let base = Path::new("/nowhere");

        let (dsn, backend) = resolve_dsn(&cfg, base, true).unwrap();
        assert_eq!(dsn, "sqlite::memory:");
        assert_eq!(backend, "sqlite");

        let (dsn, backend) = resolve_dsn(&cfg, base, false).unwrap();
        assert_eq!(dsn, "postgres://u:p@h/db");
        assert_eq!(backend, "postgres");
    }
}
