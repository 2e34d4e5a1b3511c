//! Admission API server.
//!
//! Serves the account, announcement, candidate and file endpoints over HTTP with a
//! Postgres-backed credential store, or fully in memory with `--in-memory`.

use admission::{
    announcements::AnnouncementManager,
    auth::{AuthManager, PasswordHasher, TokenIssuer},
    candidates::CandidateManager,
    db::{
        AnnouncementRepository, CandidateRepository, CodeRepository, Database,
        MemoryAnnouncementRepository, MemoryCandidateRepository, MemoryCodeRepository,
        MemoryRepartitionRepository, MemoryUserRepository, PgAnnouncementRepository,
        PgCandidateRepository, PgCodeRepository, PgRepartitionRepository, PgUserRepository,
        RepartitionRepository, UserRepository,
    },
    email::LogEmailSender,
    storage::LocalBlobStorage,
};
use admission_server::{
    api::{self, rate_limiter::KeyedRateLimiter},
    config::ServerConfig,
    logging, metrics,
};
use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;
use std::net::SocketAddr;
use std::sync::Arc;

const HELP: &str = "\
Run the admission API server

USAGE:
  admission_server [OPTIONS]

OPTIONS:
  --bind         IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url       URL       Database connection string  [default: env DATABASE_URL]
  --grant-admin  EMAIL     Grant Admin=Administrator to EMAIL and exit

FLAGS:
  --in-memory              Keep every store in memory (development only)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required, >= 32 chars)
  PASSWORD_PEPPER          Password hashing pepper (required, >= 16 chars)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    grant_admin: Option<String>,
    in_memory: bool,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn CodeRepository>,
    announcements: Arc<dyn AnnouncementRepository>,
    candidates: Arc<dyn CandidateRepository>,
    repartitions: Arc<dyn RepartitionRepository>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        grant_admin: pargs.opt_value_from_str("--grant-admin")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    let repositories = if args.in_memory {
        info!("Using in-memory stores; nothing survives a restart");
        Repositories {
            users: Arc::new(MemoryUserRepository::new()),
            codes: Arc::new(MemoryCodeRepository::new()),
            announcements: Arc::new(MemoryAnnouncementRepository::new()),
            candidates: Arc::new(MemoryCandidateRepository::new()),
            repartitions: Arc::new(MemoryRepartitionRepository::new()),
        }
    } else {
        info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to apply migrations")?;
        info!("Database connected successfully");

        let pool = db.pool().clone();
        Repositories {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            codes: Arc::new(PgCodeRepository::new(pool.clone())),
            announcements: Arc::new(PgAnnouncementRepository::new(pool.clone())),
            candidates: Arc::new(PgCandidateRepository::new(pool.clone())),
            repartitions: Arc::new(PgRepartitionRepository::new(pool)),
        }
    };

    let tokens = TokenIssuer::new(&config.jwt_settings())?;
    let auth_manager = Arc::new(AuthManager::new(
        repositories.users,
        repositories.codes,
        Arc::new(LogEmailSender),
        tokens,
        PasswordHasher::new(config.security.password_pepper.clone()),
        config.auth_settings(),
    ));

    if let Some(email) = args.grant_admin {
        let user = auth_manager
            .grant_admin(&email)
            .await
            .with_context(|| format!("Failed to grant Admin to {email}"))?;
        info!("Granted Admin=Administrator to {} ({})", user.email, user.id);
        return Ok(());
    }

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(Error::msg)?;
        info!("Prometheus metrics exposed at http://{}/metrics", metrics_bind);
    }

    let api_state = api::AppState {
        auth_manager,
        announcements: Arc::new(AnnouncementManager::new(repositories.announcements)),
        candidates: Arc::new(CandidateManager::new(
            repositories.candidates,
            repositories.repartitions,
        )),
        blobs: Arc::new(LocalBlobStorage::new(config.blob_storage_dir.clone())),
        rate_limiter: Arc::new(KeyedRateLimiter::new(
            config.rate_limit.max_attempts,
            config.rate_limit_window(),
        )),
        post_confirmation_url: config.accounts.post_confirmation_url.clone(),
    };

    let app = api::create_router(api_state);

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
