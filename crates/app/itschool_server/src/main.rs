//! IT School API server binary.
//!
//! Reads configuration from the environment (and `.env`), migrates and seeds
//! the database, then serves the HTTP API until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use itschool_api::config::ApiConfig;
use itschool_api::{AppState, router};
use itschool_core::auth::AuthContext;
use itschool_core::auth::issuer::TokenIssuer;
use itschool_core::auth::password::BcryptHasher;
use itschool_core::clock::SystemClock;
use itschool_core::email::{EmailSender, LogEmailSender, SmtpEmailSender};
use itschool_core::seed::seed_roles_and_admin;
use itschool_core::store::postgres::PgStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// CLI arguments. Unset flags fall back to the environment.
#[derive(Parser, Debug)]
#[command(name = "itschool_server", about = "IT School backend API server")]
struct Args {
    /// Address to listen on, e.g. `0.0.0.0:8081`. Overrides `BIND_ADDR` / `PORT`.
    #[arg(long)]
    bind: Option<String>,

    /// PostgreSQL connection URL. Overrides `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Skip role and admin seeding.
    #[arg(long, default_value_t = false)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,itschool_api=debug,itschool_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    info!(?config, "starting itschool_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    itschool_api::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let ctx = AuthContext {
        users: store.clone(),
        sessions: store.clone(),
        roles: store,
        issuer: TokenIssuer::new(config.jwt_secret.as_deref()),
        hasher: Arc::new(BcryptHasher::default()),
        clock: Arc::new(SystemClock),
    };
    if !ctx.issuer.has_secret() {
        warn!("JWT_SECRET_KEY is not set; login and refresh will fail until it is");
    }

    if args.no_seed {
        info!("seeding skipped");
    } else {
        let report = seed_roles_and_admin(&ctx, &config.admin).await?;
        info!(
            roles_created = ?report.roles_created,
            admin_created = report.admin_created.is_some(),
            "seeding complete"
        );
    }

    let mailer: Arc<dyn EmailSender> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "using SMTP email transport");
            Arc::new(SmtpEmailSender::new(smtp)?)
        }
        None => {
            warn!("SMTP_HOST is not set; reset emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let app = router(AppState::new(ctx, mailer)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
