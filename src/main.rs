use clap::Parser;
use dotenvy::dotenv;
use profile_service::config::AppConfig;
use profile_service::infrastructure::{database, migrations, storage};
use profile_service::services::directory::HttpDirectoryClient;
use profile_service::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to run (serve, migrate, rollback)
    #[arg(short, long, default_value = "serve")]
    mode: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profile_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Profile Service [Mode: {}]...", args.mode);

    let config = AppConfig::from_env();
    info!(
        "🛡️  Config: Max Upload={}MB, Max Image Width={}px, Directory={}",
        config.max_upload_size / 1024 / 1024,
        config.max_image_width,
        config.directory_base_url
    );

    // 2. Database
    let db = database::setup_database(&config).await?;

    match args.mode.as_str() {
        "migrate" => {
            database::run_migrations(&db).await?;
            info!("👋 Migrations complete.");
            return Ok(());
        }
        "rollback" => {
            match migrations::rollback_last(&db).await? {
                Some(version) => info!("⏪ Rolled back migration {}", version),
                None => warn!("Nothing to roll back"),
            }
            return Ok(());
        }
        "serve" => database::run_migrations(&db).await?,
        other => anyhow::bail!("Unknown mode '{}', expected serve, migrate or rollback", other),
    }

    // 3. Collaborators
    let blob_store = storage::setup_storage(&config.user_images_path).await?;
    let directory = Arc::new(HttpDirectoryClient::new(
        &config.directory_base_url,
        Duration::from_secs(config.directory_timeout_secs),
    )?);

    let state = AppState::new(db, directory, blob_store, config);

    // 4. HTTP server
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
        return Err(e.into());
    }

    info!("👋 Profile service exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
