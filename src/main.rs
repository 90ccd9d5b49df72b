//! Quizwire binary entrypoint wiring the TCP game server, the HTTP/SSE
//! bridge, and the SQLite user store into one process.

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizwire::config::AppConfig;
use quizwire::dao::users::UserStore;
use quizwire::routes;
use quizwire::server::GameServer;
use quizwire::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();

    let users = UserStore::connect(&config.database_url)
        .await
        .context("connecting user store")?;

    // The authoritative game server runs in-process next to the bridge.
    let game_server = GameServer::new();
    {
        let server = game_server.clone();
        let tcp_addr = config.tcp_addr();
        tokio::spawn(async move {
            if let Err(err) = server.listen(&tcp_addr).await {
                error!(error = %err, "game server exited");
            }
        });
    }
    tokio::spawn(game_server.clone().run_sweeper());

    let state = AppState::new(config.clone(), users);
    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.http_addr();
    info!(%addr, "starting bridge HTTP server");

    let listener = TcpListener::bind(addr).await.context("binding bridge server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
