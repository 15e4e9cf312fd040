//! Bruteguard Server entry point.

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bruteguard_server::Server;
use bruteguard_server::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let server = Server::open(&config).await?;
    let service = config.service_config();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        persistent = server.persistent(),
        admin_auth = server.state.has_auth(),
        login_limit = service.login.limit,
        password_limit = service.password.limit,
        ip_limit = service.address.limit,
        "Bruteguard starting",
    );

    let shutdown = CancellationToken::new();
    let sweepers = server.state.start_sweepers(&shutdown);

    let app = bruteguard_http::router(server.state.clone());

    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Bruteguard ready");

    let result = bruteguard_http::serve(listener, app, shutdown_signal()).await;

    shutdown.cancel();
    for sweeper in sweepers {
        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "sweeper task failed");
        }
    }
    server.close().await;

    tracing::info!("Bruteguard shut down");
    result.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
