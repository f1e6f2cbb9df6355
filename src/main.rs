use std::error::Error;

use dotenvy::dotenv;
use seating_api::config::Config;
use seating_api::{build_pool, router, run_migrations, AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
        dotenv().ok();

        tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                .init();

        let config = Config::from_env()?;
        let pool = build_pool(&config)?;
        run_migrations(&pool)?;

        let address = format!("{}:{}", config.host, config.port);
        let app = router(AppState::new(config, pool));

        let listener = TcpListener::bind(&address).await?;
        info!("listening on {address}");

        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

        info!("server stopped");
        Ok(())
}

async fn shutdown_signal() {
        let ctrl_c = async {
                if let Err(err) = signal::ctrl_c().await {
                        error!("failed to listen for ctrl-c: {err}");
                        std::future::pending::<()>().await;
                }
        };

        #[cfg(unix)]
        let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(mut stream) => {
                                stream.recv().await;
                        }
                        Err(err) => {
                                error!("failed to install terminate handler: {err}");
                                std::future::pending::<()>().await;
                        }
                }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
                _ = ctrl_c => {},
                _ = terminate => {},
        }

        info!("shutting down");
}
