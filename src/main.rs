use occupancy_dashboard::{
    clock::SystemClock, router, timer::TokioTimer, AppState, Config, Dashboard,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    let port = config.port;
    let dashboard = Dashboard::create(config, Arc::new(TokioTimer::new()), Arc::new(SystemClock))?;

    let poller = dashboard.clone();
    tokio::spawn(async move { poller.start().await });

    let app = router(AppState::new(dashboard.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    dashboard.dispose().await;
    Ok(())
}
