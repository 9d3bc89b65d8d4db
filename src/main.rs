use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use sluice::admission::AdmissionController;
use sluice::invoker::HttpInvoker;
use sluice::reconcile;
use sluice::server::{self, AppState};
use sluice::settings::AppConfig;
use sluice::store::QueueStore;
use sluice::trace;

#[derive(Parser, Debug)]
#[clap(version, about)]
/// Application CLI arguments
struct Args {
    /// whether to be verbose
    #[arg(short = 'v')]
    verbose: bool,

    /// path to a TOML config file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.verbose {
        println!("DEBUG {args:?}");
    }

    let cfg = AppConfig::load(args.config.as_deref())?;
    trace::init(cfg.log.format);

    let store = Arc::new(QueueStore::open(&cfg).await?);
    let invoker = Arc::new(HttpInvoker::new(cfg.downstream.endpoint.clone()));
    let controller = Arc::new(AdmissionController::new(Arc::clone(&store), invoker));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler = tokio::spawn(reconcile::run_scheduler(
        Arc::clone(&controller),
        Duration::from_secs(cfg.scheduler.interval_secs),
        cfg.scheduler.page_size,
        shutdown_rx,
    ));

    let addr: SocketAddr = cfg.server.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");

    let app = server::router(AppState {
        controller: Arc::clone(&controller),
        page_size: cfg.scheduler.page_size,
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = scheduler.await;
    store.close().await?;

    Ok(())
}
