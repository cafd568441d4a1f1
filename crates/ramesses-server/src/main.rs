use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use ramesses_core::{Config, Forwarder, LogSink, Queue, RocksDbStorage, SystemClock};
use ramesses_server::{create_router, AppState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ramesses-server", about = "Durable local queue with an HTTP front door")]
struct Args {
    /// Config file; defaults to ramesses.toml, then /etc/ramesses/ramesses.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `storage.data_dir`
    #[arg(long, env = "RAMESSES_DATA_DIR")]
    data_dir: Option<String>,
}

fn load_config(explicit: Option<&Path>) -> Config {
    let candidates: Vec<&Path> = match explicit {
        Some(path) => vec![path],
        None => vec![
            Path::new("ramesses.toml"),
            Path::new("/etc/ramesses/ramesses.toml"),
        ],
    };

    for path in candidates {
        if !path.exists() {
            if explicit.is_some() {
                eprintln!("config file not found: {}", path.display());
                std::process::exit(1);
            }
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    return config;
                }
                Err(e) => {
                    eprintln!("error parsing {}: {e}", path.display());
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("error reading {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }

    info!("no config file found, using defaults");
    Config::default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ramesses_core::telemetry::init_tracing();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref());
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }

    let storage = Arc::new(RocksDbStorage::open(&config.storage.data_dir)?);
    let queue = Queue::open(storage, &config.storage.queue, Arc::new(SystemClock))?;
    info!(data_dir = %config.storage.data_dir, queue = %queue.name(), "queue opened");

    let forwarder = Forwarder::start(&queue, &config.forwarder, Box::new(LogSink))?;

    let app = create_router(AppState {
        queue,
        visibility_timeout: config.forwarder.visibility_timeout(),
    });

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, shutting down forwarder");
    forwarder.shutdown()?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to install CTRL+C handler");
    }

    info!("received shutdown signal");
}
