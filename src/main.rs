use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screen_replay::{
    create_router, AppState, CaptureController, DeviceProbe, FfmpegBackend, JsonCatalog,
    RecordingCatalog, Settings,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "screen-replay")]
#[command(about = "Screen recorder with a rolling replay buffer")]
struct Cli {
    /// Settings file (extension optional)
    #[arg(short, long, default_value = "config/screen-replay")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the encoder and audio device that would be used
    Probe,

    /// Record continuously until the duration elapses or Ctrl+C
    Record {
        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Keep a replay buffer, saving it when the duration elapses or on Ctrl+C
    Buffer {
        /// Save after this many seconds
        #[arg(short, long)]
        seconds: Option<u64>,
    },

    /// Run the HTTP control API
    Serve,

    /// List catalogued recordings
    List,

    /// Remove a recording from the catalog
    Delete {
        /// Catalog id, as shown by `list`
        id: String,

        /// Also delete the file from disk
        #[arg(long)]
        delete_file: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let settings = Settings::load(&cli.config)?;

    info!("Screen Replay v{}", env!("CARGO_PKG_VERSION"));
    info!("Output directory: {}", settings.output_dir.display());

    let backend = Arc::new(FfmpegBackend::new(&settings.ffmpeg_path));
    let catalog: Arc<dyn RecordingCatalog> = Arc::new(JsonCatalog::new(settings.catalog_path()));

    match cli.command {
        Command::Probe => {
            let capabilities = DeviceProbe::new(backend.as_ref()).probe().await;
            println!("encoder:      {}", capabilities.encoder);
            println!(
                "audio device: {}",
                capabilities.audio_device.as_deref().unwrap_or("none (video only)")
            );
        }
        Command::Record { seconds } => {
            let mut controller =
                CaptureController::new(backend, Arc::clone(&catalog), settings).await;

            controller.start_fulltime().await?;
            info!("Recording... press Ctrl+C to stop");
            wait_for_stop(seconds).await;

            match controller.stop_fulltime().await {
                Some(path) => println!("{}", path.display()),
                None => warn!("Recording produced no file"),
            }
        }
        Command::Buffer { seconds } => {
            let mut controller =
                CaptureController::new(backend, Arc::clone(&catalog), settings).await;

            controller.start_buffer().await?;
            info!("Buffering... press Ctrl+C to save the replay");
            wait_for_stop(seconds).await;

            let path = controller.save_buffer().await?;
            println!("{}", path.display());
        }
        Command::Serve => {
            let addr = format!("{}:{}", settings.http.bind, settings.http.port);
            let controller =
                CaptureController::new(backend, Arc::clone(&catalog), settings).await;
            let state = AppState::new(controller, catalog);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("HTTP API listening on {}", addr);

            axum::serve(listener, create_router(state.clone()))
                .with_graceful_shutdown(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                    }
                })
                .await
                .context("HTTP server failed")?;

            info!("Shutting down capture controller...");
            state.controller.lock().await.shutdown().await;
        }
        Command::List => {
            for entry in catalog.list().await? {
                println!(
                    "{}  {}  {:<8}  {:>12}  {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.kind,
                    entry.size_bytes,
                    entry.path.display()
                );
            }
        }
        Command::Delete { id, delete_file } => {
            if !catalog.delete(&id, delete_file).await? {
                anyhow::bail!("No recording with id {}", id);
            }
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

/// Resolve after `seconds` (if given) or on Ctrl+C, whichever comes first
async fn wait_for_stop(seconds: Option<u64>) {
    let timer = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = timer => info!("Duration elapsed"),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    }
}
