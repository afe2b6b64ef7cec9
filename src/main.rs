//! Headless workstation entrypoint: mirrors one folder and keeps its preview on disk.

use anyhow::Context;
use photosync::models::GalleryView;
use photosync::preview::PreviewImage;
use photosync::{Config, HttpImageServer, SyncEvent, Workstation};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    once: bool,
    stateless: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" => flags.help = true,
            "--once" => flags.once = true,
            "--stateless" => flags.stateless = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

/// One log line per UI-relevant event; `None` for events not worth logging.
fn describe_event(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::GalleryUpdated { state, view } => Some(match view {
            GalleryView::Empty => "Folder is empty; waiting for new shots".to_string(),
            GalleryView::NoSelection => {
                format!(
                    "{} file(s); edited file is gone, waiting for new shots",
                    state.len()
                )
            }
            GalleryView::Active => format!(
                "{} file(s); editing {}",
                state.len(),
                state.current().map(|entry| entry.name()).unwrap_or("-")
            ),
        }),
        SyncEvent::PreviewFailed { message } => Some(format!("Preview failed: {}", message)),
        SyncEvent::PollFailed { message } => Some(format!("Folder check failed: {}", message)),
        SyncEvent::ScanFailed { message } => Some(format!("Rescan failed: {}", message)),
        SyncEvent::BatchFinished { outcome } => Some(format!("Batch complete: {}", outcome)),
        SyncEvent::BatchFailed { message } => Some(format!("Batch failed: {}", message)),
        SyncEvent::PreviewReady { .. }
        | SyncEvent::PreviewCleared
        | SyncEvent::ControlsChanged { .. } => None,
    }
}

/// Replace `path` with the image, via a sibling temp file so readers never
/// see a partial write.
async fn write_preview(path: &Path, image: &PreviewImage) -> std::io::Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".part");
    let temp = PathBuf::from(temp);
    tokio::fs::write(&temp, &image.bytes).await?;
    tokio::fs::rename(&temp, path).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photosync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let flags = parse_cli_flags(&args)?;
    if flags.help {
        print_help();
        return Ok(());
    }

    let mut config = Config::from_env();
    config.stateless_poll |= flags.stateless;
    let folder = config
        .input_folder
        .clone()
        .context("PHOTOSYNC_INPUT_FOLDER is not set")?;
    let server = HttpImageServer::from_config(&config)?;
    tracing::info!("Using image server at {}", server.server());

    let mut workstation = Workstation::new(server, &config);
    let events = workstation.events().clone();
    let logger = std::thread::spawn(move || {
        for event in events.iter() {
            if let Some(line) = describe_event(&event) {
                tracing::info!("{}", line);
            }
        }
    });

    let state = workstation.open_folder(&folder).await?;
    tracing::info!("Monitoring {} ({} file(s))", folder, state.len());

    if flags.once {
        for entry in state.files() {
            println!("{}", entry);
        }
    } else {
        let preview_path = config.preview_path.clone().map(PathBuf::from);
        let mut images = workstation.preview().subscribe();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = images.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let image = images.borrow_and_update().clone();
                    if let (Some(image), Some(path)) = (image, preview_path.as_deref()) {
                        if let Err(err) = write_preview(path, &image).await {
                            tracing::warn!("Failed to write preview to {}: {}", path.display(), err);
                        }
                    }
                }
            }
        }
        tracing::info!("Shutting down");
    }

    workstation.shutdown().await;
    if logger.join().is_err() {
        tracing::warn!("Event logger thread panicked");
    }
    Ok(())
}

fn print_help() {
    println!("photosync headless workstation\n");
    println!("Usage: photosync [OPTIONS]\n");
    println!("Options:");
    println!("  --once            Scan the folder, print its files and exit");
    println!("  --stateless       Send the folder path with every change check");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!(
        "  PHOTOSYNC_SERVER        Image server URL (default: {})",
        photosync::constants::DEFAULT_SERVER_URL
    );
    println!("  PHOTOSYNC_INPUT_FOLDER  Folder to monitor (required)");
    println!("  PHOTOSYNC_PREVIEW_PATH  Where to keep the latest preview image");
    println!(
        "  POLL_INTERVAL_MS        Change check interval (default: {})",
        photosync::constants::DEFAULT_POLL_INTERVAL_MS
    );
    println!(
        "  PREVIEW_DEBOUNCE_MS     Preview debounce window (default: {})",
        photosync::constants::DEFAULT_PREVIEW_DEBOUNCE_MS
    );
    println!(
        "  REQUEST_TIMEOUT_SECS    Per-request timeout (default: {})",
        photosync::constants::DEFAULT_REQUEST_TIMEOUT_SECS
    );
    println!("  STATELESS_POLL          Same as --stateless");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
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
}
