//! Command-line client for the photosync image server.

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use photosync_client::{ClientError, HttpImageServer, ImageServer, PhotoQueue, PollTarget};
use photosync_core::config::normalize_server;
use photosync_core::models::{
    validate_watermark_name, AspectRatio, BatchOutcome, CropAnchor, DirListing, EditControls,
    ExportFormat, ExportOptions, FolderStatus, ProcessJob, ProcessMode, ScanResult,
    WatermarkPosition,
};
use photosync_core::{DEFAULT_EXPORT_QUALITY, DEFAULT_SERVER_URL};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "photosyncctl", about = "photosync image server CLI", version)]
struct Cli {
    /// Server URL (can also be set via PHOTOSYNC_SERVER env var)
    #[arg(short, long, env = "PHOTOSYNC_SERVER")]
    server: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Print timing for API requests
    #[arg(long, global = true)]
    timing: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// List subdirectories on the server host (empty path lists roots)
    Dirs {
        #[arg(default_value = "")]
        path: String,
    },
    /// Scan a folder and make it the server's active folder
    Scan { folder: String },
    /// Ask for the active folder's change fingerprint
    Check {
        /// Name the folder instead of relying on the server's active one
        #[arg(long)]
        folder: Option<String>,
    },
    /// Make a file the server's current file
    Select { filename: String },
    /// Render the current file with the given edits
    Preview {
        /// Where to write the rendered image
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        edits: EditArgs,
    },
    /// Export a whole folder (or its current file)
    Batch {
        /// Input folder; scanned first so the server works on it
        #[arg(short, long)]
        input: String,
        /// Output folder on the server host
        #[arg(short, long)]
        output: String,
        #[arg(long, default_value = "all")]
        mode: ProcessMode,
        #[arg(long, default_value = "JPEG")]
        format: ExportFormat,
        #[arg(long, default_value_t = DEFAULT_EXPORT_QUALITY)]
        quality: u8,
        /// Downscale to this width; 0 keeps the original size
        #[arg(long, default_value_t = 0)]
        resize: u32,
        /// Remove source files after a successful export
        #[arg(long)]
        delete_source: bool,
        #[command(flatten)]
        edits: EditArgs,
    },
    /// List the server's watermark images
    Watermarks,
    /// Add an image to the server's watermark library
    WatermarkUpload {
        /// Image file; saved on the server under its file name
        file: PathBuf,
    },
    /// Choose the server photobooth uploads are forwarded to
    Target {
        /// Host or host:port of the receiving server
        target: String,
    },
    /// Upload image files as photobooth captures
    Upload {
        /// Receiving server, selected before the upload
        #[arg(long, env = "PHOTOSYNC_UPLOAD_TARGET")]
        target: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Edit parameters shared by `preview` and `batch`.
#[derive(Args, Default)]
struct EditArgs {
    /// Slider value as key=value (repeatable), e.g. --set exposure=0.4
    #[arg(long = "set", value_parser = parse_assignment)]
    sliders: Vec<(String, f64)>,
    /// Watermark position (nw, n, ne, w, c, e, sw, s, se)
    #[arg(long)]
    position: Option<WatermarkPosition>,
    /// Watermark file name as known to the server
    #[arg(long)]
    watermark: Option<String>,
    /// Quarter-turn rotation in degrees (multiple of 90)
    #[arg(long, allow_hyphen_values = true)]
    rotate: Option<i32>,
    /// Aspect ratio such as 4:5, or "original"
    #[arg(long)]
    aspect: Option<AspectRatio>,
    /// Crop anchor as x,y percentages
    #[arg(long, value_parser = parse_anchor)]
    anchor: Option<CropAnchor>,
    /// Convert to black and white
    #[arg(long)]
    bw: bool,
}

impl EditArgs {
    fn controls(&self) -> Result<EditControls, photosync_core::AppError> {
        let mut controls = EditControls::default();
        for (key, value) in &self.sliders {
            controls.set_slider(key, *value)?;
        }
        if let Some(position) = self.position {
            controls.set_position(position);
        }
        controls.set_watermark(self.watermark.as_deref());
        if let Some(degrees) = self.rotate {
            controls.rotate90(degrees)?;
        }
        if let Some(aspect) = self.aspect {
            controls.set_aspect_ratio(aspect);
        }
        if let Some(anchor) = self.anchor {
            controls.set_crop_anchor(anchor);
        }
        controls.set_flag("bw", self.bw)?;
        Ok(controls)
    }
}

fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing slider name in '{}'", raw));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((key.to_string(), value))
}

fn parse_anchor(raw: &str) -> Result<CropAnchor, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got '{}'", raw))?;
    let x: f64 = x.trim().parse().map_err(|_| format!("bad x in '{}'", raw))?;
    let y: f64 = y.trim().parse().map_err(|_| format!("bad y in '{}'", raw))?;
    Ok(CropAnchor::new(x, y))
}

fn log_timing(timing: bool, label: &str, duration: Duration) {
    if timing {
        eprintln!(
            "[timing] {}: {:.1} ms",
            label,
            duration.as_secs_f64() * 1000.0
        );
    }
}

fn resolve_server(server: Option<String>) -> String {
    let explicit = server.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    });
    normalize_server(explicit.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()))
}

fn or_exit<T>(result: Result<T, ClientError>, action: &str) -> T {
    let err = match result {
        Ok(value) => return value,
        Err(err) => err,
    };
    match err {
        // These already name the action.
        ClientError::Server { .. } | ClientError::Rejected { .. } => eprintln!("{}", err),
        other => eprintln!("{} failed: {}", action, other),
    }
    std::process::exit(1);
}

fn encode_json(value: &serde_json::Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("response encoding error: {}", err))
}

fn format_scan_output(scan: &ScanResult, json: bool) -> Result<String, String> {
    let current = scan.current_hint.as_ref().map(|entry| entry.name());
    if json {
        let files: Vec<&str> = scan.files.iter().map(|entry| entry.name()).collect();
        return encode_json(&serde_json::json!({
            "files": files,
            "current_file": current,
        }));
    }

    let rows: Vec<String> = scan
        .files
        .iter()
        .map(|entry| {
            let marker = if Some(entry.name()) == current { "*" } else { " " };
            format!("{} {}", marker, entry.name())
        })
        .collect();
    Ok(rows.join("\n"))
}

fn format_dirs_output(listing: &DirListing, base: &str, json: bool) -> Result<String, String> {
    if json {
        return encode_json(&serde_json::json!({
            "parent": listing.parent,
            "items": listing.items,
            "current": listing.current,
        }));
    }

    let mut rows = Vec::with_capacity(listing.items.len() + 1);
    if listing.has_parent() {
        rows.push(format!(".. -> {}", listing.parent));
    }
    for item in &listing.items {
        rows.push(DirListing::child_path(base, item));
    }
    Ok(rows.join("\n"))
}

fn format_check_output(status: &FolderStatus, json: bool) -> Result<String, String> {
    let fingerprint = status.fingerprint.as_ref().map(|token| token.as_str());
    if json {
        return encode_json(&serde_json::json!({
            "hash": fingerprint,
            "changed": status.changed,
            "files": status.snapshot.as_ref().map(|scan| scan.files.len()),
        }));
    }
    Ok(format!(
        "fingerprint: {}\nchanged: {}",
        fingerprint.unwrap_or("-"),
        status.changed
    ))
}

fn format_batch_output(outcome: &BatchOutcome, json: bool) -> Result<String, String> {
    if json {
        return encode_json(&serde_json::json!({
            "processed": outcome.processed,
            "errors": outcome.errors,
        }));
    }
    Ok(format!("Batch complete: {}", outcome))
}

fn format_watermarks_output(names: &[String], json: bool) -> Result<String, String> {
    if json {
        return encode_json(&serde_json::json!(names));
    }
    if names.is_empty() {
        return Ok("No watermarks".to_string());
    }
    Ok(names.join("\n"))
}

fn print_or_exit(output: Result<String, String>, action: &str) {
    match output {
        Ok(output) if output.is_empty() => {}
        Ok(output) => println!("{}", output),
        Err(message) => {
            eprintln!("{} failed: {}", action, message);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        server,
        json,
        timing,
        timeout,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let server = resolve_server(server);
    let client = HttpImageServer::new(&server, Duration::from_secs(timeout))
        .with_context(|| format!("cannot use server '{}'", server))?;

    match command {
        Commands::Completions { .. } => unreachable!("completions handled before client setup"),
        Commands::Dirs { path } => {
            let start = Instant::now();
            let listing = or_exit(client.list_dirs(&path).await, "Dirs");
            log_timing(timing, "dirs", start.elapsed());
            print_or_exit(format_dirs_output(&listing, &path, json), "Dirs");
        }
        Commands::Scan { folder } => {
            let start = Instant::now();
            let scan = or_exit(client.scan_folder(&folder).await, "Scan");
            log_timing(timing, "scan", start.elapsed());
            print_or_exit(format_scan_output(&scan, json), "Scan");
        }
        Commands::Check { folder } => {
            let target = folder.map_or(PollTarget::ServerContext, PollTarget::Folder);
            let start = Instant::now();
            let status = or_exit(client.check_updates(&target).await, "Check");
            log_timing(timing, "check", start.elapsed());
            print_or_exit(format_check_output(&status, json), "Check");
        }
        Commands::Select { filename } => {
            let start = Instant::now();
            or_exit(client.set_current(&filename).await, "Select");
            log_timing(timing, "select", start.elapsed());
            if json {
                println!("{}", serde_json::json!({ "current_file": filename }));
            } else {
                println!("Current file: {}", filename);
            }
        }
        Commands::Preview { output, edits } => {
            let config = edits.controls()?.build_config();
            let start = Instant::now();
            let bytes = or_exit(client.render_preview(&config).await, "Preview");
            log_timing(timing, "preview", start.elapsed());
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("cannot write {}", output.display()))?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "path": output.display().to_string(), "bytes": bytes.len() })
                );
            } else {
                println!("Wrote {} bytes to {}", bytes.len(), output.display());
            }
        }
        Commands::Batch {
            input,
            output,
            mode,
            format,
            quality,
            resize,
            delete_source,
            edits,
        } => {
            let job = ProcessJob {
                output_folder: output,
                config: edits.controls()?.build_config(),
                mode,
                delete_source,
                export: ExportOptions {
                    format,
                    quality,
                    resize_width: resize,
                },
            };
            job.validate(Some(input.as_str()))?;
            let start = Instant::now();
            or_exit(client.scan_folder(&input).await, "Batch");
            let outcome = or_exit(client.process_batch(&job).await, "Batch");
            log_timing(timing, "batch", start.elapsed());
            print_or_exit(format_batch_output(&outcome, json), "Batch");
        }
        Commands::Watermarks => {
            let start = Instant::now();
            let names = or_exit(client.list_watermarks().await, "Watermarks");
            log_timing(timing, "watermarks", start.elapsed());
            print_or_exit(format_watermarks_output(&names, json), "Watermarks");
        }
        Commands::WatermarkUpload { file } => {
            let name = file
                .file_name()
                .and_then(|name| name.to_str())
                .with_context(|| format!("no usable file name in {}", file.display()))?;
            let name = validate_watermark_name(name)?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let start = Instant::now();
            let saved = or_exit(
                client.upload_watermark(name, bytes).await,
                "Watermark upload",
            );
            log_timing(timing, "watermark upload", start.elapsed());
            if json {
                println!("{}", serde_json::json!({ "filename": saved }));
            } else {
                println!("Saved watermark {}", saved);
            }
        }
        Commands::Target { target } => {
            let mut queue = PhotoQueue::new();
            let start = Instant::now();
            let confirmed = or_exit(queue.select_target(&client, &target).await, "Set target")
                .to_string();
            log_timing(timing, "target", start.elapsed());
            if json {
                println!("{}", serde_json::json!({ "target": confirmed }));
            } else {
                println!("Upload target: {}", confirmed);
            }
        }
        Commands::Upload { target, files } => {
            let mut queue = PhotoQueue::new();
            for path in &files {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("cannot read {}", path.display()))?;
                queue.push(bytes);
            }
            let start = Instant::now();
            or_exit(queue.select_target(&client, &target).await, "Set target");
            let count = or_exit(queue.upload_all(&client).await, "Upload");
            log_timing(timing, "upload", start.elapsed());
            if json {
                println!("{}", serde_json::json!({ "count": count }));
            } else {
                println!("Uploaded {} photo(s)", count);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
