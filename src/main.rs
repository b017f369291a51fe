//! Headless front end of the decoy camera: capture, browse and mirror photos.

mod config;
mod database;
mod error;
mod models;
mod services;

use clap::{Args, Parser, Subcommand, ValueEnum};
use config::{AppConfig, DEFAULT_CONFIG_PATH};
use error::AppError;
use photo_store::{
    AutoUploadOutcome, CapturePipeline, Folder, PageRequest, PaginationCursor, PhotoStore,
    QueryFilter, SensorSnapshot, SortOrder, SummaryKind,
};
use services::upload_service::UploadRun;
use services::{capture_service, hosts, settings_service, upload_service};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "decoy-camera")]
#[command(about = "Private photo store and capture pipeline of the decoy camera")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an image file as if the shutter had been pressed
    Capture {
        /// Image file (JPEG) to capture
        image: PathBuf,
        /// Note, also used as the folder name
        #[arg(long)]
        note: Option<String>,
        #[command(flatten)]
        sensors: SensorArgs,
        /// Skip auto-upload as if the device had no connection
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// List photos page by page
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Cursor token printed by the previous page
        #[arg(long)]
        cursor: Option<String>,
        /// Only photos in this folder
        #[arg(long, conflicts_with = "uncategorized")]
        folder: Option<String>,
        /// Only photos without a note
        #[arg(long, default_value_t = false)]
        uncategorized: bool,
        #[arg(long)]
        has_location: Option<bool>,
        #[arg(long)]
        has_note: Option<bool>,
    },
    /// Folder overview with counts
    Folders,
    /// Photo and upload counts
    Stats,
    /// Show one photo
    Show {
        id: String,
        /// Write the full image to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Change the note of a photo (moves it to another folder)
    Note {
        id: String,
        /// New note; omit to clear it
        note: Option<String>,
    },
    /// Delete one photo
    Delete { id: String },
    /// Delete every photo
    Clear {
        /// Confirm deleting all photos
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Previously used notes
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Enhancement and cloud settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Upload every photo that has no cloud copy yet
    Upload {
        /// Parallel uploads (defaults to the configured value)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[derive(Args)]
struct SensorArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    altitude: Option<f64>,
    #[arg(long)]
    accuracy: Option<f64>,
    #[arg(long)]
    heading: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    tilt: Option<f64>,
}

impl From<SensorArgs> for SensorSnapshot {
    fn from(args: SensorArgs) -> Self {
        SensorSnapshot {
            latitude: args.lat,
            longitude: args.lon,
            altitude: args.altitude,
            accuracy: args.accuracy,
            heading: args.heading,
            tilt: args.tilt,
        }
    }
}

#[derive(Subcommand)]
enum NotesCommands {
    /// Print the note history, newest first
    List,
    /// Forget every note
    Clear,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Print the stored settings
    Show,
    /// Change image enhancement
    Enhancement {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        sharpness: Option<u8>,
        #[arg(long)]
        denoise: Option<u8>,
        #[arg(long)]
        contrast: Option<u8>,
        /// Delay before processing a capture, in milliseconds
        #[arg(long)]
        stabilization_ms: Option<u64>,
    },
    /// Configure, validate and select an upload provider
    Provider {
        #[arg(default_value = hosts::FolderHost::ID)]
        id: String,
        /// Provider field as key=value, repeatable
        #[arg(long = "set", value_parser = parse_field)]
        fields: Vec<(String, serde_json::Value)>,
        #[arg(long)]
        auto_upload: Option<bool>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Newest => SortOrder::Newest,
            SortArg::Oldest => SortOrder::Oldest,
        }
    }
}

/// `key=value`; values that parse as JSON keep their type, anything else is a string.
fn parse_field(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(2);
        }
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    if let Err(e) = run(cli.command, &config, &cancel).await {
        log::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(
    command: Commands,
    config: &AppConfig,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    let store = database::open_store(config)?;
    let registry = hosts::default_registry();

    match command {
        Commands::Capture {
            image,
            note,
            sensors,
            offline,
        } => {
            let settings = settings_service::load_settings(&store).await?;
            let options = capture_service::capture_options(&settings, &registry, !offline);
            let pipeline = CapturePipeline::new(Arc::clone(&store));
            let outcome = capture_service::capture_file(
                &pipeline,
                &image,
                sensors.into(),
                note,
                options,
                cancel,
            )
            .await?;

            println!("Stored {}", outcome.record.id);
            if outcome.enhanced {
                println!("Enhanced");
            }
            match outcome.auto_upload {
                AutoUploadOutcome::Uploaded(cloud) => println!("Uploaded to {}", cloud.viewer_url),
                AutoUploadOutcome::Failed(e) => println!("Auto-upload failed: {}", e),
                AutoUploadOutcome::Cancelled => println!("Auto-upload cancelled"),
                AutoUploadOutcome::Skipped(reason) => {
                    log::debug!("Auto-upload skipped: {:?}", reason)
                }
            }
        }
        Commands::List {
            sort,
            limit,
            cursor,
            folder,
            uncategorized,
            has_location,
            has_note,
        } => {
            let folder = match (folder, uncategorized) {
                (Some(name), _) => Some(Folder::from_note(Some(&name))),
                (None, true) => Some(Folder::Uncategorized),
                (None, false) => None,
            };
            let cursor = cursor
                .as_deref()
                .map(PaginationCursor::from_token)
                .transpose()?;
            let request = PageRequest::new(sort.into(), limit)
                .after(cursor)
                .filter(QueryFilter {
                    folder,
                    has_location,
                    has_note,
                });

            let page = store.query_page(request).await?;
            for photo in &page.items {
                println!(
                    "{}  {}  {:<16} {}{}",
                    photo.id,
                    format_timestamp(photo.metadata.timestamp),
                    photo.folder().to_string(),
                    if photo.metadata.has_location() { "gps " } else { "" },
                    if photo.is_uploaded() { "cloud" } else { "" },
                );
            }
            println!(
                "{} shown, {} matching{}",
                page.items.len(),
                page.total_matching_count,
                if page.scan_ceiling_reached { " (scan limit reached)" } else { "" }
            );
            if let Some(next) = page.resume_cursor() {
                println!("Next page: --cursor {}", next.to_token());
            }
        }
        Commands::Folders => {
            for stats in store.folder_stats().await?.iter() {
                println!(
                    "{:<24} {:>5} photos  {:>5} uploaded  latest {}",
                    stats.folder.to_string(),
                    stats.count,
                    stats.uploaded_count,
                    format_timestamp(stats.latest_timestamp)
                );
            }
        }
        Commands::Stats => {
            let counts = store.photo_counts().await?;
            println!("{} photos, {} uploaded", counts.total, counts.cloud);
        }
        Commands::Show { id, export } => {
            let photo = store
                .get(&id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Photo {}", id)))?;
            println!("id:        {}", photo.id);
            println!("taken:     {}", format_timestamp(photo.metadata.timestamp));
            println!("folder:    {}", photo.folder());
            if let (Some(lat), Some(lon)) = (photo.metadata.latitude, photo.metadata.longitude) {
                println!("location:  {:.6}, {:.6}", lat, lon);
            }
            println!("size:      {} bytes", photo.image_data.len());
            if let Some(cloud) = &photo.cloud {
                println!("viewer:    {}", cloud.viewer_url);
                println!("uploaded:  {}", format_timestamp(cloud.uploaded_at));
                if let Some(expires_at) = cloud.expires_at {
                    println!("expires:   {}", format_timestamp(expires_at));
                }
            }
            if let Some(path) = export {
                tokio::fs::write(&path, &photo.image_data).await?;
                println!("Exported to {}", path.display());
            }
        }
        Commands::Note { id, note } => {
            let photo = store
                .update(&id, photo_store::PhotoPatch::note(note.clone()))
                .await?;
            if let Some(note) = note.as_deref() {
                if let Err(e) = store.save_note_to_history(note).await {
                    log::error!("Failed to save note to history: {}", e);
                }
            }
            println!("{} is now in {}", photo.id, photo.folder());
        }
        Commands::Delete { id } => {
            if !store.delete(&id).await? {
                return Err(AppError::NotFound(format!("Photo {}", id)));
            }
            println!("Deleted {}", id);
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err(AppError::Validation(
                    "Refusing to delete all photos without --yes".to_string(),
                ));
            }
            let count = store.count().await?;
            store.clear().await?;
            println!("Deleted {} photos", count);
        }
        Commands::Notes { command } => match command {
            NotesCommands::List => {
                for note in store.note_history().await? {
                    println!("{}", note);
                }
            }
            NotesCommands::Clear => {
                store.clear_note_history().await?;
                println!("Note history cleared");
            }
        },
        Commands::Settings { command } => settings(command, &store, &registry, cancel).await?,
        Commands::Upload { concurrency } => {
            let settings = settings_service::load_settings(&store).await?;
            let (progress, mut updates) = upload_service::upload_progress_channel();
            let printer = tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let (current, total) = *updates.borrow_and_update();
                    if total > 0 {
                        println!("{}/{}", current, total);
                    }
                }
            });

            let run = upload_service::upload_pending(
                &store,
                &registry,
                &settings,
                concurrency.unwrap_or(config.upload_concurrency),
                &progress,
                cancel,
            )
            .await;
            drop(progress);
            let _ = printer.await;

            match run? {
                UploadRun::NoProvider => {
                    return Err(AppError::Upload(
                        "No validated upload provider is selected".to_string(),
                    ))
                }
                UploadRun::AllUploaded => println!("All photos are already uploaded"),
                UploadRun::Finished(summary) => {
                    println!(
                        "{} uploaded, {} failed, {} cancelled",
                        summary.success_count, summary.error_count, summary.cancelled_count
                    );
                    for (id, error) in &summary.errors {
                        println!("  {}: {}", id, error);
                    }
                    if summary.kind() == SummaryKind::Error && summary.success_count == 0 {
                        return Err(AppError::Upload(format!(
                            "{} photos could not be uploaded",
                            summary.error_count
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

async fn settings(
    command: SettingsCommands,
    store: &PhotoStore,
    registry: &photo_store::HostRegistry,
    cancel: &CancellationToken,
) -> Result<(), AppError> {
    match command {
        SettingsCommands::Show => {
            let settings = settings_service::load_settings(store).await?;
            let text = serde_json::to_string_pretty(&settings)
                .map_err(|e| AppError::Validation(e.to_string()))?;
            println!("{}", text);
        }
        SettingsCommands::Enhancement {
            enabled,
            sharpness,
            denoise,
            contrast,
            stabilization_ms,
        } => {
            let current = settings_service::load_settings(store).await?;
            let mut enhancement = current.enhancement;
            if let Some(enabled) = enabled {
                enhancement.enabled = enabled;
            }
            if let Some(sharpness) = sharpness {
                enhancement.sharpness = sharpness;
            }
            if let Some(denoise) = denoise {
                enhancement.denoise = denoise;
            }
            if let Some(contrast) = contrast {
                enhancement.contrast = contrast;
            }
            let mut settings = settings_service::update_enhancement(store, enhancement).await?;
            if let Some(ms) = stabilization_ms {
                settings.stabilization_delay_ms = ms;
                settings_service::save_settings(store, &settings).await?;
            }
            println!("Enhancement settings saved");
        }
        SettingsCommands::Provider {
            id,
            fields,
            auto_upload,
        } => {
            let host = registry
                .get(&id)
                .ok_or_else(|| AppError::NotFound(format!("Upload provider '{}'", id)))?;
            let provider = settings_service::configure_provider(
                store,
                host.as_ref(),
                fields.into_iter().collect(),
                auto_upload,
                cancel,
            )
            .await?;
            println!(
                "{} validated, auto-upload {}",
                host.name(),
                if provider.auto_upload { "on" } else { "off" }
            );
        }
    }
    Ok(())
}
