use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use guest_photos::cli::{
    Args, BucketCommand, Commands, ParticipantCommand, PhotoCommand, VenueCommand,
};
use guest_photos::constants::{PROGRESS_BAR_TEMPLATE, SUPABASE_KEY_ENV, SUPABASE_URL_ENV};
use guest_photos::processing::write_output;
use guest_photos::utils::format_file_size;
use guest_photos::{
    check_batch_limit, collect_inputs, determine_output_format, find_venue, generate_thumbnail,
    load_sources, logger, optimize_file, preflight, prepare, status, validate_image, verbose,
    AppConfig, JsonCatalog, MemoryStore, NewParticipant, NewVenue, ObjectStore,
    OptimizationConfig, OutputFormat, PhotoQuery, PhotoRepository, PipelineError, SourceImage,
    StorageClient, SupabaseStorage, UploadProgress, Uploader,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose, args.quiet)?;

    let mut config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Upload {
            inputs,
            venue,
            recursive,
            quality,
            max_width,
            max_height,
            format,
            thumbnail_size,
            dry_run,
        } => {
            apply_overrides(&mut config.optimization, quality, max_width, max_height, format);
            if let Some(size) = thumbnail_size {
                config.thumbnail_size = size;
            }
            config.validate()?;
            upload_photos(&config, &inputs, &venue, recursive, dry_run).await?;
        }
        Commands::Optimize {
            input,
            output,
            quality,
            max_width,
            max_height,
            format,
        } => {
            let format = determine_output_format(&output, format);
            apply_overrides(
                &mut config.optimization,
                quality,
                max_width,
                max_height,
                Some(format),
            );
            config.optimization.validate()?;
            optimize_single(&input, &output, &config.optimization)?;
        }
        Commands::Thumbnail {
            input,
            output,
            size,
        } => {
            write_thumbnail(&input, &output, size.unwrap_or(config.thumbnail_size))?;
        }
        Commands::Validate { input } => {
            check_image(&config, &input)?;
        }
        Commands::Bucket {
            command: BucketCommand::Ensure,
        } => {
            config.validate()?;
            ensure_bucket(&config).await?;
        }
        Commands::Venues { command } => {
            manage_venues(&config, command).await?;
        }
        Commands::Participants { command } => {
            manage_participants(&config, command).await?;
        }
        Commands::Photos { command } => {
            manage_photos(&config, command).await?;
        }
    }

    Ok(())
}

fn apply_overrides(
    optimization: &mut OptimizationConfig,
    quality: Option<f32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    format: Option<OutputFormat>,
) {
    if let Some(quality) = quality {
        optimization.quality = quality;
    }
    if let Some(width) = max_width {
        optimization.max_width = width;
    }
    if let Some(height) = max_height {
        optimization.max_height = height;
    }
    if let Some(format) = format {
        optimization.format = format;
    }
}

fn remote_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    let options = config.supabase_options().ok_or_else(|| {
        anyhow!(
            "Remote storage is not configured: set {} and {} (or use --dry-run)",
            SUPABASE_URL_ENV,
            SUPABASE_KEY_ENV
        )
    })?;
    Ok(Arc::new(SupabaseStorage::new(options)?))
}

fn open_catalog(config: &AppConfig) -> Result<JsonCatalog> {
    JsonCatalog::open(&config.catalog_path)
        .with_context(|| format!("Failed to open catalog {}", config.catalog_path.display()))
}

fn progress_bar() -> ProgressBar {
    if logger::is_quiet() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(PROGRESS_BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    bar
}

fn describe(progress: &UploadProgress) -> String {
    match &progress.current_file {
        Some(file) => format!("{} {}", progress.stage, file),
        None => progress.stage.to_string(),
    }
}

async fn upload_photos(
    config: &AppConfig,
    inputs: &[String],
    venue: &str,
    recursive: bool,
    dry_run: bool,
) -> Result<()> {
    let start_time = Instant::now();

    let files = collect_inputs(inputs, recursive)?;
    check_batch_limit(files.len(), config.max_batch_files)?;
    status!("📊 Found {} image file(s)", files.len());

    let report = preflight(load_sources(&files)?, &config.validation);
    for message in report.rejection_messages() {
        status!("⚠️  Skipping {}", message);
    }
    if report.accepted.is_empty() {
        bail!("None of the {} file(s) passed validation", files.len());
    }

    let catalog = open_catalog(config)?;
    let (store, repo) = if dry_run {
        status!("🧪 Dry run: nothing will be stored");
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let repo: Arc<dyn PhotoRepository> = Arc::new(catalog.detached());
        (store, repo)
    } else {
        let repo: Arc<dyn PhotoRepository> = Arc::new(catalog);
        (remote_store(config)?, repo)
    };
    let storage = StorageClient::new(store);

    let venues = prepare(
        repo.as_ref(),
        &storage,
        &config.bucket,
        &config.bucket_config(),
        config.startup_timeout(),
    )
    .await?;
    let venue = find_venue(&venues, venue)
        .ok_or_else(|| PipelineError::VenueNotFound(venue.to_string()))?;
    status!("☕ Venue: {}", venue.name);

    let uploader = Uploader::new(storage, repo, config.uploader_options());
    let bar = progress_bar();
    let summary = uploader
        .upload_images(&report.accepted, venue.id, |progress| {
            bar.set_position(u64::from(progress.progress));
            bar.set_message(describe(progress));
        })
        .await;
    bar.finish_and_clear();

    status!("\n📊 Upload Summary:");
    status!(
        "  ✅ Uploaded: {}/{}",
        summary.uploaded_count,
        report.accepted.len()
    );
    if !report.rejected.is_empty() {
        status!("  ⚠️  Skipped by validation: {}", report.rejected.len());
    }
    status!("  ⏱️  Total time: {:?}", start_time.elapsed());

    for photo in &summary.photos {
        verbose!(
            "{} -> {} ({})",
            photo.metadata.original_file_name,
            photo.image_url,
            photo.id
        );
    }
    for error in &summary.errors {
        eprintln!("❌ {}", error);
    }

    if !summary.success {
        bail!("No photos were uploaded");
    }
    Ok(())
}

fn optimize_single(input: &Path, output: &Path, config: &OptimizationConfig) -> Result<()> {
    verbose!("Optimizing {} as {}", input.display(), config.format);

    let (source, asset) = optimize_file(input, output, config)?;

    status!("✅ Optimized {} -> {}", input.display(), output.display());
    status!(
        "📊 {} -> {} ({:.1}% smaller), {}x{}",
        format_file_size(source.size()),
        format_file_size(asset.size()),
        asset.size_reduction,
        asset.dimensions.width,
        asset.dimensions.height
    );
    Ok(())
}

fn write_thumbnail(input: &Path, output: &Path, size: u32) -> Result<()> {
    let source = SourceImage::from_path(input)?;
    let thumbnail = generate_thumbnail(&source.data, size)?;
    write_output(output, &thumbnail.data)?;

    status!(
        "✅ Thumbnail {}x{} written to {} ({})",
        thumbnail.side,
        thumbnail.side,
        output.display(),
        format_file_size(thumbnail.size())
    );
    Ok(())
}

fn check_image(config: &AppConfig, input: &Path) -> Result<()> {
    let source = SourceImage::from_path(input)?;

    match validate_image(&source, &config.validation).into_result() {
        Ok(dimensions) => {
            let size = dimensions
                .map(|d| format!("{}x{}", d.width, d.height))
                .unwrap_or_default();
            status!(
                "✅ {} is valid: {} {}, {}",
                source.name,
                source.media_type,
                size,
                format_file_size(source.size())
            );
            Ok(())
        }
        Err(e) => bail!("{}: {}", source.name, e),
    }
}

async fn ensure_bucket(config: &AppConfig) -> Result<()> {
    let storage = StorageClient::new(remote_store(config)?);
    storage
        .ensure_bucket(&config.bucket, &config.bucket_config())
        .await;

    match storage.bucket_exists(&config.bucket).await {
        Some(true) => status!("✅ Bucket {} is ready", config.bucket),
        Some(false) => bail!("Bucket {} could not be created", config.bucket),
        None => bail!("Could not confirm that bucket {} exists", config.bucket),
    }
    Ok(())
}

async fn manage_venues(config: &AppConfig, command: VenueCommand) -> Result<()> {
    let catalog = open_catalog(config)?;

    match command {
        VenueCommand::List => {
            let venues = catalog.list_venues().await?;
            if venues.is_empty() {
                status!("No venues yet");
            }
            for venue in venues {
                let value = venue
                    .value
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}  {:>4}  {} ({})", venue.id, value, venue.name, venue.address);
            }
        }
        VenueCommand::Add {
            name,
            address,
            value,
        } => {
            let venue = catalog
                .create_venue(NewVenue {
                    name,
                    address,
                    value,
                })
                .await?;
            status!("✅ Added venue {} ({})", venue.name, venue.id);
        }
    }
    Ok(())
}

async fn manage_participants(config: &AppConfig, command: ParticipantCommand) -> Result<()> {
    let catalog = open_catalog(config)?;

    match command {
        ParticipantCommand::List { search } => {
            let entries = catalog.list_participants(search.as_deref()).await?;
            if entries.is_empty() {
                status!("No participants found");
            }
            for entry in entries {
                let participant = entry.participant;
                println!(
                    "{}  {}  {}  {}",
                    participant.id,
                    participant.name,
                    participant.instagram.as_deref().unwrap_or("-"),
                    entry.venue_name.as_deref().unwrap_or("-")
                );
            }
        }
        ParticipantCommand::Add {
            name,
            venue,
            instagram,
        } => {
            let venues = catalog.list_venues().await?;
            let venue = find_venue(&venues, &venue)
                .ok_or_else(|| PipelineError::VenueNotFound(venue.clone()))?;
            let participant = catalog
                .create_participant(NewParticipant {
                    name,
                    instagram,
                    venue_id: venue.id,
                })
                .await?;
            status!("✅ Added participant {} at {}", participant.name, venue.name);
        }
    }
    Ok(())
}

async fn manage_photos(config: &AppConfig, command: PhotoCommand) -> Result<()> {
    let catalog = open_catalog(config)?;

    match command {
        PhotoCommand::List {
            venue,
            all,
            page,
            limit,
        } => {
            let venue_id = match venue {
                Some(selector) => {
                    let venues = catalog.list_venues().await?;
                    let venue = find_venue(&venues, &selector)
                        .ok_or(PipelineError::VenueNotFound(selector.clone()))?;
                    Some(venue.id)
                }
                None => None,
            };

            let result = catalog
                .list_photos(&PhotoQuery {
                    venue_id,
                    approved_only: !all,
                    page,
                    limit,
                })
                .await?;

            if result.photos.is_empty() {
                status!("No photos found");
            }
            for photo in &result.photos {
                let state = if photo.approved { "approved" } else { "pending" };
                println!(
                    "{}  {:<8}  {}  {}  {}",
                    photo.id,
                    state,
                    photo.created_at.format("%Y-%m-%d %H:%M"),
                    photo.metadata.original_file_name,
                    photo.image_url
                );
            }
            if let Some(next) = result.next_page {
                status!("More photos available: --page {}", next);
            }
        }
        PhotoCommand::Approve { id } => {
            catalog.set_approval(id, true).await?;
            status!("✅ Approved photo {}", id);
        }
        PhotoCommand::Reject { id } => {
            catalog.set_approval(id, false).await?;
            status!("✅ Withdrew approval of photo {}", id);
        }
        PhotoCommand::Delete { id } => {
            if !catalog.delete_photo(id).await? {
                return Err(PipelineError::PhotoNotFound(id.to_string()).into());
            }
            status!("🗑️  Deleted photo {}", id);
        }
    }
    Ok(())
}
