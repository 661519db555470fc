pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod formats;
pub mod logger;
pub mod memory;
pub mod persistence;
pub mod processing;
pub mod startup;
pub mod storage;
pub mod supabase;
pub mod upload;
pub mod utils;
pub mod validation;

pub use batch::{
    check_batch_limit, collect_image_files, collect_inputs, load_sources, preflight,
    PreflightReport,
};
pub use catalog::JsonCatalog;
pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use formats::{determine_output_format, OutputFormat};
pub use memory::MemoryStore;
pub use persistence::{
    find_venue, NewParticipant, NewVenue, Participant, ParticipantEntry, PhotoMetadata, PhotoPage,
    PhotoQuery, PhotoRecord, PhotoRepository, Venue,
};
pub use processing::{
    generate_thumbnail, optimize_file, optimize_image, strip_metadata, Dimensions,
    OptimizationConfig, OptimizedAsset, SourceImage, ThumbnailAsset,
};
pub use startup::prepare;
pub use storage::{BucketConfig, ObjectOptions, ObjectStore, StorageClient};
pub use supabase::{SupabaseOptions, SupabaseStorage};
pub use upload::{
    ProgressTracker, UploadProgress, UploadStage, UploadSummary, Uploader, UploaderOptions,
};
pub use validation::{validate_image, ValidationError, ValidationOptions, ValidationVerdict};
