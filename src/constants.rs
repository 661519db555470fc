pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1920;
pub const DEFAULT_QUALITY: f32 = 0.8;

// Privacy pass: re-encode at a generous size so only metadata is lost.
pub const PRIVACY_MAX_DIMENSION: u32 = 4000;
pub const PRIVACY_QUALITY: f32 = 0.9;

pub const DEFAULT_THUMBNAIL_SIZE: u32 = 300;
pub const THUMBNAIL_QUALITY: f32 = 0.8;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_BATCH_FILES: usize = 10;
pub const DEFAULT_MIN_WIDTH: u32 = 100;
pub const DEFAULT_MIN_HEIGHT: u32 = 100;
pub const DEFAULT_ALLOWED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

// WebP switches to lossless at full quality
pub const WEBP_LOSSLESS_QUALITY: f32 = 1.0;
pub const PNG_ZOPFLI_QUALITY: f32 = 0.9;
pub const PNG_HIGH_EFFORT_QUALITY: f32 = 0.7;
pub const PNG_OPTIMIZATION_PRESET: u8 = 4;
pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;

pub const DEFAULT_BUCKET: &str = "guest-photos";
pub const DEFAULT_CATALOG_PATH: &str = "guest-photos.json";
pub const IMAGES_PREFIX: &str = "images";
pub const THUMBNAILS_PREFIX: &str = "thumbnails";
pub const CACHE_CONTROL_SECONDS: u32 = 3600;
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_PAGE_SIZE: usize = 20;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif"];

pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_SERVICE_KEY";
pub const BUCKET_ENV: &str = "GUEST_PHOTOS_BUCKET";
pub const CATALOG_ENV: &str = "GUEST_PHOTOS_CATALOG";
