use crate::constants::{
    DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, LIBDEFLATER_HIGH_LEVEL,
    LIBDEFLATER_LOW_LEVEL, PNG_HIGH_EFFORT_QUALITY, PNG_OPTIMIZATION_PRESET, PNG_ZOPFLI_QUALITY,
    PRIVACY_MAX_DIMENSION, PRIVACY_QUALITY, THUMBNAIL_QUALITY, WEBP_LOSSLESS_QUALITY,
    ZOPFLI_ITERATIONS,
};
use crate::error::{PipelineError, Result};
use crate::formats::{media_type_for_path, OutputFormat};
use crate::utils::{calculate_size_reduction, validate_file_exists};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use oxipng::{Deflaters, Options};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::num::NonZeroU8;
use std::path::Path;
use tracing::debug;

/// Raw upload as handed over by the client. Never persisted directly.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Reads a file from disk, inferring the media type from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        validate_file_exists(path)?;
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Ok(Self::new(name, media_type_for_path(path), data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_png(&self) -> bool {
        self.media_type.contains("png")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self { width, height }
    }

    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality in `(0, 1]`.
    pub quality: f32,
    pub format: OutputFormat,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
        }
    }
}

impl OptimizationConfig {
    pub fn new(
        max_width: Option<u32>,
        max_height: Option<u32>,
        quality: Option<f32>,
        format: Option<OutputFormat>,
    ) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_width: max_width.unwrap_or(defaults.max_width),
            max_height: max_height.unwrap_or(defaults.max_height),
            quality: quality.unwrap_or(defaults.quality),
            format: format.unwrap_or(defaults.format),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(PipelineError::InvalidQuality(self.quality));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(PipelineError::InvalidDimensions(
                self.max_width,
                self.max_height,
            ));
        }
        Ok(())
    }

    /// Settings for the privacy pass: large bounds, high quality, PNG kept as PNG.
    pub fn privacy_pass(source: &SourceImage) -> Self {
        Self {
            max_width: PRIVACY_MAX_DIMENSION,
            max_height: PRIVACY_MAX_DIMENSION,
            quality: PRIVACY_QUALITY,
            format: if source.is_png() {
                OutputFormat::Png
            } else {
                OutputFormat::WebP
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizedAsset {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub dimensions: Dimensions,
    /// Percentage saved relative to the source, never negative.
    pub size_reduction: f64,
}

impl OptimizedAsset {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Turns the asset back into a source so it can go through another pass.
    pub fn into_source(self, name: impl Into<String>) -> SourceImage {
        SourceImage::new(name, self.format.mime_type(), self.data)
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailAsset {
    pub data: Vec<u8>,
    pub side: u32,
}

impl ThumbnailAsset {
    pub const FORMAT: OutputFormat = OutputFormat::WebP;

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Decodes an in-memory image, sniffing the format from its content.
///
/// # Returns
/// * `Ok(image)` - The decoded image, guaranteed to have non-zero dimensions
/// * `Err(PipelineError::Decode)` - If the bytes are corrupt or in an unsupported format
/// * `Err(PipelineError::InvalidDimensions)` - If the decoded image is empty
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| PipelineError::Decode(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidDimensions(width, height));
    }

    Ok(img)
}

/// Target size for an image so it fits inside `max_width x max_height`.
///
/// Aspect ratio is preserved and images already inside the bounds are
/// never upscaled.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);

    (new_width, new_height)
}

pub fn resize_to_fit(img: DynamicImage, config: &OptimizationConfig) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (target_width, target_height) =
        fit_within(width, height, config.max_width, config.max_height);

    if (target_width, target_height) == (width, height) {
        return img;
    }

    debug!(
        "Resizing {}x{} -> {}x{}",
        width, height, target_width, target_height
    );
    img.resize_exact(target_width, target_height, FilterType::Lanczos3)
}

/// Largest centered square inside a `width x height` image, as `(x, y, side)`.
pub fn center_square_crop(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

pub fn square_thumbnail(img: &DynamicImage, size: u32) -> DynamicImage {
    let (x, y, side) = center_square_crop(img.width(), img.height());
    img.crop_imm(x, y, side, side)
        .resize_exact(size, size, FilterType::Lanczos3)
}

fn quality_percent(quality: f32) -> u8 {
    ((quality * 100.0).round() as u8).clamp(1, 100)
}

/// Encoders only accept 8-bit RGB(A); anything else is converted first.
fn to_rgb_family(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn png_options(quality: f32) -> Options {
    let mut options = Options::from_preset(PNG_OPTIMIZATION_PRESET);

    options.deflate = if quality >= PNG_ZOPFLI_QUALITY {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if quality >= PNG_HIGH_EFFORT_QUALITY {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };

    options
}

/// Encodes an image in memory. Re-encoding never carries source metadata over.
///
/// WebP is lossy below full quality and lossless at 1.0.
pub fn encode_image(img: &DynamicImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encode_err = |e: image::ImageError| PipelineError::Encode(e.to_string());

    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent(quality));
            rgb.write_with_encoder(encoder).map_err(encode_err)?;
        }
        OutputFormat::WebP => {
            let rgb = to_rgb_family(img);
            let encoder = webp::Encoder::from_image(&rgb)
                .map_err(|e| PipelineError::Encode(format!("WebP encoder rejected image: {}", e)))?;
            let lossless = quality >= WEBP_LOSSLESS_QUALITY;
            let memory = encoder
                .encode_simple(lossless, f32::from(quality_percent(quality)))
                .map_err(|e| PipelineError::Encode(format!("WebP encoding failed: {:?}", e)))?;
            buffer = memory.to_vec();
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new(&mut buffer);
            to_rgb_family(img)
                .write_with_encoder(encoder)
                .map_err(encode_err)?;
            buffer = oxipng::optimize_from_memory(&buffer, &png_options(quality))
                .map_err(|e| PipelineError::Encode(format!("PNG optimization failed: {}", e)))?;
        }
    }

    if buffer.is_empty() {
        return Err(PipelineError::Encode(format!(
            "{} encoder produced no output",
            format
        )));
    }

    Ok(buffer)
}

/// Decodes, bounds and re-encodes a source image.
///
/// # Arguments
/// * `source` - The uploaded image
/// * `config` - Bounds, quality and output format
///
/// # Returns
/// * `Ok(OptimizedAsset)` - Encoded bytes with the final dimensions and size reduction
/// * `Err(PipelineError)` - Decode, encode or configuration failure
pub fn optimize_image(source: &SourceImage, config: &OptimizationConfig) -> Result<OptimizedAsset> {
    config.validate()?;

    let img = decode_image(&source.data)?;
    let img = resize_to_fit(img, config);
    let dimensions = Dimensions::of(&img);
    let data = encode_image(&img, config.format, config.quality)?;
    let size_reduction = calculate_size_reduction(source.size(), data.len() as u64);

    debug!(
        "Optimized {}: {} -> {} bytes as {} ({}x{})",
        source.name,
        source.size(),
        data.len(),
        config.format,
        dimensions.width,
        dimensions.height
    );

    Ok(OptimizedAsset {
        data,
        format: config.format,
        dimensions,
        size_reduction,
    })
}

/// Privacy pass: a decode/re-encode round trip that drops EXIF and every
/// other piece of embedded metadata.
pub fn strip_metadata(source: &SourceImage) -> Result<OptimizedAsset> {
    optimize_image(source, &OptimizationConfig::privacy_pass(source))
}

/// Builds a `size x size` center-cropped WebP thumbnail from encoded image bytes.
pub fn generate_thumbnail(data: &[u8], size: u32) -> Result<ThumbnailAsset> {
    if size == 0 {
        return Err(PipelineError::InvalidDimensions(size, size));
    }

    let img = decode_image(data)?;
    let thumb = square_thumbnail(&img, size);
    let data = encode_image(&thumb, ThumbnailAsset::FORMAT, THUMBNAIL_QUALITY)?;

    Ok(ThumbnailAsset { data, side: size })
}

/// Optimizes a file on disk and writes the result, creating parent directories.
pub fn optimize_file(
    input_path: &Path,
    output_path: &Path,
    config: &OptimizationConfig,
) -> Result<(SourceImage, OptimizedAsset)> {
    let source = SourceImage::from_path(input_path)?;
    let optimized = optimize_image(&source, config)?;
    write_output(output_path, &optimized.data)?;
    Ok((source, optimized))
}

pub fn write_output(output_path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, data)?;
    Ok(())
}
