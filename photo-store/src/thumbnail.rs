use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;

/// Error type for thumbnail operations
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Image load error: {0}")]
    ImageLoadError(String),
    #[error("Image save error: {0}")]
    ImageSaveError(String),
    #[error("Thumbnail task failed: {0}")]
    TaskError(String),
}

/// Scale `original` down to fit inside `max_width` x `max_height`, keeping the
/// aspect ratio. Images that already fit are returned unchanged.
pub fn calculate_resize_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    let ratio =
        (original_width as f32 / max_width as f32).max(original_height as f32 / max_height as f32);

    if ratio > 1.0 {
        let new_width = ((original_width as f32 / ratio).round() as u32).max(1);
        let new_height = ((original_height as f32 / ratio).round() as u32).max(1);
        (new_width, new_height)
    } else {
        (original_width, original_height)
    }
}

/// Encode an image as baseline JPEG, dropping any alpha channel
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| ThumbnailError::ImageSaveError(format!("Failed to encode JPEG: {}", e)))?;
    Ok(buffer)
}

/// Creates a JPEG thumbnail whose longest edge is at most `max_size` pixels
pub fn create_thumbnail(
    image_data: &[u8],
    max_size: u32,
    quality: u8,
) -> Result<Vec<u8>, ThumbnailError> {
    let img = image::load_from_memory(image_data)
        .map_err(|e| ThumbnailError::ImageLoadError(format!("Failed to load image: {}", e)))?;

    let (width, height) =
        calculate_resize_dimensions(img.width(), img.height(), max_size, max_size);
    let thumb = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    log::debug!("Thumbnail created: {}x{}", width, height);
    encode_jpeg(&thumb, quality)
}

/// Same as [`create_thumbnail`], on the blocking pool
pub async fn create_thumbnail_blocking(
    image_data: Vec<u8>,
    max_size: u32,
    quality: u8,
) -> Result<Vec<u8>, ThumbnailError> {
    tokio::task::spawn_blocking(move || create_thumbnail(&image_data, max_size, quality))
        .await
        .map_err(|e| ThumbnailError::TaskError(format!("Task join error: {}", e)))?
}
