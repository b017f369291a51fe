//! Best-effort photo enhancement: denoise, unsharp mask, contrast.
//!
//! Border pixels within the filter radius are left untouched.

use crate::thumbnail::{encode_jpeg, ThumbnailError};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JPEG quality used when re-encoding an enhanced capture
pub const ENHANCED_JPEG_QUALITY: u8 = 95;

const CONTRAST_CENTER: f32 = 128.0;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Encode(#[from] ThumbnailError),
    #[error("Enhancement task failed: {0}")]
    Task(String),
}

/// Strengths are percentages (0-100); 0 disables a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnhancementSettings {
    pub enabled: bool,
    pub sharpness: u8,
    pub denoise: u8,
    pub contrast: u8,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sharpness: 30,
            denoise: 20,
            contrast: 10,
        }
    }
}

impl EnhancementSettings {
    /// True when enhancement would actually change pixels
    pub fn is_active(&self) -> bool {
        self.enabled && (self.sharpness > 0 || self.denoise > 0 || self.contrast > 0)
    }
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn strength(value: u8) -> f32 {
    f32::from(value.min(100)) / 100.0
}

/// Edge-preserving weighted average. Neighbours whose colour distance is
/// below the threshold count fully, others decay exponentially.
pub fn apply_denoise(img: &mut RgbImage, value: u8) {
    let s = strength(value);
    if s <= 0.0 {
        return;
    }
    let radius: i64 = if value > 50 { 2 } else { 1 };
    let threshold = s * 30.0;
    let original = img.clone();
    let (width, height) = (i64::from(img.width()), i64::from(img.height()));

    for y in radius..height - radius {
        for x in radius..width - radius {
            let center = original.get_pixel(x as u32, y as u32).0;
            let mut sum = [0.0f32; 3];
            let mut weight_sum = 0.0f32;

            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let n = original.get_pixel((x + dx) as u32, (y + dy) as u32).0;
                    let dist = ((0..3)
                        .map(|c| (f32::from(n[c]) - f32::from(center[c])).powi(2))
                        .sum::<f32>())
                    .sqrt();
                    let weight = if dist < threshold {
                        1.0
                    } else {
                        (-dist / threshold).exp()
                    };
                    for c in 0..3 {
                        sum[c] += f32::from(n[c]) * weight;
                    }
                    weight_sum += weight;
                }
            }

            if weight_sum > 0.0 {
                let px = img.get_pixel_mut(x as u32, y as u32);
                for c in 0..3 {
                    px.0[c] = clamp_channel(sum[c] / weight_sum);
                }
            }
        }
    }
}

/// Unsharp mask against a 3x3 box blur
pub fn apply_unsharp_mask(img: &mut RgbImage, value: u8) {
    let amount = strength(value) * 1.5;
    if amount <= 0.0 {
        return;
    }
    let original = img.clone();
    let (width, height) = (img.width(), img.height());
    if width < 3 || height < 3 {
        return;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut blur = [0.0f32; 3];
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    let n = original.get_pixel(nx, ny).0;
                    for c in 0..3 {
                        blur[c] += f32::from(n[c]);
                    }
                }
            }

            let center = original.get_pixel(x, y).0;
            let px = img.get_pixel_mut(x, y);
            for c in 0..3 {
                let o = f32::from(center[c]);
                px.0[c] = clamp_channel(o + (o - blur[c] / 9.0) * amount);
            }
        }
    }
}

/// Linear contrast stretch around mid grey
pub fn apply_contrast(img: &mut RgbImage, value: u8) {
    let s = strength(value);
    if s <= 0.0 {
        return;
    }
    let factor = 1.0 + s * 0.5;
    for px in img.pixels_mut() {
        for c in 0..3 {
            let centered = f32::from(px.0[c]) - CONTRAST_CENTER;
            px.0[c] = clamp_channel(centered * factor + CONTRAST_CENTER);
        }
    }
}

/// Run every enabled stage in order on a decoded image
pub fn enhance_pixels(img: &mut RgbImage, settings: &EnhancementSettings) {
    apply_denoise(img, settings.denoise);
    apply_unsharp_mask(img, settings.sharpness);
    apply_contrast(img, settings.contrast);
}

/// Decode, enhance and re-encode as JPEG.
///
/// Disabled or all-zero settings return the input unchanged.
pub fn enhance_image(
    image_data: &[u8],
    settings: &EnhancementSettings,
) -> Result<Vec<u8>, EnhanceError> {
    if !settings.is_active() {
        return Ok(image_data.to_vec());
    }

    let mut img = image::load_from_memory(image_data)?.to_rgb8();
    enhance_pixels(&mut img, settings);
    log::debug!(
        "Enhanced {}x{} image (denoise {}, sharpness {}, contrast {})",
        img.width(),
        img.height(),
        settings.denoise,
        settings.sharpness,
        settings.contrast
    );
    Ok(encode_jpeg(
        &DynamicImage::ImageRgb8(img),
        ENHANCED_JPEG_QUALITY,
    )?)
}

/// [`enhance_image`] on the blocking pool
pub async fn enhance_image_blocking(
    image_data: Vec<u8>,
    settings: EnhancementSettings,
) -> Result<Vec<u8>, EnhanceError> {
    tokio::task::spawn_blocking(move || enhance_image(&image_data, &settings))
        .await
        .map_err(|e| EnhanceError::Task(e.to_string()))?
}
