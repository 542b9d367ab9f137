use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use std::io::Cursor;
use thiserror::Error;

use cupom_core::config::MAX_VARIANTS;

/// Longest side, in pixels, handed to the recognizer (Tesseract works best
/// around 300 DPI / ~2000 px).
const MAX_SIDE: u32 = 2800;
/// Fraction of pixels clipped at each end of the histogram before stretching.
const CLIP_FRACTION: f64 = 0.01;
const DENOISE_SIGMA: f32 = 1.0;
/// The paper background is estimated at 1/8 resolution, then blurred.
const BACKGROUND_SCALE: u32 = 8;
const BACKGROUND_SIGMA: f32 = 2.0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Could not read image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Which filter chain produced a [`PreparedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Grayscale, background-flattened, then percentile-stretched; copes with
    /// uneven lighting, shadows and glare.
    Contrast,
    /// Median-filtered, then black/white via a global Otsu threshold.
    Binarized,
    /// Gaussian-smoothed contrast variant for noisy, low-quality captures.
    Denoised,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Contrast => write!(f, "contrast"),
            Variant::Binarized => write!(f, "binarized"),
            Variant::Denoised => write!(f, "denoised"),
        }
    }
}

/// One preprocessed rendition of the caller's image.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub variant: Variant,
    pub image: GrayImage,
}

impl PreparedImage {
    pub fn new(variant: Variant, image: GrayImage) -> Self {
        Self { variant, image }
    }

    /// PNG bytes, for backends that only accept encoded images.
    pub fn to_png(&self) -> Result<Vec<u8>, PreprocessError> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(self.image.clone())
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PreprocessError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

/// Decode raw image bytes (JPEG / PNG / WEBP / …) and derive up to
/// `max_variants` recognition-ready renditions.
pub fn prepare(data: &[u8], max_variants: usize) -> Result<Vec<PreparedImage>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    Ok(prepare_image(img, max_variants))
}

/// Variants come out in a fixed order: contrast, binarized, denoised.
/// `max_variants` is clamped to `1..=3`, so the result is never empty.
pub fn prepare_image(img: DynamicImage, max_variants: usize) -> Vec<PreparedImage> {
    let count = max_variants.clamp(1, MAX_VARIANTS);
    let contrast = stretch_contrast(flatten_background(&downscale(img).to_luma8()));

    let mut variants = Vec::with_capacity(count);
    if count >= 2 {
        variants.push(PreparedImage::new(Variant::Binarized, binarize(&contrast)));
    }
    if count >= 3 {
        variants.push(PreparedImage::new(
            Variant::Denoised,
            gaussian_blur_f32(&contrast, DENOISE_SIGMA),
        ));
    }
    variants.insert(0, PreparedImage::new(Variant::Contrast, contrast));
    variants
}

fn downscale(img: DynamicImage) -> DynamicImage {
    if img.width() > MAX_SIDE || img.height() > MAX_SIDE {
        img.resize(MAX_SIDE, MAX_SIDE, image::imageops::FilterType::Lanczos3)
    } else {
        img
    }
}

/// Divides every pixel by a smooth estimate of the local paper brightness, so a
/// shadowed half and a lit half of the same receipt both end up with paper near
/// white and ink well below it. Small text strokes barely move the estimate.
fn flatten_background(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let small = imageops::resize(
        gray,
        (width / BACKGROUND_SCALE).max(1),
        (height / BACKGROUND_SCALE).max(1),
        FilterType::Triangle,
    );
    let blurred = gaussian_blur_f32(&small, BACKGROUND_SIGMA);
    let background = imageops::resize(&blurred, width, height, FilterType::Triangle);

    ImageBuffer::from_fn(width, height, |x, y| {
        let p = gray.get_pixel(x, y)[0] as u32;
        let bg = background.get_pixel(x, y)[0].max(1) as u32;
        Luma([(p * 255 / bg).min(255) as u8])
    })
}

/// Percentile contrast stretch: the darkest and brightest `CLIP_FRACTION` of
/// pixels saturate, so a glare spot or a shadowed corner does not pin the range.
fn stretch_contrast(gray: GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[p[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let clip = (total as f64 * CLIP_FRACTION) as u64;

    let low = percentile_bound(histogram.iter().enumerate(), clip);
    let high = percentile_bound(histogram.iter().enumerate().rev(), clip);

    let (Some(low), Some(high)) = (low, high) else {
        return gray;
    };
    if high <= low {
        // Uniform image, nothing to stretch.
        return gray;
    }

    let range = (high - low) as u32;
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0].clamp(low, high);
        Luma([((p - low) as u32 * 255 / range) as u8])
    })
}

/// First intensity (walking `bins` in order) at which more than `clip`
/// pixels have been seen.
fn percentile_bound<'a>(bins: impl Iterator<Item = (usize, &'a u64)>, clip: u64) -> Option<u8> {
    let mut seen = 0u64;
    for (value, &count) in bins {
        seen += count;
        if seen > clip {
            return Some(value as u8);
        }
    }
    None
}

fn binarize(gray: &GrayImage) -> GrayImage {
    let smoothed = median_filter(gray, 1, 1);
    let level = otsu_level(&smoothed);
    ImageBuffer::from_fn(smoothed.width(), smoothed.height(), |x, y| {
        if smoothed.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
