//! Upload validation, resizing, and JPEG re-encoding for leaf photos.
//!
//! Every photo is shrunk to fit within 512px before it leaves the machine,
//! so the inference endpoint always receives a small JPEG regardless of
//! what the user dropped in.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::{info, warn};

use crate::error::LeafScanError;

/// Largest upload accepted from the UI (10MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum width or height of the image sent to the endpoint.
pub const MAX_IMAGE_DIMENSION: u32 = 512;

/// Fixed JPEG quality for the re-encoded upload.
pub const JPEG_QUALITY: u8 = 80;

/// The three upload formats the analyzer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::WebP),
            _ => None,
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::WebP => Some(ImageKind::WebP),
            _ => None,
        }
    }

    fn format(self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::WebP => ImageFormat::WebP,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::WebP => "image/webp",
        }
    }
}

/// A resized JPEG ready for the multipart upload.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

/// Check declared MIME type and payload size before touching the pixels.
pub fn validate_upload(mime: &str, size: usize) -> Result<ImageKind, LeafScanError> {
    if size == 0 {
        return Err(LeafScanError::EmptyImage);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(LeafScanError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    ImageKind::from_mime(mime).ok_or_else(|| LeafScanError::UnsupportedType(mime.to_string()))
}

/// Identify the real format from the magic bytes.
pub fn sniff_kind(bytes: &[u8]) -> Result<ImageKind, LeafScanError> {
    let format = image::guess_format(bytes)
        .map_err(|e| LeafScanError::UnsupportedType(format!("unrecognized content ({})", e)))?;
    ImageKind::from_format(format)
        .ok_or_else(|| LeafScanError::UnsupportedType(format!("{:?}", format)))
}

/// Validate, decode, downscale and re-encode an uploaded leaf photo.
///
/// The declared MIME type must be one of JPEG/PNG/WebP. When the bytes say
/// otherwise, the sniffed format is used for decoding.
pub fn prepare_image(bytes: &[u8], declared_mime: &str) -> Result<PreparedImage, LeafScanError> {
    let declared = validate_upload(declared_mime, bytes.len())?;
    let kind = sniff_kind(bytes)?;
    if kind != declared {
        warn!(
            "Declared type {} does not match content {}, decoding as {}",
            declared.mime_type(),
            kind.mime_type(),
            kind.mime_type()
        );
    }

    let img = image::load_from_memory_with_format(bytes, kind.format())
        .map_err(|e| LeafScanError::Decode(e.to_string()))?;
    let (original_width, original_height) = (img.width(), img.height());
    info!("Decoded {} upload: {}x{}", kind.mime_type(), original_width, original_height);

    // Flatten first: resampling straight RGBA bleeds transparent pixels into edges
    let flat = DynamicImage::ImageRgb8(flatten_onto_white(img));
    let rgb = resize_to_fit(flat, MAX_IMAGE_DIMENSION).into_rgb8();
    let (width, height) = rgb.dimensions();

    let jpeg = encode_to_jpeg(&rgb, JPEG_QUALITY)?;
    info!("Re-encoded to {}x{} JPEG, {} bytes", width, height, jpeg.len());

    Ok(PreparedImage {
        jpeg,
        width,
        height,
        original_width,
        original_height,
    })
}

/// Target size that fits within `max` on both sides, keeping aspect ratio.
/// Never upscales and never returns a zero side.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = max as f64 / width.max(height) as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (scaled(width), scaled(height))
}

fn resize_to_fit(img: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = fit_within(img.width(), img.height(), max);
    if (width, height) == (img.width(), img.height()) {
        return img;
    }
    img.resize_exact(width, height, FilterType::Triangle)
}

/// JPEG has no alpha; composite transparent pixels onto white.
fn flatten_onto_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }
    let rgba = img.into_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

fn encode_to_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, LeafScanError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(img)
        .map_err(|e| LeafScanError::Encode(e.to_string()))?;
    Ok(buffer)
}
