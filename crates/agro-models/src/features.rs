//! Image decoding and colour feature extraction for leaf photos.

use agro_core::{Error, Result};
use image::{DynamicImage, ImageFormat, imageops::FilterType};

/// Formats accepted from callers.
pub const SUPPORTED_FORMATS: [ImageFormat; 3] =
  [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Side length of the square the image is resampled to before features are
/// taken.
pub const DEFAULT_INPUT_SIZE: u32 = 64;

/// Names of the entries in a [`colour_features`] vector, in order.
pub const FEATURE_NAMES: [&str; 8] = [
  "mean_red",
  "mean_green",
  "mean_blue",
  "green_fraction",
  "yellow_fraction",
  "brown_fraction",
  "white_fraction",
  "dark_fraction",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Decode caller-supplied bytes, rejecting empty buffers and unsupported or
/// corrupt images with [`Error::InvalidInput`].
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
  if bytes.is_empty() {
    return Err(Error::invalid("image is empty"));
  }
  let format = image::guess_format(bytes)
    .map_err(|_| Error::invalid("unrecognised image format"))?;
  if !SUPPORTED_FORMATS.contains(&format) {
    return Err(Error::InvalidInput(format!(
      "unsupported image format: {format:?}"
    )));
  }
  let decoded = image::load_from_memory_with_format(bytes, format)
    .map_err(|e| Error::InvalidInput(format!("image could not be decoded: {e}")))?;
  if decoded.width() == 0 || decoded.height() == 0 {
    return Err(Error::invalid("image has no pixels"));
  }
  Ok(decoded)
}

/// Hue in degrees, saturation and value in `0..=1`.
fn hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
  let max = r.max(g).max(b);
  let min = r.min(g).min(b);
  let delta = max - min;

  let hue = if delta == 0.0 {
    0.0
  } else if max == r {
    60.0 * ((g - b) / delta).rem_euclid(6.0)
  } else if max == g {
    60.0 * ((b - r) / delta + 2.0)
  } else {
    60.0 * ((r - g) / delta + 4.0)
  };
  let saturation = if max == 0.0 { 0.0 } else { delta / max };
  (hue, saturation, max)
}

/// Mean RGB plus the share of pixels falling into each symptom colour band.
///
/// Every entry is within `0..=1`.
pub fn colour_features(image: &DynamicImage, size: u32) -> [f64; FEATURE_COUNT] {
  let size = size.max(1);
  let rgb = image
    .resize_exact(size, size, FilterType::Triangle)
    .to_rgb8();

  let mut features = [0.0f64; FEATURE_COUNT];
  let mut n = 0usize;

  for pixel in rgb.pixels() {
    let r = f64::from(pixel[0]) / 255.0;
    let g = f64::from(pixel[1]) / 255.0;
    let b = f64::from(pixel[2]) / 255.0;
    features[0] += r;
    features[1] += g;
    features[2] += b;

    let (h, s, v) = hsv(r, g, b);
    if v < 0.15 {
      features[7] += 1.0;
    } else if s < 0.15 && v > 0.8 {
      features[6] += 1.0;
    } else if s > 0.2 && (70.0..170.0).contains(&h) {
      features[3] += 1.0;
    } else if s > 0.3 && (40.0..70.0).contains(&h) && v > 0.4 {
      features[4] += 1.0;
    } else if s > 0.3 && (10.0..40.0).contains(&h) && v <= 0.7 {
      features[5] += 1.0;
    }
    n += 1;
  }

  if n > 0 {
    for f in &mut features {
      *f /= n as f64;
    }
  }
  features
}
