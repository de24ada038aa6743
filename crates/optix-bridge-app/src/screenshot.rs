//! Writing frame buffers to image files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while saving a frame.
#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// Pixel count does not match the frame size.
    #[error("expected {expected} pixels for the frame, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    /// Failed to encode or write the image.
    #[error("failed to save image: {0}")]
    SaveFailed(#[from] image::ImageError),
}

/// Parse frame indices from a string like "0,5,10-15,20".
///
/// Ranges are inclusive. Indices at or past `frame_count` are never
/// rendered and are dropped, which also bounds the expansion of ranges.
/// Malformed parts are skipped.
pub fn parse_frame_indices(s: &str, frame_count: u64) -> HashSet<u64> {
    let mut frames = HashSet::new();
    let Some(last) = frame_count.checked_sub(1) else {
        return frames;
    };

    for part in s.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            if let (Ok(start), Ok(end)) = (start.trim().parse::<u64>(), end.trim().parse::<u64>()) {
                frames.extend(start..=end.min(last));
            }
        } else if let Ok(frame) = part.parse::<u64>() {
            if frame <= last {
                frames.insert(frame);
            }
        }
    }

    frames
}

/// Substitute `frame` for `{}` in `pattern`.
pub fn output_path(pattern: &str, frame: u64) -> PathBuf {
    PathBuf::from(pattern.replace("{}", &frame.to_string()))
}

/// Swap the red and blue channels of packed `0xAARRGGBB` pixels.
pub fn bgra_to_rgba(pixels: &mut [u32]) {
    for pixel in pixels {
        let p = *pixel;
        *pixel = (p & 0xff00_ff00) | ((p >> 16) & 0xff) | ((p & 0xff) << 16);
    }
}

/// Reverse the row order of a `width`-wide image in place.
pub fn flip_vertical(pixels: &mut [u32], width: usize) {
    if width == 0 {
        return;
    }
    let rows = pixels.len() / width;
    for y in 0..rows / 2 {
        let (top, bottom) = pixels.split_at_mut((rows - 1 - y) * width);
        top[y * width..(y + 1) * width].swap_with_slice(&mut bottom[..width]);
    }
}

/// Number of pixels in a `width`-wide image that differ from `expected(x, y)`.
pub fn count_mismatches(pixels: &[u32], width: usize, expected: impl Fn(u32, u32) -> u32) -> usize {
    if width == 0 {
        return pixels.len();
    }
    pixels
        .iter()
        .enumerate()
        .filter(|&(i, &p)| p != expected((i % width) as u32, (i / width) as u32))
        .count()
}

/// Save packed RGBA pixels (red in the low byte) to an image file.
///
/// The format is taken from the file extension.
pub fn save_rgba(
    pixels: &[u32],
    width: u32,
    height: u32,
    path: impl AsRef<Path>,
) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(ScreenshotError::SizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    let data: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
    let image = ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data).ok_or(
        ScreenshotError::SizeMismatch {
            expected,
            actual: pixels.len(),
        },
    )?;
    image.save(path)?;

    info!("Frame saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_frame() {
        assert_eq!(parse_frame_indices("5", 10), HashSet::from([5]));
    }

    #[test]
    fn parse_mixed() {
        let frames = parse_frame_indices("0, 5-7,10", 11);
        assert_eq!(frames, HashSet::from([0, 5, 6, 7, 10]));
    }

    #[test]
    fn parse_skips_garbage() {
        assert_eq!(parse_frame_indices("a,3,-,4-x", 10), HashSet::from([3]));
        assert!(parse_frame_indices("", 10).is_empty());
    }

    #[test]
    fn parse_limits_to_rendered_frames() {
        assert_eq!(parse_frame_indices("2,8-12,40", 10), HashSet::from([2, 8, 9]));
        assert!(parse_frame_indices("0-3", 0).is_empty());
        assert!(parse_frame_indices("7-3", 10).is_empty());
    }

    #[test]
    fn parse_huge_range_stays_bounded() {
        let frames = parse_frame_indices("0-18446744073709551615", 4);
        assert_eq!(frames, HashSet::from([0, 1, 2, 3]));
        assert!(parse_frame_indices("18446744073709551615", 4).is_empty());
    }

    #[test]
    fn pattern_substitution() {
        assert_eq!(output_path("frame_{}.png", 42), PathBuf::from("frame_42.png"));
        assert_eq!(output_path("sample02.png", 3), PathBuf::from("sample02.png"));
    }

    #[test]
    fn swaps_red_and_blue() {
        let mut pixels = [0xff11_2233, 0x8000_00ff];
        bgra_to_rgba(&mut pixels);
        assert_eq!(pixels, [0xff33_2211, 0x80ff_0000]);
    }

    #[test]
    fn flips_rows() {
        let mut pixels = [1, 2, 3, 4, 5, 6];
        flip_vertical(&mut pixels, 2);
        assert_eq!(pixels, [5, 6, 3, 4, 1, 2]);

        let mut pixels = [1, 2, 3, 4];
        flip_vertical(&mut pixels, 2);
        assert_eq!(pixels, [3, 4, 1, 2]);
    }

    #[test]
    fn mismatches_use_row_major_coordinates() {
        let pixels = [0, 1, 10, 12];
        assert_eq!(count_mismatches(&pixels, 2, |x, y| x + 10 * y), 1);
        assert_eq!(count_mismatches(&pixels, 0, |_, _| 0), 4);
    }

    #[test]
    fn save_rejects_wrong_size() {
        let err = save_rgba(&[0; 3], 2, 2, "unused.png").unwrap_err();
        assert!(matches!(
            err,
            ScreenshotError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn saved_png_keeps_channel_order() {
        let path = std::env::temp_dir().join(format!("optix_bridge_app_{}.png", std::process::id()));
        save_rgba(&[0xff00_00ff, 0xff00_ff00], 2, 1, &path).unwrap();

        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.get_pixel(0, 0).0, [0xff, 0, 0, 0xff]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0xff, 0, 0xff]);
        std::fs::remove_file(&path).unwrap();
    }
}
