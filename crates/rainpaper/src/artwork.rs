//! Album-art handling for now-playing messages: decode the base64
//! thumbnail, pull a coarse palette out of it, and derive the widget accent
//! from the highest-contrast swatch.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbaImage;
use tracing::{debug, info, warn};

use hostproto::{pick_accent, Rgb, TrackInfo};

const PALETTE_SIZE: usize = 8;

/// Reacts to one track message. `None` means playback stopped.
pub fn handle_track(track: Option<&TrackInfo>) {
    let Some(track) = track else {
        debug!("no track playing");
        return;
    };

    let title = track.title.as_deref().unwrap_or("unknown title");
    let artist = track.artist.as_deref().unwrap_or("unknown artist");

    match track.thumbnail.as_deref().map(accent_from_thumbnail) {
        Some(Ok((accent, dominant))) => {
            info!(
                title,
                artist,
                accent = %format_rgb(accent),
                shadow = %format_rgb(dominant),
                "track changed"
            );
        }
        Some(Err(err)) => {
            warn!(title, artist, error = %err, "could not derive accent from album art");
        }
        None => {
            info!(title, artist, "track changed");
        }
    }
}

/// Accent and dominant colors for a base64-encoded thumbnail.
pub fn accent_from_thumbnail(thumbnail: &str) -> Result<(Rgb, Rgb)> {
    let image = decode_thumbnail(thumbnail)?;
    let palette = extract_palette(&image, PALETTE_SIZE);
    pick_accent(&palette).context("album art palette too small for an accent")
}

fn decode_thumbnail(thumbnail: &str) -> Result<RgbaImage> {
    // Hosts send either raw base64 or a full data URI.
    let encoded = match thumbnail.split_once("base64,") {
        Some((_, payload)) => payload,
        None => thumbnail,
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("thumbnail is not valid base64")?;
    let image = image::load_from_memory(&bytes).context("thumbnail is not a decodable image")?;
    Ok(image.to_rgba8())
}

/// Coarse palette: quantise each opaque pixel to 4 bits per channel and
/// keep the most common buckets, dominant color first.
fn extract_palette(image: &RgbaImage, max_colors: usize) -> Vec<Rgb> {
    let mut counts: std::collections::HashMap<[u8; 3], u32> = std::collections::HashMap::new();
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < 128 {
            continue;
        }
        let bucket = [r >> 4, g >> 4, b >> 4];
        *counts.entry(bucket).or_default() += 1;
    }

    let mut buckets: Vec<_> = counts.into_iter().collect();
    buckets.sort_by(|first, second| second.1.cmp(&first.1).then(first.0.cmp(&second.0)));
    buckets
        .into_iter()
        .take(max_colors)
        .map(|(bucket, _)| {
            // Bucket midpoint back in 8-bit space.
            [
                (bucket[0] << 4) | 0x08,
                (bucket[1] << 4) | 0x08,
                (bucket[2] << 4) | 0x08,
            ]
        })
        .collect()
}

fn format_rgb(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn encode_png(image: &RgbaImage) -> String {
        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .expect("encode png");
        STANDARD.encode(bytes)
    }

    fn two_tone_image() -> RgbaImage {
        // Mostly dark with a bright stripe, so dominant and accent differ.
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([16, 16, 16, 255]));
        for x in 0..8 {
            image.put_pixel(x, 0, Rgba([240, 240, 240, 255]));
        }
        image
    }

    #[test]
    fn palette_orders_dominant_first() {
        let palette = extract_palette(&two_tone_image(), 4);
        assert!(palette.len() >= 2);
        // 56 dark pixels vs 8 bright ones.
        assert_eq!(palette[0], [0x18, 0x18, 0x18]);
    }

    #[test]
    fn accent_decodes_raw_and_data_uri_thumbnails() {
        let encoded = encode_png(&two_tone_image());
        let (accent, dominant) = accent_from_thumbnail(&encoded).expect("raw base64");
        assert_eq!(dominant, [0x18, 0x18, 0x18]);
        assert_eq!(accent, [0xf8, 0xf8, 0xf8]);

        let data_uri = format!("data:image/png;base64,{encoded}");
        let from_uri = accent_from_thumbnail(&data_uri).expect("data uri");
        assert_eq!(from_uri, (accent, dominant));
    }

    #[test]
    fn bad_thumbnails_are_errors_not_panics() {
        assert!(accent_from_thumbnail("!!not base64!!").is_err());
        let not_an_image = STANDARD.encode(b"plain text");
        assert!(accent_from_thumbnail(&not_an_image).is_err());
    }

    #[test]
    fn transparent_pixels_are_ignored() {
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 0]));
        image.put_pixel(0, 0, Rgba([0, 200, 0, 255]));
        let palette = extract_palette(&image, 4);
        assert_eq!(palette, vec![[0x08, 0xc8, 0x08]]);
    }
}
