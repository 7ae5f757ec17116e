//! Accent color selection for the now-playing widget: out of an album-art
//! palette, pick the swatch with the highest WCAG contrast against the
//! dominant color.

pub type Rgb = [u8; 3];

/// WCAG relative luminance of an sRGB color.
pub fn relative_luminance(color: Rgb) -> f64 {
    let channel = |value: u8| {
        let value = value as f64 / 255.0;
        if value <= 0.03928 {
            value / 12.92
        } else {
            ((value + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * channel(color[0]) + 0.7152 * channel(color[1]) + 0.0722 * channel(color[2])
}

/// WCAG contrast ratio between two colors, always >= 1.
pub fn contrast_ratio(first: Rgb, second: Rgb) -> f64 {
    let first = relative_luminance(first);
    let second = relative_luminance(second);
    let (lighter, darker) = if first >= second {
        (first, second)
    } else {
        (second, first)
    };
    (lighter + 0.05) / (darker + 0.05)
}

/// Picks the accent color from a palette whose first entry is the dominant
/// color. Returns `(accent, dominant)`, or `None` if the palette has no
/// candidate beyond the dominant entry.
pub fn pick_accent(palette: &[Rgb]) -> Option<(Rgb, Rgb)> {
    let (&dominant, candidates) = palette.split_first()?;
    let accent = candidates.iter().copied().max_by(|first, second| {
        contrast_ratio(dominant, *first).total_cmp(&contrast_ratio(dominant, *second))
    })?;
    Some((accent, dominant))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb = [0, 0, 0];
    const WHITE: Rgb = [255, 255, 255];

    #[test]
    fn luminance_spans_black_to_white() {
        assert_eq!(relative_luminance(BLACK), 0.0);
        assert!((relative_luminance(WHITE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn black_on_white_is_maximal_contrast() {
        assert!((contrast_ratio(BLACK, WHITE) - 21.0).abs() < 0.01);
        // Symmetric in its arguments.
        assert_eq!(contrast_ratio(BLACK, WHITE), contrast_ratio(WHITE, BLACK));
    }

    #[test]
    fn accent_is_the_highest_contrast_swatch() {
        let palette = [[10, 10, 10], [30, 30, 30], [240, 240, 240], [100, 100, 100]];
        let (accent, dominant) = pick_accent(&palette).expect("accent");
        assert_eq!(dominant, [10, 10, 10]);
        assert_eq!(accent, [240, 240, 240]);
    }

    #[test]
    fn degenerate_palettes_yield_nothing() {
        assert!(pick_accent(&[]).is_none());
        assert!(pick_accent(&[[5, 5, 5]]).is_none());
    }
}
