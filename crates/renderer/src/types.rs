use std::path::PathBuf;

/// Process-wide tunables mutated by host property events and read once per
/// frame by the window loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Target frame rate for the cooperative frame loop.
    pub frame_rate: f32,
    /// User-selected display scale multiplied onto the device pixel ratio.
    pub pixel_scale: f32,
    /// Pointer parallax strength; `0.0` disables the effect entirely.
    pub parallax_strength: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            pixel_scale: 1.0,
            parallax_strength: 1.0,
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the settings file: which fragment
/// shader to load, how large the window should be, and which background
/// media (if any) to install before the first frame.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Path to the rain fragment shader loaded as opaque text at startup.
    pub shader_source: PathBuf,
    /// Optional background image or video selected before launch.
    pub media: Option<PathBuf>,
    /// Initial settings; later mutated by host property events.
    pub settings: Settings,
}

impl Default for RendererConfig {
    /// Provides a 1080p configuration with no shader or media selected.
    fn default() -> Self {
        Self {
            surface_size: (1920, 1080),
            shader_source: PathBuf::new(),
            media: None,
            settings: Settings::default(),
        }
    }
}
