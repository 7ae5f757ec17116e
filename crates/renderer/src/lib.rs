//! Shader-driven rain wallpaper renderer.
//!
//! The crate owns a dedicated render thread: [`WindowRuntime::spawn`] builds
//! the window, GPU device, and rain pipeline there and returns a cloneable
//! [`ControlHandle`] for host property and playback messages. Everything
//! else (uniform layout, scene clock, media decoding) is internal.

mod clock;
mod compile;
mod gpu;
mod media;
mod types;
mod window;

pub use clock::ELAPSED_RESET_SECONDS;
pub use media::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
pub use types::{RendererConfig, Settings};
pub use window::{ControlEvent, ControlHandle, WindowRuntime};
