//! Wallpaper-host control protocol: newline-delimited JSON messages that
//! carry property changes, playback state, and now-playing track metadata.
//!
//! The message grammar is host-defined and fixed; this crate turns it into
//! typed values so the renderer never touches raw JSON.

mod accent;
mod message;
mod property;

pub use accent::{contrast_ratio, pick_accent, relative_luminance, Rgb};
pub use message::{HostMessage, ProtocolError, TrackInfo};
pub use property::{PropertyError, PropertyUpdate, BLUR_QUALITY_STEPS};
