//! Background media sources: still images decoded off-thread and looping
//! videos streamed as raw RGBA frames from an `ffmpeg` child process.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::warn;

/// File types accepted by media selection; anything else is a silent no-op.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a path by lower-cased extension. `None` means the
    /// selection is unsupported and must be ignored.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Monotonic tag handed to each media load so a stale completion can never
/// overwrite a newer selection.
#[derive(Debug, Default)]
pub(crate) struct LoadGeneration(u64);

impl LoadGeneration {
    pub fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    /// Whether a completion tagged `generation` belongs to the newest
    /// selection. Anything older has been superseded and must be dropped.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.0
    }
}

/// What currently feeds `u_tex0`. Dropping a `Video` variant tears down its
/// decoder.
pub(crate) enum ActiveMedia {
    None,
    Image,
    Video(VideoStream),
}

pub(crate) struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// In-flight image decode running on a worker thread.
pub(crate) struct ImageLoad {
    generation: u64,
    receiver: Receiver<Result<DecodedImage>>,
}

impl ImageLoad {
    pub fn spawn(path: PathBuf, generation: u64) -> Self {
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let _ = tx.send(decode_image(&path));
        });
        Self {
            generation,
            receiver: rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking; `None` while the decode is still running.
    pub fn poll(&self) -> Option<Result<DecodedImage>> {
        self.receiver.try_recv().ok()
    }
}

fn decode_image(path: &Path) -> Result<DecodedImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode background image at {}", path.display()))?;
    let mut rgba = image.to_rgba8();
    image::imageops::flip_vertical_in_place(&mut rgba);
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct VideoProbe {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f32,
}

/// Looping background video.
///
/// Dimensions come from an `ffprobe` run before any frame exists (the
/// video-equivalent of waiting for image decode to report a size); frames
/// are decoded by an `ffmpeg` child on a worker thread, paced to the
/// stream's native rate, and handed over a bounded channel. There is no
/// audio path, and reaching end-of-stream restarts the decoder.
pub(crate) struct VideoStream {
    width: u32,
    height: u32,
    frames: Option<Receiver<Vec<u8>>>,
    worker: Option<JoinHandle<()>>,
}

impl VideoStream {
    pub fn open(path: &Path) -> Result<Self> {
        let probe = probe_video(path)?;
        let (tx, rx) = bounded(2);
        let source = path.to_path_buf();
        let worker = thread::Builder::new()
            .name("rainpaper-video".into())
            .spawn(move || stream_frames(&source, probe, tx))
            .map_err(|err| anyhow!("failed to spawn video decode thread: {err}"))?;
        Ok(Self {
            width: probe.width,
            height: probe.height,
            frames: Some(rx),
            worker: Some(worker),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Most recent decoded frame, discarding any the frame loop fell
    /// behind on.
    pub fn latest_frame(&self) -> Option<Vec<u8>> {
        self.frames.as_ref()?.try_iter().last()
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        // Dropping the receiver first makes the worker's next send fail,
        // which kills the ffmpeg child and ends the decode loop.
        self.frames.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn probe_video(path: &Path) -> Result<VideoProbe> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .context("failed to launch ffprobe; is it installed?")?;
    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_output(line: &str) -> Result<VideoProbe> {
    let mut fields = line.trim().split(',');
    let width: u32 = fields
        .next()
        .and_then(|field| field.trim().parse().ok())
        .ok_or_else(|| anyhow!("ffprobe output missing video width"))?;
    let height: u32 = fields
        .next()
        .and_then(|field| field.trim().parse().ok())
        .ok_or_else(|| anyhow!("ffprobe output missing video height"))?;
    let frame_rate = fields
        .next()
        .map(parse_frame_rate)
        .unwrap_or(DEFAULT_FRAME_RATE);
    Ok(VideoProbe {
        width,
        height,
        frame_rate,
    })
}

const DEFAULT_FRAME_RATE: f32 = 30.0;

fn parse_frame_rate(field: &str) -> f32 {
    let field = field.trim();
    let parsed = match field.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f32 = numerator.trim().parse().unwrap_or(0.0);
            let denominator: f32 = denominator.trim().parse().unwrap_or(0.0);
            if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            }
        }
        None => field.parse().unwrap_or(0.0),
    };
    if parsed > 0.0 {
        parsed
    } else {
        DEFAULT_FRAME_RATE
    }
}

/// Frames must arrive bottom-row-first to match the flipped image upload
/// (both feed the same WebGL-convention `vUv`), so the decoder applies a
/// vertical flip.
fn decoder_command(path: &Path) -> Command {
    let mut command = Command::new("ffmpeg");
    command
        .args(["-loglevel", "error", "-i"])
        .arg(path)
        .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-vf", "vflip", "-an", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    command
}

fn spawn_decoder(path: &Path) -> Result<Child> {
    decoder_command(path)
        .spawn()
        .with_context(|| format!("failed to launch ffmpeg for {}", path.display()))
}

fn stream_frames(path: &Path, probe: VideoProbe, tx: Sender<Vec<u8>>) {
    let frame_len = (probe.width * probe.height * 4) as usize;
    let interval = Duration::from_secs_f32(1.0 / probe.frame_rate.max(1.0));

    // Outer loop restarts the decoder at end-of-stream, giving the looping
    // playback the original video element provided.
    loop {
        let mut child = match spawn_decoder(path) {
            Ok(child) => child,
            Err(err) => {
                warn!(error = %err, "video decoder unavailable; stopping stream");
                return;
            }
        };
        let Some(mut stdout) = child.stdout.take() else {
            warn!("ffmpeg child has no stdout; stopping stream");
            let _ = child.kill();
            let _ = child.wait();
            return;
        };

        let mut next_frame = Instant::now();
        loop {
            let mut frame = vec![0u8; frame_len];
            if stdout.read_exact(&mut frame).is_err() {
                // End of stream (or decoder death); restart for the loop.
                break;
            }
            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
            }
            next_frame += interval;
            if tx.send(frame).is_err() {
                // Receiver disposed; tear the child down and exit.
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
        }
        let _ = child.kill();
        let _ = child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_accepts_the_picker_whitelist() {
        assert_eq!(
            MediaKind::from_path(Path::new("bg.png")),
            Some(MediaKind::Image)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("photo.JPEG")),
            Some(MediaKind::Image)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("clip.webm")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::from_path(Path::new("clip.mp4")),
            Some(MediaKind::Video)
        );
    }

    #[test]
    fn media_kind_rejects_everything_else() {
        assert_eq!(MediaKind::from_path(Path::new("anim.gif")), None);
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn load_generation_is_strictly_increasing() {
        let mut generation = LoadGeneration::default();
        let first = generation.next();
        let second = generation.next();
        assert!(second > first);
        assert_eq!(generation.current(), second);
    }

    #[test]
    fn superseded_load_completions_are_stale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bg.png");
        image::RgbaImage::new(2, 2).save(&path).expect("write png");

        let mut generation = LoadGeneration::default();
        let first = ImageLoad::spawn(path.clone(), generation.next());
        // A second selection lands before the first decode is consumed.
        let second = ImageLoad::spawn(path, generation.next());

        first
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("worker reply")
            .expect("decode");
        assert!(!generation.is_current(first.generation()));
        assert!(generation.is_current(second.generation()));
    }

    #[test]
    fn decoder_flips_frames_to_match_image_uploads() {
        let command = decoder_command(Path::new("clip.mp4"));
        let args: Vec<_> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let filter = args.iter().position(|arg| arg == "-vf");
        assert_eq!(filter.map(|index| args[index + 1].as_str()), Some("vflip"));
        assert!(args.iter().any(|arg| arg == "rgba"));
    }

    #[test]
    fn probe_output_parses_dimensions_and_rate() {
        let probe = parse_probe_output("1920,1080,30000/1001\n").expect("probe");
        assert_eq!(probe.width, 1920);
        assert_eq!(probe.height, 1080);
        assert!((probe.frame_rate - 29.97).abs() < 0.01);
    }

    #[test]
    fn probe_output_defaults_bad_frame_rates() {
        let probe = parse_probe_output("640,360,0/0").expect("probe");
        assert_eq!(probe.frame_rate, DEFAULT_FRAME_RATE);
        let probe = parse_probe_output("640,360").expect("probe");
        assert_eq!(probe.frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn probe_output_requires_dimensions() {
        assert!(parse_probe_output("").is_err());
        assert!(parse_probe_output("1920").is_err());
    }

    #[test]
    fn image_load_reports_decode_failures() {
        let load = ImageLoad::spawn(PathBuf::from("/definitely/missing.png"), 1);
        assert_eq!(load.generation(), 1);
        let result = load
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("worker reply");
        assert!(result.is_err());
    }

    #[test]
    fn image_load_round_trips_a_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bg.png");
        let mut pixels = image::RgbaImage::new(4, 2);
        for pixel in pixels.pixels_mut() {
            *pixel = image::Rgba([10, 20, 30, 255]);
        }
        pixels.save(&path).expect("write png");

        let load = ImageLoad::spawn(path, 7);
        let decoded = load
            .receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("worker reply")
            .expect("decode");
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.pixels.len(), 4 * 2 * 4);
    }
}
