use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "rainpaper",
    author,
    version,
    about = "Shader-driven rain wallpaper daemon",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the rain fragment shader. Defaults to the configured shader.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Background image (jpg/jpeg/png) or video (mp4/webm) to install at
    /// startup.
    #[arg(long, value_name = "PATH")]
    pub media: Option<PathBuf>,

    /// Override the window resolution (e.g. `1920x1080`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Target frame rate.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Display scale multiplied onto the device pixel ratio (0.1-2.0).
    #[arg(long, value_name = "SCALE")]
    pub scale: Option<f32>,

    /// Pointer parallax strength; 0 disables the effect.
    #[arg(long, value_name = "STRENGTH")]
    pub parallax: Option<f32>,

    /// Settings file to load instead of the default location.
    #[arg(long, value_name = "FILE", env = "RAINPAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read host control messages from standard input.
    #[arg(long)]
    pub control_stdin: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{value}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{value}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got '{value}'"));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parses_both_separators() {
        assert_eq!(parse_size("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_size("1280X720"), Ok((1280, 720)));
    }

    #[test]
    fn size_rejects_garbage_and_zero() {
        assert!(parse_size("1920").is_err());
        assert!(parse_size("0x1080").is_err());
        assert!(parse_size("widexhigh").is_err());
    }
}
