use std::io::BufReader;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hostproto::HostMessage;
use renderer::{ControlHandle, RendererConfig, Settings, WindowRuntime};

use crate::artwork;
use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::control;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref()).context("failed to load settings")?;
    let renderer_config = build_renderer_config(&args, &config)?;

    info!(
        shader = %renderer_config.shader_source.display(),
        width = renderer_config.surface_size.0,
        height = renderer_config.surface_size.1,
        fps = renderer_config.settings.frame_rate,
        "starting wallpaper"
    );

    let runtime = WindowRuntime::spawn(renderer_config)?;

    if args.control_stdin {
        let handle = runtime.handle();
        let stdin = std::io::stdin();
        control::pump(BufReader::new(stdin.lock()), |message| {
            dispatch(&handle, message)
        })?;
        // Host closed the control stream; take the wallpaper down with it.
        runtime.shutdown()
    } else {
        runtime.join()
    }
}

fn dispatch(handle: &ControlHandle, message: HostMessage) -> Result<()> {
    match message {
        HostMessage::Property(update) => handle.apply_property(update),
        HostMessage::Playback { is_paused } => handle.set_playback(is_paused),
        HostMessage::Track(info) => {
            artwork::handle_track(info.as_ref());
            Ok(())
        }
    }
}

/// Merges CLI flags over the settings file; flags win field by field.
fn build_renderer_config(args: &RunArgs, config: &AppConfig) -> Result<RendererConfig> {
    let shader_source = match args.shader.clone().or_else(|| config.shader.clone()) {
        Some(path) => path,
        None => bail!("no shader configured; pass one as an argument or set `shader` in the settings file"),
    };
    if !shader_source.exists() {
        bail!("shader not found at {}", shader_source.display());
    }

    Ok(RendererConfig {
        surface_size: args.size.unwrap_or(config.size),
        shader_source,
        media: args.media.clone().or_else(|| config.media.clone()),
        settings: Settings {
            frame_rate: args.fps.unwrap_or(config.fps),
            pixel_scale: args.scale.unwrap_or(config.scale),
            parallax_strength: args.parallax.unwrap_or(config.parallax),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            shader: None,
            media: None,
            size: None,
            fps: None,
            scale: None,
            parallax: None,
            config: None,
            control_stdin: false,
        }
    }

    fn shader_on_disk(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("rain.frag");
        std::fs::write(&path, "void main() {}\n").expect("write shader");
        path
    }

    #[test]
    fn cli_flags_override_the_settings_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let shader = shader_on_disk(&dir);

        let mut cli = args();
        cli.shader = Some(shader.clone());
        cli.fps = Some(60.0);
        let config = AppConfig {
            fps: 30.0,
            parallax: 3.0,
            ..AppConfig::default()
        };

        let merged = build_renderer_config(&cli, &config).expect("merge");
        assert_eq!(merged.shader_source, shader);
        assert_eq!(merged.settings.frame_rate, 60.0);
        // Untouched fields come from the file.
        assert_eq!(merged.settings.parallax_strength, 3.0);
        assert_eq!(merged.surface_size, (1920, 1080));
    }

    #[test]
    fn missing_shader_is_a_startup_error() {
        let cli = args();
        assert!(build_renderer_config(&cli, &AppConfig::default()).is_err());

        let mut cli = args();
        cli.shader = Some(PathBuf::from("/definitely/missing.frag"));
        assert!(build_renderer_config(&cli, &AppConfig::default()).is_err());
    }
}
