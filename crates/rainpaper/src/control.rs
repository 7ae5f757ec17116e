//! Host control bridge: newline-delimited JSON messages read from standard
//! input and dispatched into the render thread.

use std::io::BufRead;

use anyhow::{Context, Result};
use tracing::warn;

use hostproto::HostMessage;

/// Reads control lines until end-of-stream, feeding each decoded message to
/// `sink`. Malformed lines are logged and skipped so one bad message never
/// kills the bridge; a sink error (the render thread went away) ends the
/// loop.
pub fn pump(reader: impl BufRead, mut sink: impl FnMut(HostMessage) -> Result<()>) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("failed to read control stream")?;
        if line.trim().is_empty() {
            continue;
        }
        match HostMessage::parse_line(&line) {
            Ok(message) => sink(message)?,
            Err(err) => {
                warn!(error = %err, line, "discarding malformed control message");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostproto::PropertyUpdate;
    use std::io::Cursor;

    fn collect(input: &str) -> Vec<HostMessage> {
        let mut messages = Vec::new();
        pump(Cursor::new(input), |message| {
            messages.push(message);
            Ok(())
        })
        .expect("pump");
        messages
    }

    #[test]
    fn dispatches_each_line_in_order() {
        let messages = collect(concat!(
            r#"{"type":"property","name":"brightness","value":80}"#,
            "\n",
            r#"{"type":"playback","IsPaused":true}"#,
            "\n",
        ));
        assert_eq!(
            messages,
            vec![
                HostMessage::Property(PropertyUpdate::Brightness(0.8)),
                HostMessage::Playback { is_paused: true },
            ]
        );
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let messages = collect(concat!(
            "\n",
            "definitely not json\n",
            r#"{"type":"property","name":"fpsLock","value":false}"#,
            "\n",
        ));
        assert_eq!(
            messages,
            vec![HostMessage::Property(PropertyUpdate::FpsLock(60.0))]
        );
    }

    #[test]
    fn sink_errors_stop_the_loop() {
        let mut calls = 0;
        let result = pump(
            Cursor::new(concat!(
                r#"{"type":"playback","IsPaused":false}"#,
                "\n",
                r#"{"type":"playback","IsPaused":true}"#,
                "\n",
            )),
            |_| {
                calls += 1;
                anyhow::bail!("render thread gone")
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
