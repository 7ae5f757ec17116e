use serde::Deserialize;
use thiserror::Error;

use crate::property::{PropertyError, PropertyUpdate};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Now-playing metadata; every field is optional because hosts send `null`
/// between tracks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackInfo {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Artist")]
    pub artist: Option<String>,
    /// Album art as base64 PNG, with or without a `data:image/` prefix.
    #[serde(rename = "Thumbnail")]
    pub thumbnail: Option<String>,
}

/// One line of the host's control stream.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    Property(PropertyUpdate),
    Playback { is_paused: bool },
    Track(Option<TrackInfo>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawMessage {
    Property {
        name: String,
        value: serde_json::Value,
    },
    Playback {
        #[serde(rename = "IsPaused")]
        is_paused: bool,
    },
    Track {
        #[serde(flatten)]
        info: Option<TrackInfo>,
    },
}

impl HostMessage {
    /// Decodes one newline-delimited JSON control message.
    pub fn parse_line(line: &str) -> Result<Self, ProtocolError> {
        let raw: RawMessage = serde_json::from_str(line)?;
        Ok(match raw {
            RawMessage::Property { name, value } => {
                HostMessage::Property(PropertyUpdate::parse(&name, &value)?)
            }
            RawMessage::Playback { is_paused } => HostMessage::Playback { is_paused },
            RawMessage::Track { info } => {
                // An all-null track means nothing is playing.
                let info = info.filter(|track| {
                    track.title.is_some() || track.artist.is_some() || track.thumbnail.is_some()
                });
                HostMessage::Track(info)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lines_decode_through_the_dispatcher() {
        let message =
            HostMessage::parse_line(r#"{"type":"property","name":"rainSpeed","value":25}"#)
                .expect("parse");
        assert_eq!(
            message,
            HostMessage::Property(PropertyUpdate::RainSpeed(0.25))
        );
    }

    #[test]
    fn playback_lines_carry_the_pause_flag() {
        let message = HostMessage::parse_line(r#"{"type":"playback","IsPaused":true}"#)
            .expect("parse");
        assert_eq!(message, HostMessage::Playback { is_paused: true });
    }

    #[test]
    fn track_lines_decode_metadata() {
        let message = HostMessage::parse_line(
            r#"{"type":"track","Title":"Hello","Artist":"World","Thumbnail":null}"#,
        )
        .expect("parse");
        let HostMessage::Track(Some(track)) = message else {
            panic!("expected track metadata");
        };
        assert_eq!(track.title.as_deref(), Some("Hello"));
        assert_eq!(track.artist.as_deref(), Some("World"));
        assert!(track.thumbnail.is_none());
    }

    #[test]
    fn all_null_track_means_nothing_playing() {
        let message = HostMessage::parse_line(
            r#"{"type":"track","Title":null,"Artist":null,"Thumbnail":null}"#,
        )
        .expect("parse");
        assert_eq!(message, HostMessage::Track(None));
    }

    #[test]
    fn garbage_is_a_malformed_error() {
        assert!(matches!(
            HostMessage::parse_line("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            HostMessage::parse_line(r#"{"type":"mystery"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
