use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Blur iteration counts selected by the `blurQuality` quality index.
pub const BLUR_QUALITY_STEPS: [i32; 4] = [1, 16, 32, 64];

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("property '{name}' expects {expected}, got {got}")]
    InvalidValue {
        name: String,
        expected: &'static str,
        got: Value,
    },
    #[error("property '{name}' index {index} is out of range (max {max})")]
    IndexOutOfRange {
        name: String,
        index: u64,
        max: usize,
    },
}

/// One decoded property change from the host's control panel.
///
/// Slider properties arrive as integer percentages and are normalised to
/// their uniform-space values here, so consumers only ever see final
/// numbers. Names this build does not recognise decode to [`Unknown`]
/// rather than an error; new host versions must not break old renderers.
///
/// [`Unknown`]: PropertyUpdate::Unknown
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyUpdate {
    RainIntensity(f32),
    RainSpeed(f32),
    Brightness(f32),
    RainNormal(f32),
    RainZoom(f32),
    BlurIntensity(f32),
    /// Iteration count resolved from the quality index.
    BlurQuality(i32),
    MediaSelect(PathBuf),
    /// `true` scales the background to fill the surface.
    MediaScaling(bool),
    Panning(bool),
    Lightning(bool),
    PostProcessing(bool),
    ParallaxIntensity(f32),
    /// Target frame rate; the host exposes this as a boolean 30/60 toggle.
    FpsLock(f32),
    DisplayScaling(f32),
    Debug(bool),
    Unknown {
        name: String,
    },
}

impl PropertyUpdate {
    pub fn parse(name: &str, value: &Value) -> Result<Self, PropertyError> {
        let update = match name {
            "rainIntensity" => PropertyUpdate::RainIntensity(slider(name, value)?),
            "rainSpeed" => PropertyUpdate::RainSpeed(slider(name, value)?),
            "brightness" => PropertyUpdate::Brightness(slider(name, value)?),
            "rainNormal" => PropertyUpdate::RainNormal(slider(name, value)?),
            "rainZoom" => PropertyUpdate::RainZoom(slider(name, value)?),
            "blurIntensity" => PropertyUpdate::BlurIntensity(slider(name, value)?),
            "blurQuality" => {
                let index = index_into(name, value, BLUR_QUALITY_STEPS.len())?;
                PropertyUpdate::BlurQuality(BLUR_QUALITY_STEPS[index])
            }
            "mediaSelect" => PropertyUpdate::MediaSelect(PathBuf::from(string(name, value)?)),
            "mediaScaling" => {
                let index = index_into(name, value, 2)?;
                PropertyUpdate::MediaScaling(index == 1)
            }
            "animateChk" => PropertyUpdate::Panning(boolean(name, value)?),
            "lightningChk" => PropertyUpdate::Lightning(boolean(name, value)?),
            "postProcessingChk" => PropertyUpdate::PostProcessing(boolean(name, value)?),
            "parallaxIntensity" => PropertyUpdate::ParallaxIntensity(number(name, value)?),
            "fpsLock" => {
                let locked = boolean(name, value)?;
                PropertyUpdate::FpsLock(if locked { 30.0 } else { 60.0 })
            }
            "displayScaling" => PropertyUpdate::DisplayScaling(number(name, value)?),
            "debug" => PropertyUpdate::Debug(boolean(name, value)?),
            _ => PropertyUpdate::Unknown {
                name: name.to_owned(),
            },
        };
        Ok(update)
    }
}

/// Integer percentage, mapped into uniform space by dividing by 100.
fn slider(name: &str, value: &Value) -> Result<f32, PropertyError> {
    Ok(number(name, value)? / 100.0)
}

fn number(name: &str, value: &Value) -> Result<f32, PropertyError> {
    value
        .as_f64()
        .map(|number| number as f32)
        .ok_or_else(|| PropertyError::InvalidValue {
            name: name.to_owned(),
            expected: "a number",
            got: value.clone(),
        })
}

fn boolean(name: &str, value: &Value) -> Result<bool, PropertyError> {
    // Hosts have sent both JSON booleans and 0/1 for checkboxes.
    if let Some(flag) = value.as_bool() {
        return Ok(flag);
    }
    if let Some(number) = value.as_i64() {
        return Ok(number != 0);
    }
    Err(PropertyError::InvalidValue {
        name: name.to_owned(),
        expected: "a boolean",
        got: value.clone(),
    })
}

fn index_into(name: &str, value: &Value, len: usize) -> Result<usize, PropertyError> {
    let index = value.as_u64().ok_or_else(|| PropertyError::InvalidValue {
        name: name.to_owned(),
        expected: "an index",
        got: value.clone(),
    })?;
    if (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(PropertyError::IndexOutOfRange {
            name: name.to_owned(),
            index,
            max: len - 1,
        })
    }
}

fn string<'v>(name: &str, value: &'v Value) -> Result<&'v str, PropertyError> {
    value.as_str().ok_or_else(|| PropertyError::InvalidValue {
        name: name.to_owned(),
        expected: "a string",
        got: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sliders_are_normalised_to_percent() {
        let update = PropertyUpdate::parse("rainIntensity", &json!(40)).expect("parse");
        assert_eq!(update, PropertyUpdate::RainIntensity(0.4));
        let update = PropertyUpdate::parse("rainZoom", &json!(261)).expect("parse");
        assert_eq!(update, PropertyUpdate::RainZoom(2.61));
    }

    #[test]
    fn blur_quality_maps_index_to_iterations() {
        for (index, iterations) in BLUR_QUALITY_STEPS.iter().enumerate() {
            let update = PropertyUpdate::parse("blurQuality", &json!(index)).expect("parse");
            assert_eq!(update, PropertyUpdate::BlurQuality(*iterations));
        }
        assert!(PropertyUpdate::parse("blurQuality", &json!(4)).is_err());
    }

    #[test]
    fn fps_lock_toggles_between_thirty_and_sixty() {
        assert_eq!(
            PropertyUpdate::parse("fpsLock", &json!(true)).expect("parse"),
            PropertyUpdate::FpsLock(30.0)
        );
        assert_eq!(
            PropertyUpdate::parse("fpsLock", &json!(false)).expect("parse"),
            PropertyUpdate::FpsLock(60.0)
        );
    }

    #[test]
    fn checkboxes_accept_bools_and_integers() {
        assert_eq!(
            PropertyUpdate::parse("lightningChk", &json!(true)).expect("parse"),
            PropertyUpdate::Lightning(true)
        );
        assert_eq!(
            PropertyUpdate::parse("lightningChk", &json!(0)).expect("parse"),
            PropertyUpdate::Lightning(false)
        );
        assert!(PropertyUpdate::parse("lightningChk", &json!("yes")).is_err());
    }

    #[test]
    fn media_scaling_is_an_index_into_fit_fill() {
        assert_eq!(
            PropertyUpdate::parse("mediaScaling", &json!(0)).expect("parse"),
            PropertyUpdate::MediaScaling(false)
        );
        assert_eq!(
            PropertyUpdate::parse("mediaScaling", &json!(1)).expect("parse"),
            PropertyUpdate::MediaScaling(true)
        );
    }

    #[test]
    fn media_select_carries_the_path() {
        let update =
            PropertyUpdate::parse("mediaSelect", &json!("/tmp/bg.png")).expect("parse");
        assert_eq!(
            update,
            PropertyUpdate::MediaSelect(PathBuf::from("/tmp/bg.png"))
        );
    }

    #[test]
    fn unrecognised_names_are_preserved_not_rejected() {
        let update = PropertyUpdate::parse("futureKnob", &json!(1)).expect("parse");
        assert_eq!(
            update,
            PropertyUpdate::Unknown {
                name: "futureKnob".to_owned()
            }
        );
    }
}
