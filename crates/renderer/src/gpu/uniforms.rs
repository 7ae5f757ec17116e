use bytemuck::{Pod, Zeroable};

/// Inclusive value ranges declared by the control panel of the original
/// scene. Slider writes are clamped into these regardless of what the host
/// sends.
pub const INTENSITY_RANGE: (f32, f32) = (0.0, 1.0);
pub const SPEED_RANGE: (f32, f32) = (0.0, 10.0);
pub const BRIGHTNESS_RANGE: (f32, f32) = (0.0, 1.0);
pub const NORMAL_RANGE: (f32, f32) = (0.0, 3.0);
pub const ZOOM_RANGE: (f32, f32) = (0.1, 3.0);
pub const BLUR_INTENSITY_RANGE: (f32, f32) = (0.0, 10.0);
pub const BLUR_ITERATIONS_RANGE: (i32, i32) = (1, 64);

/// Extra zoom applied by the vertex stage while pointer parallax is active,
/// hiding the edges uncovered by the translate.
pub(crate) const PARALLAX_ZOOM: f32 = 1.09;

/// std140 uniform block backing the rain shader.
///
/// Field order and types must match the `RainParams` block declared in
/// `compile.rs`; booleans travel as ints because std140 has no bool layout
/// worth relying on.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct RainUniforms {
    resolution: [f32; 2],
    tex0_resolution: [f32; 2],
    parallax: [f32; 2],
    time: f32,
    intensity: f32,
    speed: f32,
    brightness: f32,
    normal: f32,
    zoom: f32,
    blur_intensity: f32,
    blur_iterations: i32,
    panning: i32,
    post_processing: i32,
    lightning: i32,
    texture_fill: i32,
    parallax_zoom: f32,
    padding0: f32,
}

unsafe impl Zeroable for RainUniforms {}
unsafe impl Pod for RainUniforms {}

impl RainUniforms {
    /// Defaults match the shipped scene before any host property arrives.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            resolution: [width, height],
            tex0_resolution: [width, height],
            parallax: [0.0, 0.0],
            time: 0.0,
            intensity: 0.4,
            speed: 0.25,
            brightness: 0.8,
            normal: 0.5,
            zoom: 2.61,
            blur_intensity: 0.5,
            blur_iterations: 16,
            panning: 0,
            post_processing: 1,
            lightning: 0,
            texture_fill: 1,
            parallax_zoom: 1.0,
            padding0: 0.0,
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.resolution = [width, height];
    }

    pub fn set_tex0_resolution(&mut self, width: f32, height: f32) {
        self.tex0_resolution = [width, height];
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    /// Pixel offset of the parallax translate; `(0, 0)` also drops the
    /// parallax over-zoom back to 1.0.
    pub fn set_parallax(&mut self, offset_x: f32, offset_y: f32) {
        self.parallax = [offset_x, offset_y];
        self.parallax_zoom = if offset_x == 0.0 && offset_y == 0.0 {
            1.0
        } else {
            PARALLAX_ZOOM
        };
    }

    pub fn set_intensity(&mut self, value: f32) {
        self.intensity = clamp_range(value, INTENSITY_RANGE);
    }

    pub fn set_speed(&mut self, value: f32) {
        self.speed = clamp_range(value, SPEED_RANGE);
    }

    pub fn set_brightness(&mut self, value: f32) {
        self.brightness = clamp_range(value, BRIGHTNESS_RANGE);
    }

    pub fn set_normal(&mut self, value: f32) {
        self.normal = clamp_range(value, NORMAL_RANGE);
    }

    pub fn set_zoom(&mut self, value: f32) {
        self.zoom = clamp_range(value, ZOOM_RANGE);
    }

    pub fn set_blur_intensity(&mut self, value: f32) {
        self.blur_intensity = clamp_range(value, BLUR_INTENSITY_RANGE);
    }

    pub fn set_blur_iterations(&mut self, value: i32) {
        self.blur_iterations = value.clamp(BLUR_ITERATIONS_RANGE.0, BLUR_ITERATIONS_RANGE.1);
    }

    pub fn set_panning(&mut self, enabled: bool) {
        self.panning = enabled as i32;
    }

    pub fn set_post_processing(&mut self, enabled: bool) {
        self.post_processing = enabled as i32;
    }

    pub fn set_lightning(&mut self, enabled: bool) {
        self.lightning = enabled as i32;
    }

    pub fn set_texture_fill(&mut self, fill: bool) {
        self.texture_fill = fill as i32;
    }
}

fn clamp_range(value: f32, (min, max): (f32, f32)) -> f32 {
    value.clamp(min, max)
}

/// Resolution handed to the shader: logical window size scaled by the device
/// pixel ratio and the user display scale.
pub(crate) fn effective_resolution(
    logical: (f32, f32),
    device_pixel_ratio: f32,
    pixel_scale: f32,
) -> (f32, f32) {
    let factor = device_pixel_ratio * pixel_scale;
    (logical.0 * factor, logical.1 * factor)
}
