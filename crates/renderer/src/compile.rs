use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

/// Compiles the built-in full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Wraps the rain fragment shader with our uniform prelude and compiles it
/// as Vulkan GLSL through naga.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    let wrapped = wrap_rain_fragment(source);

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("rain fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Uniform names the prelude declares itself; matching declarations in the
/// loaded shader text are stripped before wrapping.
const DECLARED_UNIFORMS: [&str; 15] = [
    "u_tex0",
    "u_time",
    "u_intensity",
    "u_speed",
    "u_brightness",
    "u_normal",
    "u_zoom",
    "u_blur_intensity",
    "u_blur_iterations",
    "u_panning",
    "u_post_processing",
    "u_lightning",
    "u_texture_fill",
    "u_resolution",
    "u_tex0_resolution",
];

/// Produces a self-contained GLSL fragment shader from the WebGL-style rain
/// shader source.
///
/// Steps performed:
///
/// 1. Strip `#version` and `precision` directives plus `uniform`/`varying`
///    declarations covered by the prelude, so we can inject our own.
/// 2. Prepend [`HEADER`] which declares the std140 uniform block, the
///    background texture bindings, and macro aliases for the legacy names.
///
/// The shader's own `main` remains the entry point; `gl_FragColor` is
/// remapped to the fragment output via a macro.
fn wrap_rain_fragment(source: &str) -> String {
    let mut sanitized = String::new();
    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
            continue;
        }
        if trimmed.starts_with("varying ") && trimmed.contains("vUv") {
            continue;
        }
        let covered_uniform = trimmed.starts_with("uniform ")
            && DECLARED_UNIFORMS.iter().any(|name| trimmed.contains(name));
        if covered_uniform {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    format!("{HEADER}\n#line 1\n{sanitized}")
}

/// GLSL prologue injected ahead of the rain fragment shader.
///
/// The uniform block layout must match `RainUniforms` in `gpu/uniforms.rs`.
/// Boolean uniforms are carried as ints and re-exposed as boolean
/// expressions so `if (u_panning)` keeps compiling unmodified.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 vUv;
layout(location = 0) out vec4 rainpaper_out_color;
#define gl_FragColor rainpaper_out_color

layout(std140, set = 0, binding = 0) uniform RainParams {
    vec2 _u_resolution;
    vec2 _u_tex0_resolution;
    vec2 _u_parallax;
    float _u_time;
    float _u_intensity;
    float _u_speed;
    float _u_brightness;
    float _u_normal;
    float _u_zoom;
    float _u_blur_intensity;
    int _u_blur_iterations;
    int _u_panning;
    int _u_post_processing;
    int _u_lightning;
    int _u_texture_fill;
    float _u_parallax_zoom;
    float _padding0;
} ubo;

#define u_resolution ubo._u_resolution
#define u_tex0_resolution ubo._u_tex0_resolution
#define u_time ubo._u_time
#define u_intensity ubo._u_intensity
#define u_speed ubo._u_speed
#define u_brightness ubo._u_brightness
#define u_normal ubo._u_normal
#define u_zoom ubo._u_zoom
#define u_blur_intensity ubo._u_blur_intensity
#define u_blur_iterations ubo._u_blur_iterations
#define u_panning (ubo._u_panning != 0)
#define u_post_processing (ubo._u_post_processing != 0)
#define u_lightning (ubo._u_lightning != 0)
#define u_texture_fill (ubo._u_texture_fill != 0)

layout(set = 1, binding = 0) uniform texture2D rainpaper_tex0;
layout(set = 1, binding = 1) uniform sampler rainpaper_tex0_sampler;
#define u_tex0 sampler2D(rainpaper_tex0, rainpaper_tex0_sampler)
";

/// Full-screen triangle vertex stage. The parallax translate and its slight
/// over-zoom (the original applied `scale(1.09)` to the whole canvas while
/// panning with the pointer) happen here so the fragment stage stays opaque.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 vUv;

layout(std140, set = 0, binding = 0) uniform RainParams {
    vec2 _u_resolution;
    vec2 _u_tex0_resolution;
    vec2 _u_parallax;
    float _u_time;
    float _u_intensity;
    float _u_speed;
    float _u_brightness;
    float _u_normal;
    float _u_zoom;
    float _u_blur_intensity;
    int _u_blur_iterations;
    int _u_panning;
    int _u_post_processing;
    int _u_lightning;
    int _u_texture_fill;
    float _u_parallax_zoom;
    float _padding0;
} ubo;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    vUv = pos * 0.5 + vec2(0.5, 0.5);
    vec2 extent = max(ubo._u_resolution, vec2(1.0));
    vec2 shift = (ubo._u_parallax * 2.0) / extent;
    gl_Position = vec4(pos * ubo._u_parallax_zoom + shift, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_covered_declarations() {
        let source = r#"
            #version 300 es
            precision highp float;
            varying vec2 vUv;
            uniform float u_time;
            uniform sampler2D u_tex0;
            uniform vec2 u_resolution;
            void main() {
                gl_FragColor = texture(u_tex0, vUv) * u_time;
            }
        "#;

        let wrapped = wrap_rain_fragment(source);
        assert!(!wrapped.contains("uniform float u_time"));
        assert!(!wrapped.contains("uniform sampler2D u_tex0"));
        assert!(!wrapped.contains("precision highp"));
        assert!(wrapped.contains("#define u_time"));
        assert!(wrapped.contains("rainpaper_out_color"));
        // The shader's own entry point survives wrapping.
        assert!(wrapped.contains("void main()"));
    }

    #[test]
    fn wrap_keeps_unrelated_uniforms() {
        let source = "uniform float u_custom_knob;\nvoid main() {}\n";
        let wrapped = wrap_rain_fragment(source);
        assert!(wrapped.contains("uniform float u_custom_knob;"));
    }
}
