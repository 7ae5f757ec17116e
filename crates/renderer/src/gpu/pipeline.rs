use std::path::Path;

use anyhow::{Context, Result};
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::compile::{compile_fragment_shader, compile_vertex_shader};

/// Bind group layouts shared by the pipeline: group 0 is the uniform block,
/// group 1 the background texture and its sampler.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let vertex_module = compile_vertex_shader(device)?;

        Ok(Self {
            uniform_layout,
            texture_layout,
            vertex_module,
        })
    }
}

/// The background (`u_tex0`) GPU resources. Exactly one exists at a time;
/// replacing it drops the previous texture.
pub(crate) struct BackgroundTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl BackgroundTexture {
    /// Uploads a decoded RGBA image.
    pub fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("background texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            pixels,
        );
        Self::from_texture(device, texture, width, height)
    }

    /// Black placeholder used before any media is selected, and between a
    /// disposal and the next load completing.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_pixels(device, queue, 1, 1, &[0, 0, 0, 255])
    }

    /// Zero-initialised target for streamed video frames; dimensions come
    /// from the container probe.
    pub fn for_video(device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) -> Self {
        let zeroed = vec![0u8; (width * height * 4) as usize];
        Self::from_pixels(device, queue, width, height, &zeroed)
    }

    fn from_texture(device: &wgpu::Device, texture: wgpu::Texture, width: u32, height: u32) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Overwrites the texture contents with one decoded video frame.
    pub fn write_frame(&self, queue: &wgpu::Queue, data: &[u8]) {
        let expected_len = (self.width * self.height * 4) as usize;
        if data.len() != expected_len {
            tracing::warn!(
                expected_len,
                actual_len = data.len(),
                "video frame ignored due to mismatched payload size"
            );
            return;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// The single full-screen pass: render pipeline plus the background bind
/// group. There is no scene hierarchy beyond this.
pub(crate) struct RainPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub background_bind_group: wgpu::BindGroup,
    background: BackgroundTexture,
}

impl RainPipeline {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
        shader_path: &Path,
    ) -> Result<Self> {
        let shader_code = std::fs::read_to_string(shader_path)
            .with_context(|| format!("failed to read shader at {}", shader_path.display()))?;
        let fragment_module = compile_fragment_shader(device, &shader_code)
            .context("failed to compile rain shader")?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rain pipeline layout"),
            bind_group_layouts: &[&layouts.uniform_layout, &layouts.texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rain pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &layouts.vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let background = BackgroundTexture::placeholder(device, queue);
        let background_bind_group = build_background_bind_group(device, layouts, &background);

        Ok(Self {
            pipeline,
            background_bind_group,
            background,
        })
    }

    pub fn background(&self) -> &BackgroundTexture {
        &self.background
    }

    /// Installs a new background texture, dropping the previous one and
    /// rebuilding the bind group that references it.
    pub fn set_background(
        &mut self,
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        background: BackgroundTexture,
    ) {
        self.background = background;
        self.background_bind_group = build_background_bind_group(device, layouts, &self.background);
    }
}

fn build_background_bind_group(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    background: &BackgroundTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("background bind group"),
        layout: &layouts.texture_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&background.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&background.sampler),
            },
        ],
    })
}
