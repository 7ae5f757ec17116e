use std::path::Path;

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use hostproto::PropertyUpdate;

use crate::media::{ActiveMedia, ImageLoad, LoadGeneration, MediaKind, VideoStream};
use crate::types::RendererConfig;

use super::context::GpuContext;
use super::pipeline::{BackgroundTexture, PipelineLayouts, RainPipeline};
use super::uniforms::{effective_resolution, RainUniforms};

/// All GPU-side state for one wallpaper surface: device objects, the rain
/// pipeline, the uniform block, and whatever background media is active.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipeline: RainPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: RainUniforms,
    scale_factor: f32,
    pixel_scale: f32,
    media_generation: LoadGeneration,
    pending_image: Option<ImageLoad>,
    active_media: ActiveMedia,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        physical_size: PhysicalSize<u32>,
        scale_factor: f32,
        config: &RendererConfig,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, physical_size)?;
        let layouts = PipelineLayouts::new(&context.device)?;
        let pipeline = RainPipeline::new(
            &context.device,
            &context.queue,
            &layouts,
            context.surface_format,
            &config.shader_source,
        )?;

        let pixel_scale = config.settings.pixel_scale;
        let (width, height) = shader_resolution(physical_size, scale_factor, pixel_scale);
        let uniforms = RainUniforms::new(width, height);

        let uniform_buffer =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("rain uniforms"),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("rain uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let mut state = Self {
            context,
            layouts,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
            scale_factor,
            pixel_scale,
            media_generation: LoadGeneration::default(),
            pending_image: None,
            active_media: ActiveMedia::None,
        };

        if let Some(media) = &config.media {
            state.select_media(media);
        }

        Ok(state)
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
        self.refresh_resolution();
    }

    pub(crate) fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
        self.refresh_resolution();
    }

    fn refresh_resolution(&mut self) {
        let (width, height) =
            shader_resolution(self.context.size, self.scale_factor, self.pixel_scale);
        self.uniforms.set_resolution(width, height);
    }

    /// Replaces the background media. Unsupported file types are ignored so
    /// a bad host selection never tears down a working scene.
    pub(crate) fn select_media(&mut self, path: &Path) {
        let Some(kind) = MediaKind::from_path(path) else {
            warn!(path = %path.display(), "unsupported media selection ignored");
            return;
        };

        // Dispose before acquire: drop any running video (killing its
        // decoder) and cancel an in-flight image load, then reset the
        // texture so a failed load leaves black rather than stale frames.
        self.active_media = ActiveMedia::None;
        self.pending_image = None;
        self.install_background(BackgroundTexture::placeholder(
            &self.context.device,
            &self.context.queue,
        ));

        match kind {
            MediaKind::Image => {
                let generation = self.media_generation.next();
                debug!(path = %path.display(), generation, "loading background image");
                self.pending_image = Some(ImageLoad::spawn(path.to_path_buf(), generation));
            }
            MediaKind::Video => match VideoStream::open(path) {
                Ok(stream) => {
                    let (width, height) = stream.dimensions();
                    info!(path = %path.display(), width, height, "streaming background video");
                    self.install_background(BackgroundTexture::for_video(
                        &self.context.device,
                        &self.context.queue,
                        width,
                        height,
                    ));
                    self.uniforms
                        .set_tex0_resolution(width as f32, height as f32);
                    self.active_media = ActiveMedia::Video(stream);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "background video unavailable");
                }
            },
        }
    }

    /// Completes an off-thread image decode if one has finished. Results
    /// from superseded selections are discarded.
    pub(crate) fn poll_media(&mut self) {
        let Some(load) = &self.pending_image else {
            return;
        };
        let Some(result) = load.poll() else {
            return;
        };
        let generation = load.generation();
        self.pending_image = None;

        if !self.media_generation.is_current(generation) {
            debug!(generation, "stale image load discarded");
            return;
        }

        match result {
            Ok(image) => {
                self.install_background(BackgroundTexture::from_pixels(
                    &self.context.device,
                    &self.context.queue,
                    image.width,
                    image.height,
                    &image.pixels,
                ));
                self.uniforms
                    .set_tex0_resolution(image.width as f32, image.height as f32);
                self.active_media = ActiveMedia::Image;
            }
            Err(err) => {
                warn!(error = %err, "background image failed to load");
            }
        }
    }

    /// Uploads the newest decoded video frame, if any arrived since the
    /// last render.
    pub(crate) fn advance_video(&mut self) {
        if let ActiveMedia::Video(stream) = &self.active_media {
            if let Some(frame) = stream.latest_frame() {
                self.pipeline
                    .background()
                    .write_frame(&self.context.queue, &frame);
            }
        }
    }

    fn install_background(&mut self, background: BackgroundTexture) {
        self.pipeline
            .set_background(&self.context.device, &self.layouts, background);
    }

    /// Applies one host property to the uniform store or media slot.
    /// Window-level properties are routed before reaching here; anything
    /// else left over is a no-op by construction.
    pub(crate) fn apply_property(&mut self, update: &PropertyUpdate) {
        match update {
            PropertyUpdate::RainIntensity(value) => self.uniforms.set_intensity(*value),
            PropertyUpdate::RainSpeed(value) => self.uniforms.set_speed(*value),
            PropertyUpdate::Brightness(value) => self.uniforms.set_brightness(*value),
            PropertyUpdate::RainNormal(value) => self.uniforms.set_normal(*value),
            PropertyUpdate::RainZoom(value) => self.uniforms.set_zoom(*value),
            PropertyUpdate::BlurIntensity(value) => self.uniforms.set_blur_intensity(*value),
            PropertyUpdate::BlurQuality(iterations) => {
                self.uniforms.set_blur_iterations(*iterations)
            }
            PropertyUpdate::Panning(enabled) => self.uniforms.set_panning(*enabled),
            PropertyUpdate::Lightning(enabled) => self.uniforms.set_lightning(*enabled),
            PropertyUpdate::PostProcessing(enabled) => self.uniforms.set_post_processing(*enabled),
            PropertyUpdate::MediaScaling(fill) => self.uniforms.set_texture_fill(*fill),
            PropertyUpdate::MediaSelect(path) => self.select_media(path),
            PropertyUpdate::DisplayScaling(scale) => {
                self.pixel_scale = *scale;
                self.refresh_resolution();
            }
            _ => {}
        }
    }

    /// Draws one frame at the given scene time and parallax offset.
    pub(crate) fn render(
        &mut self,
        elapsed: f32,
        parallax: (f32, f32),
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        self.uniforms.set_time(elapsed);
        self.uniforms.set_parallax(parallax.0, parallax.1);
        self.context.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms),
        );

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("rain frame"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rain pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.pipeline.background_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub(crate) fn surface_size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Loss of the surface (compositor restart, output re-plug) is handled
    /// by reconfiguring at the current size.
    pub(crate) fn recover_surface(&mut self) {
        let size = self.context.size;
        self.context.resize(size);
    }
}

fn shader_resolution(
    physical: PhysicalSize<u32>,
    scale_factor: f32,
    pixel_scale: f32,
) -> (f32, f32) {
    let scale = scale_factor.max(f32::EPSILON);
    let logical = (
        physical.width as f32 / scale,
        physical.height as f32 / scale,
    );
    effective_resolution(logical, scale, pixel_scale)
}
