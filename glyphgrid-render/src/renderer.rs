//! High-level renderer that ties the GPU context, the glyph pipeline and
//! the shared font atlas together.
//!
//! ```text
//!  render(labels)                      render_also(labels)
//!    ├─ sync dirty atlas pages           │
//!    ├─ upload changed labels            ├─ upload changed labels
//!    └─ clear + draw                     └─ load + draw
//! ```

use thiserror::Error;
use wgpu::{
    Color, CommandEncoderDescriptor, LoadOp, Operations, RenderPassColorAttachment,
    RenderPassDescriptor, StoreOp, TextureView, TextureViewDescriptor,
};

use glyphgrid_atlas::{AtlasError, FontContext};

use crate::context::{GpuContext, GpuError};
use crate::label::{Label, LabelId};
use crate::pipelines::glyph::{AtlasTextures, GlyphPipeline, GpuLabel, GpuLabels};
use crate::vertex::LabelUniform;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("No surface configured (headless mode)")]
    NoSurface,
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Atlas(#[from] AtlasError),
}

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Glyph quads drawn, caret included.
    pub glyph_count: u32,
    pub draw_calls: u32,
    /// Atlas pages written to the GPU this frame.
    pub pages_uploaded: usize,
}

/// Draws labels with the glyph pipeline.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = TextRenderer::new(&gpu, 800, 600);
/// let stats = renderer.render(&gpu, &fonts, &view, &[&title], time);
/// renderer.render_also(&gpu, &fonts, &view, &[&footer], time);
/// ```
pub struct TextRenderer {
    pipeline: GlyphPipeline,
    atlas: AtlasTextures,
    labels: GpuLabels,
    clear_color: Color,
    viewport: [u32; 2],
}

impl TextRenderer {
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Self {
        Self {
            pipeline: GlyphPipeline::new(&gpu.device, gpu.surface_format),
            atlas: AtlasTextures::new(),
            labels: GpuLabels::new(),
            clear_color: Color {
                r: 0.12,
                g: 0.12,
                b: 0.13,
                a: 1.0,
            },
            viewport: [width.max(1), height.max(1)],
        }
    }

    /// Set the render target size in pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = [width, height];
    }

    pub fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    /// Set the background clear color.
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    /// Upload dirty atlas pages, clear `target` and draw `labels`.
    /// `time` is monotonic seconds and drives the caret blink.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        fonts: &FontContext,
        target: &TextureView,
        labels: &[&Label],
        time: f64,
    ) -> FrameStats {
        let pages_uploaded = {
            let mut manager = fonts.write();
            self.atlas
                .sync(&gpu.device, &gpu.queue, &self.pipeline, &mut manager)
        };
        let stats = self.draw(gpu, fonts, target, labels, time, LoadOp::Clear(self.clear_color));
        FrameStats {
            pages_uploaded,
            ..stats
        }
    }

    /// Draw more labels over `target` without clearing it or re-syncing
    /// the atlas. Glyphs first loaded after the last [`render`](Self::render)
    /// are skipped until the next one.
    pub fn render_also(
        &mut self,
        gpu: &GpuContext,
        fonts: &FontContext,
        target: &TextureView,
        labels: &[&Label],
        time: f64,
    ) -> FrameStats {
        let pending = pending_pages(fonts);
        if pending > 0 {
            log::debug!(
                "render_also: {pending} atlas page(s) not uploaded, their glyphs wait for the next render"
            );
        }
        self.draw(gpu, fonts, target, labels, time, LoadOp::Load)
    }

    /// Render `labels` into the window surface and present it.
    pub fn render_to_surface(
        &mut self,
        gpu: &GpuContext,
        fonts: &FontContext,
        labels: &[&Label],
        time: f64,
    ) -> Result<FrameStats, RenderError> {
        let surface = gpu.surface.as_ref().ok_or(RenderError::NoSurface)?;
        let output = surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        self.resize(output.texture.width(), output.texture.height());
        let stats = self.render(gpu, fonts, &view, labels, time);
        output.present();
        Ok(stats)
    }

    /// Drop the GPU buffers of a label that will not be drawn again.
    pub fn release(&mut self, label: LabelId) -> bool {
        self.labels.remove(&label).is_some()
    }

    /// Labels with live GPU buffers.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn atlas(&self) -> &AtlasTextures {
        &self.atlas
    }

    fn draw(
        &mut self,
        gpu: &GpuContext,
        fonts: &FontContext,
        target: &TextureView,
        labels: &[&Label],
        time: f64,
        load: LoadOp<Color>,
    ) -> FrameStats {
        let config = fonts.read().config().clone();
        let viewport = [self.viewport[0] as f32, self.viewport[1] as f32];

        // ── Upload ──────────────────────────────────────────────
        for label in labels {
            let gpu_label = self
                .labels
                .entry(label.id())
                .or_insert_with(|| GpuLabel::new(&gpu.device, &self.pipeline));
            gpu_label.update(&gpu.device, &gpu.queue, label);
            gpu_label.write_uniform(
                &gpu.queue,
                &LabelUniform::new(
                    label.position(),
                    label.scale(),
                    config.bezier_texel(),
                    config.grid_texel(),
                    viewport,
                ),
            );
        }

        // ── Encode ──────────────────────────────────────────────
        let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("glyphgrid_frame_encoder"),
        });
        let mut stats = FrameStats::default();
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("glyphgrid_text_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: Operations {
                        load,
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(self.pipeline.pipeline());
            for label in labels {
                let Some(gpu_label) = self.labels.get(&label.id()) else {
                    continue;
                };
                let (quads, calls) =
                    gpu_label.draw(&mut pass, &self.atlas, label.caret_visible(time));
                stats.glyph_count += quads;
                stats.draw_calls += calls;
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        stats
    }
}

/// Atlas pages written since their last upload.
fn pending_pages(fonts: &FontContext) -> usize {
    fonts.read().dirty_pages().count()
}

// ===================================================================
// Tests
// ===================================================================
