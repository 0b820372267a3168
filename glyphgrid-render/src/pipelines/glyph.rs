//! Glyph render pipeline: analytic coverage of atlas-encoded curves.
//!
//! Group 0 holds the per-label uniform. Group 1 holds one atlas page's
//! bezier and grid textures, read with `textureLoad` (no sampler).
//! A label's quads are drawn one page group at a time so each page's
//! bind group is set once per label.

use std::collections::HashMap;
use std::ops::Range;

use glyphgrid_atlas::{AtlasPage, FontManager};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BlendState, Buffer, BufferBindingType,
    BufferDescriptor, BufferUsages, ColorTargetState, ColorWrites, Device, Extent3d,
    FragmentState, FrontFace, IndexFormat, MultisampleState, PipelineCompilationOptions,
    PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology, Queue, RenderPass,
    RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderStages, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDimension, VertexState,
};

use crate::label::{Label, LabelId};
use crate::vertex::{quad_indices, GlyphVertex, LabelUniform};

/// Atlas textures hold two `u16` per RGBA8 texel, read as integers.
pub const ATLAS_FORMAT: TextureFormat = TextureFormat::Rgba8Uint;

// ───────────────────────────────────────────────────────────────────
// Pipeline
// ───────────────────────────────────────────────────────────────────

/// Owns the wgpu pipeline and its bind group layouts.
pub struct GlyphPipeline {
    pipeline: RenderPipeline,
    uniform_bgl: BindGroupLayout,
    atlas_bgl: BindGroupLayout,
}

impl GlyphPipeline {
    pub fn new(device: &Device, surface_format: TextureFormat) -> Self {
        // ── Shader ──────────────────────────────────────────────
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("glyph_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/glyph.wgsl").into()),
        });

        // ── Label uniform bind group layout (group 0) ───────────
        let uniform_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("glyph_label_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // ── Atlas page bind group layout (group 1) ──────────────
        let atlas_entry = |binding| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Uint,
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let atlas_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("glyph_atlas_bgl"),
            entries: &[atlas_entry(0), atlas_entry(1)],
        });

        // ── Pipeline layout ─────────────────────────────────────
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("glyph_pipeline_layout"),
            bind_group_layouts: &[&uniform_bgl, &atlas_bgl],
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("glyph_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[GlyphVertex::layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_bgl,
            atlas_bgl,
        }
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }
}

// ───────────────────────────────────────────────────────────────────
// Atlas textures
// ───────────────────────────────────────────────────────────────────

struct PageTextures {
    bezier: Texture,
    grid: Texture,
    bind_group: BindGroup,
}

/// GPU copies of the font manager's atlas pages.
#[derive(Default)]
pub struct AtlasTextures {
    pages: Vec<PageTextures>,
}

impl AtlasTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create textures for new pages and upload every dirty page.
    /// Returns the number of pages uploaded.
    pub fn sync(
        &mut self,
        device: &Device,
        queue: &Queue,
        pipeline: &GlyphPipeline,
        manager: &mut FontManager,
    ) -> usize {
        while self.pages.len() < manager.pages().len() {
            let index = self.pages.len();
            let page = &manager.pages()[index];
            self.pages.push(create_page(device, pipeline, page, index));
        }

        let dirty: Vec<u16> = manager.dirty_pages().map(|(i, _)| i).collect();
        for &index in &dirty {
            let (Some(gpu), Some(page)) =
                (self.pages.get(usize::from(index)), manager.pages().get(usize::from(index)))
            else {
                continue;
            };
            write_texture(queue, &gpu.bezier, page.bezier_bytes(), page.bezier_size());
            write_texture(queue, &gpu.grid, page.grid_bytes(), page.grid_size());
            manager.mark_uploaded(index);
        }
        if !dirty.is_empty() {
            log::debug!("Uploaded {} atlas page(s)", dirty.len());
        }
        dirty.len()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn bind_group(&self, page: u16) -> Option<&BindGroup> {
        self.pages.get(usize::from(page)).map(|p| &p.bind_group)
    }
}

fn create_page(device: &Device, pipeline: &GlyphPipeline, page: &AtlasPage, index: usize) -> PageTextures {
    let bezier = create_texture(device, "glyph_bezier_atlas", page.bezier_size());
    let grid = create_texture(device, "glyph_grid_atlas", page.grid_size());
    let bezier_view = bezier.create_view(&wgpu::TextureViewDescriptor::default());
    let grid_view = grid.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("glyph_atlas_bg"),
        layout: &pipeline.atlas_bgl,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&bezier_view),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::TextureView(&grid_view),
            },
        ],
    });
    log::info!("Created GPU textures for atlas page {index}");

    PageTextures {
        bezier,
        grid,
        bind_group,
    }
}

fn create_texture(device: &Device, label: &str, size: [u16; 2]) -> Texture {
    device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: ATLAS_FORMAT,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn write_texture(queue: &Queue, texture: &Texture, data: &[u8], size: [u16; 2]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(u32::from(size[0]) * 4),
            rows_per_image: Some(u32::from(size[1])),
        },
        extent(size),
    );
}

fn extent(size: [u16; 2]) -> Extent3d {
    Extent3d {
        width: u32::from(size[0]),
        height: u32::from(size[1]),
        depth_or_array_layers: 1,
    }
}

// ───────────────────────────────────────────────────────────────────
// Per-label buffers
// ───────────────────────────────────────────────────────────────────

/// A contiguous index range drawn with one page bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawGroup {
    pub page: u16,
    pub indices: Range<u32>,
}

/// Split a label's quads into per-page index runs. The caret, if any, is
/// the last quad and comes back as its own group.
pub fn build_indices(label: &Label) -> (Vec<u32>, Vec<DrawGroup>, Option<DrawGroup>) {
    let mut indices = Vec::with_capacity(label.glyph_count() * 6);
    let mut groups = Vec::new();
    for (page, quads) in label.quads_by_page() {
        let start = indices.len() as u32;
        indices.extend(Label::indices_for(&quads));
        groups.push(DrawGroup {
            page,
            indices: start..indices.len() as u32,
        });
    }

    let caret = label.caret_quad().map(|&(_, page)| {
        let start = indices.len() as u32;
        indices.extend(quad_indices(label.glyph_count() as u32));
        DrawGroup {
            page,
            indices: start..indices.len() as u32,
        }
    });
    (indices, groups, caret)
}

/// GPU-side vertex, index and uniform buffers of one label.
pub struct GpuLabel {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    uniform_buffer: Buffer,
    bind_group: BindGroup,
    vertex_capacity: usize,
    index_capacity: usize,
    groups: Vec<DrawGroup>,
    caret: Option<DrawGroup>,
    revision: Option<u64>,
}

impl GpuLabel {
    pub fn new(device: &Device, pipeline: &GlyphPipeline) -> Self {
        let uniform_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("glyph_label_ub"),
            size: std::mem::size_of::<LabelUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("glyph_label_bg"),
            layout: &pipeline.uniform_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            vertex_buffer: vertex_buffer(device, 1),
            index_buffer: index_buffer(device, 1),
            uniform_buffer,
            bind_group,
            vertex_capacity: 1,
            index_capacity: 1,
            groups: Vec::new(),
            caret: None,
            revision: None,
        }
    }

    /// Re-upload vertices and indices if the label changed since the last
    /// call. Returns whether anything was written.
    pub fn update(&mut self, device: &Device, queue: &Queue, label: &Label) -> bool {
        if self.revision == Some(label.revision()) {
            return false;
        }

        let mut vertices = label.vertices().to_vec();
        if let Some((quad, _)) = label.caret_quad() {
            vertices.extend_from_slice(quad);
        }
        let (indices, groups, caret) = build_indices(label);

        if vertices.len() > self.vertex_capacity {
            self.vertex_capacity = vertices.len().next_power_of_two();
            self.vertex_buffer = vertex_buffer(device, self.vertex_capacity);
        }
        if indices.len() > self.index_capacity {
            self.index_capacity = indices.len().next_power_of_two();
            self.index_buffer = index_buffer(device, self.index_capacity);
        }
        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&indices));
        }

        self.groups = groups;
        self.caret = caret;
        self.revision = Some(label.revision());
        true
    }

    pub fn write_uniform(&self, queue: &Queue, uniform: &LabelUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    /// Record this label's draws. Returns `(quads, draw calls)`.
    pub fn draw<'a>(
        &'a self,
        pass: &mut RenderPass<'a>,
        atlas: &'a AtlasTextures,
        show_caret: bool,
    ) -> (u32, u32) {
        let caret = self.caret.iter().filter(|_| show_caret);
        let mut quads = 0;
        let mut calls = 0;
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint32);
        for group in self.groups.iter().chain(caret) {
            let Some(bind_group) = atlas.bind_group(group.page) else {
                continue;
            };
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(group.indices.clone(), 0, 0..1);
            quads += (group.indices.end - group.indices.start) / 6;
            calls += 1;
        }
        (quads, calls)
    }

    pub fn groups(&self) -> &[DrawGroup] {
        &self.groups
    }
}

fn vertex_buffer(device: &Device, vertices: usize) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some("glyph_label_vb"),
        size: (vertices * std::mem::size_of::<GlyphVertex>()) as u64,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn index_buffer(device: &Device, indices: usize) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some("glyph_label_ib"),
        size: (indices * std::mem::size_of::<u32>()) as u64,
        usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Buffers of every label the renderer has seen, keyed by label id.
pub type GpuLabels = HashMap<LabelId, GpuLabel>;

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use glyphgrid_atlas::{AtlasConfig, FontContext, StaticOutlines};

    fn label(text: &str) -> Label {
        let context = FontContext::with_config(AtlasConfig::default()).unwrap();
        let face = context.add_face(StaticOutlines::block_face("blocks"));
        let mut label = Label::new(&context, face).unwrap();
        label.set_text(text).unwrap();
        label
    }

    #[test]
    fn test_build_indices_single_page() {
        let label = label("ab c");
        let (indices, groups, caret) = build_indices(&label);
        assert_eq!(indices.len(), 18);
        assert_eq!(groups, vec![DrawGroup { page: 0, indices: 0..18 }]);
        assert!(caret.is_none());
        assert_eq!(&indices[6..12], &[4, 5, 6, 6, 5, 7]);
    }

    #[test]
    fn test_build_indices_caret_is_last_quad() {
        let mut label = label("ab");
        label.show_caret(true).unwrap();
        let (indices, groups, caret) = build_indices(&label);
        assert_eq!(groups.len(), 1);
        let caret = caret.unwrap();
        assert_eq!(caret.indices, 12..18);
        assert_eq!(&indices[12..18], &[8, 9, 10, 10, 9, 11]);
    }

    #[test]
    fn test_build_indices_empty() {
        let (indices, groups, caret) = build_indices(&label(""));
        assert!(indices.is_empty() && groups.is_empty() && caret.is_none());
    }

    #[test]
    fn test_pipeline_creation_headless() {
        let gpu = pollster::block_on(crate::context::GpuContext::new_headless());
        if let Ok(gpu) = gpu {
            let pipeline = GlyphPipeline::new(&gpu.device, gpu.surface_format);
            let mut atlas = AtlasTextures::new();
            let context = FontContext::with_config(AtlasConfig::default()).unwrap();
            let face = context.add_face(StaticOutlines::block_face("blocks"));
            context.glyph(face, 'A').unwrap();

            let uploaded = atlas.sync(&gpu.device, &gpu.queue, &pipeline, &mut context.write());
            assert_eq!(uploaded, 1);
            assert_eq!(atlas.page_count(), 1);
            assert_eq!(context.read().dirty_pages().count(), 0);
        }
    }
}
