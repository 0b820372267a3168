//! GPU vertex and uniform data types for glyph quads.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers.

use bytemuck::{Pod, Zeroable};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

// ───────────────────────────────────────────────────────────────────
// Color
// ───────────────────────────────────────────────────────────────────

/// 8-bit RGBA, read by the shader as normalized floats.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

// ───────────────────────────────────────────────────────────────────
// Glyph vertex
// ───────────────────────────────────────────────────────────────────

/// One corner of a glyph quad. 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphVertex {
    /// Label-local position in em units, y up.
    pub position: [f32; 2],
    /// `bezier_origin * 2 + corner`, per axis. The shader splits it back
    /// into the glyph's atlas texel and the interpolated `[0, 1]` offset.
    pub data: [u16; 2],
    pub color: Color,
}

impl GlyphVertex {
    pub fn new(position: [f32; 2], origin: [u16; 2], corner: [u16; 2], color: Color) -> Self {
        Self {
            position,
            data: [origin[0] * 2 + corner[0], origin[1] * 2 + corner[1]],
            color,
        }
    }

    /// Atlas texel of the glyph's header.
    pub fn origin(&self) -> [u16; 2] {
        [self.data[0] >> 1, self.data[1] >> 1]
    }

    /// Which corner of the glyph box this vertex is, `(0|1, 0|1)`.
    pub fn corner(&self) -> [u16; 2] {
        [self.data[0] & 1, self.data[1] & 1]
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            // location(1) = atlas lookup
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Uint16x2,
            },
            // location(2) = color
            VertexAttribute {
                offset: 12,
                shader_location: 2,
                format: VertexFormat::Unorm8x4,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<GlyphVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

/// Vertices per glyph quad: bottom-left, bottom-right, top-left, top-right.
pub const QUAD_VERTICES: usize = 4;

/// Two triangles over one quad's four vertices.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// Indices of quad `quad` in a vertex buffer of consecutive quads.
pub fn quad_indices(quad: u32) -> [u32; 6] {
    QUAD_INDICES.map(|i| quad * QUAD_VERTICES as u32 + i)
}

// ───────────────────────────────────────────────────────────────────
// Label uniform
// ───────────────────────────────────────────────────────────────────

/// Per-label uniform, written once before the label's draws. 48 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LabelUniform {
    /// `xy` = label position in pixels (bottom-left origin), `zw` = pixels
    /// per em.
    pub pos_scale: [f32; 4],
    /// Reciprocal bezier texture size.
    pub bezier_texel: [f32; 2],
    /// Reciprocal grid texture size.
    pub grid_texel: [f32; 2],
    /// Render target size in pixels.
    pub viewport: [f32; 2],
    pub _pad: [f32; 2],
}

impl LabelUniform {
    pub fn new(
        position: [f32; 2],
        scale: f32,
        bezier_texel: [f32; 2],
        grid_texel: [f32; 2],
        viewport: [f32; 2],
    ) -> Self {
        Self {
            pos_scale: [position[0], position[1], scale, scale],
            bezier_texel,
            grid_texel,
            viewport,
            _pad: [0.0; 2],
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
