//! # glyphgrid-render
//!
//! GPU text rendering on top of `glyphgrid-atlas`, built on `wgpu`.
//!
//! ## Architecture
//!
//! ```text
//!  FontContext (glyphgrid-atlas)
//!       │
//!       ▼
//!  Label.set_text()                 ◀─── one quad per visible glyph
//!       │
//!       ▼
//!  TextRenderer.render()            ◀─── syncs dirty atlas pages,
//!       │                                uploads changed labels
//!       ▼
//!  glyph.wgsl                       ◀─── per-pixel curve coverage
//! ```
//!
//! ## Crate modules
//!
//! - [`context`]: GPU device/queue/surface initialisation
//! - [`vertex`]: vertex and uniform data types
//! - [`label`]: text layout into glyph quads
//! - [`pipelines`]: wgpu render pipeline, atlas textures, label buffers
//! - [`renderer`]: high-level frame orchestration

pub mod context;
pub mod label;
pub mod pipelines;
pub mod renderer;
pub mod vertex;

// Re-exports for convenience
pub use context::{GpuContext, GpuError};
pub use label::{Align, Label, LabelId, CARET};
pub use pipelines::glyph::{AtlasTextures, GlyphPipeline, GpuLabel};
pub use renderer::{FrameStats, RenderError, TextRenderer};
pub use vertex::{Color, GlyphVertex, LabelUniform, QUAD_INDICES};
