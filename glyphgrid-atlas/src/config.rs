//! Atlas configuration.
//!
//! Every size is in texels. A texel is 4 bytes (RGBA8) and holds two
//! little-endian `u16` values.

use crate::error::AtlasError;

/// Largest atlas dimension that survives the `coord * 2 + norm` packing
/// of the vertex lookup coordinate.
pub const MAX_ATLAS_DIMENSION: u16 = 32_767;

/// Sizes and tolerances shared by every page of a font manager.
#[derive(Clone, Debug, PartialEq)]
pub struct AtlasConfig {
    /// Width and height of each page's bezier texture.
    pub bezier_atlas_size: [u16; 2],
    /// Width and height of each page's grid texture.
    pub grid_atlas_size: [u16; 2],
    /// Cells per side of the per-glyph acceleration grid.
    pub grid_size: u16,
    /// Maximum distance (em units) between a cubic and its quadratic
    /// approximation.
    pub cubic_tolerance: f32,
    /// Cell dilation used by the intersection test, as a fraction of one
    /// cell.
    pub cell_margin: f32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            bezier_atlas_size: [1024, 1024],
            grid_atlas_size: [256, 256],
            grid_size: 16,
            cubic_tolerance: 1.0 / 1024.0,
            cell_margin: 1.0 / 16.0,
        }
    }
}

impl AtlasConfig {
    /// Check the configuration before any page is allocated.
    pub fn validate(&self) -> Result<(), AtlasError> {
        let dims = self.bezier_atlas_size.iter().chain(self.grid_atlas_size.iter());
        for &dim in dims {
            if dim == 0 || dim > MAX_ATLAS_DIMENSION {
                return Err(AtlasError::InvalidConfig(format!(
                    "atlas dimension {dim} outside 1..={MAX_ATLAS_DIMENSION}"
                )));
            }
        }

        if self.grid_size == 0
            || self.grid_size > self.grid_atlas_size[0]
            || self.grid_size > self.grid_atlas_size[1]
        {
            return Err(AtlasError::InvalidConfig(format!(
                "grid size {} does not fit a {}x{} grid page",
                self.grid_size, self.grid_atlas_size[0], self.grid_atlas_size[1],
            )));
        }

        if !(self.cubic_tolerance.is_finite() && self.cubic_tolerance > 0.0) {
            return Err(AtlasError::InvalidConfig(format!(
                "cubic tolerance must be positive, got {}",
                self.cubic_tolerance
            )));
        }

        if !(0.0..=0.5).contains(&self.cell_margin) {
            return Err(AtlasError::InvalidConfig(format!(
                "cell margin must be in [0, 0.5], got {}",
                self.cell_margin
            )));
        }

        Ok(())
    }

    /// Reciprocal of the bezier texture size (the shader's texel size).
    pub fn bezier_texel(&self) -> [f32; 2] {
        [
            1.0 / self.bezier_atlas_size[0] as f32,
            1.0 / self.bezier_atlas_size[1] as f32,
        ]
    }

    /// Reciprocal of the grid texture size.
    pub fn grid_texel(&self) -> [f32; 2] {
        [
            1.0 / self.grid_atlas_size[0] as f32,
            1.0 / self.grid_atlas_size[1] as f32,
        ]
    }
}
