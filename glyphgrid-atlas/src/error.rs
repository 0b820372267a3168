//! Error taxonomy for glyph loading and atlas placement.

use thiserror::Error;

use crate::manager::FaceId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtlasError {
    /// The face has no mapping for the codepoint. Recovered by the glyph
    /// cache with the face's fallback glyph.
    #[error("No glyph for codepoint {0:?}")]
    GlyphNotFound(char),

    /// A single glyph's encoded data does not fit an empty atlas page.
    #[error("Glyph needs {needed} texels in the {buffer} atlas but a page holds {available}")]
    AtlasCapacityExceeded {
        buffer: &'static str,
        needed: usize,
        available: usize,
    },

    /// The font collaborator could not produce a face.
    #[error("Failed to load font face: {0}")]
    FaceLoadFailure(String),

    #[error("Face not registered: {0:?}")]
    UnknownFace(FaceId),

    #[error("Invalid atlas configuration: {0}")]
    InvalidConfig(String),
}

impl From<font_kit::error::FontLoadingError> for AtlasError {
    fn from(err: font_kit::error::FontLoadingError) -> Self {
        Self::FaceLoadFailure(err.to_string())
    }
}

impl From<font_kit::error::SelectionError> for AtlasError {
    fn from(err: font_kit::error::SelectionError) -> Self {
        Self::FaceLoadFailure(err.to_string())
    }
}
