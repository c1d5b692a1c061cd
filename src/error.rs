use thiserror::Error;

/// Everything that can go wrong while building or comparing signatures.
///
/// Each stage validates its own input before doing any work, so an error
/// always means nothing was computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignatureError {
    #[error("invalid percentile range {lower}..{upper}: expected 0 <= lower < upper <= 100")]
    InvalidRange { lower: f64, upper: f64 },

    #[error("a {height}x{width} image is smaller than the minimum crop of {min_extent}x{min_extent}")]
    DegenerateCrop {
        height: usize,
        width: usize,
        min_extent: usize,
    },

    #[error("a {rows}x{cols} grid does not fit a {height}x{width} image")]
    InvalidGrid {
        rows: usize,
        cols: usize,
        height: usize,
        width: usize,
    },

    #[error("signature shapes differ: {0}")]
    ShapeMismatch(String),

    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(String),
}

pub type Result<T> = std::result::Result<T, SignatureError>;
