use motion_watch_common::frame::Frame;

/// Scores how alike a candidate frame is to the reference frame.
///
/// Implementations must be pure: the same pair of frames always yields the
/// same score. Higher is more similar; scores live in [-1, 1] with 1 meaning
/// "unchanged".
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, reference: &Frame, candidate: &Frame) -> Result<f64, ScoreError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Reasons a pair of frames cannot be compared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("frame dimensions differ: reference {reference:?}, candidate {candidate:?}")]
    DimensionMismatch {
        reference: (u32, u32),
        candidate: (u32, u32),
    },
    #[error("frame has no pixels")]
    EmptyFrame,
}
