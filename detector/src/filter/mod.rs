pub mod histogram;
pub mod traits;

pub use histogram::HistogramScorer;
pub use traits::{ScoreError, SimilarityScorer};
