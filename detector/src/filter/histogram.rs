use image::Rgb;
use motion_watch_common::config::MAX_HISTOGRAM_BINS;
use motion_watch_common::frame::Frame;
use tracing::trace;

use super::traits::{ScoreError, SimilarityScorer};

pub const DEFAULT_HUE_BINS: usize = 50;
pub const DEFAULT_SATURATION_BINS: usize = 60;

/// Hue/saturation histogram correlation scorer.
///
/// Both frames are converted to HSV and the value channel is discarded, so a
/// scene that only gets brighter or darker keeps its score. Each frame gets a
/// 2D joint histogram over (hue, saturation), min-max normalized to [0, 1],
/// and the score is the Pearson correlation between the two histograms.
pub struct HistogramScorer {
    hue_bins: usize,
    saturation_bins: usize,
}

impl Default for HistogramScorer {
    fn default() -> Self {
        Self::new(DEFAULT_HUE_BINS, DEFAULT_SATURATION_BINS)
    }
}

impl HistogramScorer {
    /// Bin counts are clamped so the joint histogram holds at most
    /// `MAX_HISTOGRAM_BINS` bins; saturation gives way first.
    pub fn new(hue_bins: usize, saturation_bins: usize) -> Self {
        let hue_bins = hue_bins.clamp(1, MAX_HISTOGRAM_BINS);
        let saturation_bins = saturation_bins.clamp(1, MAX_HISTOGRAM_BINS / hue_bins);
        Self {
            hue_bins,
            saturation_bins,
        }
    }

    /// Row-major (hue, saturation) histogram, min-max normalized.
    fn compute_histogram(&self, frame: &Frame) -> Vec<f64> {
        let mut bins = vec![0.0f64; self.hue_bins * self.saturation_bins];

        for pixel in frame.image.pixels() {
            let (hue, saturation) = hue_saturation(pixel);
            let h = ((hue / 360.0) * self.hue_bins as f64) as usize;
            let s = (saturation * self.saturation_bins as f64) as usize;
            let h = h.min(self.hue_bins - 1);
            let s = s.min(self.saturation_bins - 1);
            bins[h * self.saturation_bins + s] += 1.0;
        }

        normalize_min_max(&mut bins);
        bins
    }
}

impl SimilarityScorer for HistogramScorer {
    fn score(&self, reference: &Frame, candidate: &Frame) -> Result<f64, ScoreError> {
        if reference.is_empty() || candidate.is_empty() {
            return Err(ScoreError::EmptyFrame);
        }
        if reference.dimensions() != candidate.dimensions() {
            return Err(ScoreError::DimensionMismatch {
                reference: reference.dimensions(),
                candidate: candidate.dimensions(),
            });
        }

        let ref_hist = self.compute_histogram(reference);
        let cand_hist = self.compute_histogram(candidate);
        let score = correlation(&ref_hist, &cand_hist);
        trace!(score, bins = ref_hist.len(), "histogram correlation");
        Ok(score)
    }

    fn name(&self) -> &str {
        "hs-histogram"
    }
}

/// Hue in degrees [0, 360) and saturation in [0, 1] of an 8-bit RGB pixel.
fn hue_saturation(pixel: &Rgb<u8>) -> (f64, f64) {
    let [r, g, b] = pixel.0.map(|c| c as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if delta <= 0.0 {
        return (0.0, 0.0);
    }

    let hue = if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    (hue, delta / max)
}

/// Rescale so the smallest bin becomes 0 and the largest 1. A flat histogram
/// becomes all zeros.
fn normalize_min_max(bins: &mut [f64]) {
    let min = bins.iter().copied().fold(f64::INFINITY, f64::min);
    let max = bins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    for v in bins.iter_mut() {
        *v = if range > 0.0 { (*v - min) / range } else { 0.0 };
    }
}

/// Pearson correlation between two equally sized histograms, clamped to [-1, 1].
///
/// With zero variance in either input the correlation is undefined and the
/// score is 1, the same answer OpenCV's `HISTCMP_CORREL` gives.
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return 1.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}
