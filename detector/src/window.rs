use std::collections::VecDeque;

/// Bounded history of the most recent similarity scores.
///
/// A single noisy reading (auto-exposure flicker, a compression artifact)
/// only moves the mean by `1 / capacity` of its deviation, at the cost of up
/// to `capacity` cycles of alert latency.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingWindow {
    /// A zero capacity is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once the window is over capacity.
    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Arithmetic mean of the held samples, `None` while empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Held samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_mean() {
        let window = SmoothingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.mean(), None);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut window = SmoothingWindow::new(3);
        for s in [0.9, 0.8, 0.6, 0.95] {
            window.push(s);
        }
        assert_eq!(window.samples().collect::<Vec<_>>(), vec![0.8, 0.6, 0.95]);
        let mean = window.mean().unwrap();
        assert!((mean - 0.783_333).abs() < 1e-4, "mean was {mean}");
    }

    #[test]
    fn partial_window_averages_what_it_holds() {
        let mut window = SmoothingWindow::new(3);
        window.push(0.9);
        window.push(0.5);
        assert_eq!(window.len(), 2);
        assert!((window.mean().unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn mean_tracks_only_the_last_k_pushes() {
        for k in 1..=6 {
            let mut window = SmoothingWindow::new(k);
            let pushes: Vec<f64> = (0..20).map(|i| (i as f64 * 0.37).sin()).collect();
            for (n, &s) in pushes.iter().enumerate() {
                window.push(s);
                assert_eq!(window.len(), (n + 1).min(k));
            }
            let tail = &pushes[pushes.len() - k..];
            let expected = tail.iter().sum::<f64>() / k as f64;
            assert!((window.mean().unwrap() - expected).abs() < 1e-12, "k = {k}");
        }
    }

    #[test]
    fn zero_capacity_behaves_as_one() {
        let mut window = SmoothingWindow::new(0);
        window.push(0.2);
        window.push(0.4);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.samples().collect::<Vec<_>>(), vec![0.4]);
    }
}
