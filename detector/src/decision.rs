/// Whether a smoothed similarity warrants an alert.
///
/// Stateless: the same `(mean, threshold)` always gives the same answer, so a
/// disturbance that persists keeps re-triggering on every cycle.
pub fn should_trigger(mean: f64, threshold: f64) -> bool {
    mean < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_triggers() {
        assert!(should_trigger(0.573, 0.7));
        assert!(should_trigger(-1.0, 0.7));
    }

    #[test]
    fn at_or_above_threshold_does_not() {
        assert!(!should_trigger(0.7, 0.7));
        assert!(!should_trigger(0.79, 0.7));
        assert!(!should_trigger(1.0, 0.7));
    }

    #[test]
    fn nan_never_triggers() {
        assert!(!should_trigger(f64::NAN, 0.7));
    }
}
