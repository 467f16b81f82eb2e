use serde::Serialize;

/// Mean and population standard deviation over the tail of a sample history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowedStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub sample_count: usize,
}

impl WindowedStatistics {
    /// Standardized distance of `value` from the window mean.
    ///
    /// Zero when the window has fewer than two samples or no spread.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.sample_count < 2 || self.std_dev == 0.0 { return 0.0; }
        (value - self.mean) / self.std_dev
    }
}

/// Statistics over the last `window` entries of `values` (all of them when shorter).
///
/// An empty window yields zeros. Variance divides by the sample count, not `n - 1`.
pub fn window_stats<'a, I>(values: I, window: usize) -> WindowedStatistics
where
    I: IntoIterator<Item = &'a f64>,
    I::IntoIter: ExactSizeIterator + Clone,
{
    let iter = values.into_iter();
    let start = iter.len().saturating_sub(window);
    let tail = iter.skip(start);
    let count = tail.len();
    if count == 0 { return WindowedStatistics::default(); }

    let n = count as f64;
    let mean = tail.clone().sum::<f64>() / n;
    let std_dev = if count < 2 {
        0.0
    } else {
        let variance = tail.map(|v| { let d = v - mean; d * d }).sum::<f64>() / n;
        variance.sqrt()
    };
    WindowedStatistics { mean, std_dev, sample_count: count }
}
