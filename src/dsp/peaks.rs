//! Beat detection and heart-rate estimation on a conditioned signal.

use log::debug;

/// Amplitude a sample must exceed to count as a beat: the mean plus the mean
/// absolute deviation.
pub fn peak_threshold(data: &[f32]) -> Option<f32> {
    if data.is_empty() {
        return None;
    }
    let n = data.len() as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mad = data.iter().map(|&v| (v as f64 - mean).abs()).sum::<f64>() / n;
    let threshold = (mean + mad) as f32;
    threshold.is_finite().then_some(threshold)
}

/// Indices of local maxima above [`peak_threshold`].
///
/// A maximum is kept only if it lies more than `min_distance` samples after
/// the previously kept one; the first of two close maxima wins.
pub fn find_peaks(data: &[f32], min_distance: usize) -> Vec<usize> {
    let Some(threshold) = peak_threshold(data) else {
        return Vec::new();
    };

    let mut peaks: Vec<usize> = Vec::new();
    for (i, w) in data.windows(3).enumerate() {
        let centre = i + 1;
        let is_peak = w[1] > threshold && w[1] > w[0] && w[1] > w[2];
        let spaced = peaks.last().map_or(true, |&last| centre - last > min_distance);
        if is_peak && spaced {
            peaks.push(centre);
        }
    }
    peaks
}

/// Beats per minute from the mean interval between consecutive peaks.
///
/// `None` with fewer than two peaks.
pub fn heart_rate_from_peaks(peaks: &[usize], sample_rate_hz: f32) -> Option<f32> {
    if peaks.len() < 2 || sample_rate_hz <= 0.0 {
        return None;
    }
    let mean_interval = (peaks[peaks.len() - 1] - peaks[0]) as f32 / (peaks.len() - 1) as f32;
    Some(60.0 * sample_rate_hz / mean_interval)
}

/// Detect beats at least a quarter second apart and convert them to BPM.
pub fn estimate_heart_rate(data: &[f32], sample_rate_hz: f32) -> Option<f32> {
    let min_distance = (sample_rate_hz / 4.0).max(0.0) as usize;
    let peaks = find_peaks(data, min_distance);
    let bpm = heart_rate_from_peaks(&peaks, sample_rate_hz);
    debug!(
        "{} beats over {} samples at {sample_rate_hz} Hz -> {bpm:?} bpm",
        peaks.len(),
        data.len()
    );
    bpm
}
