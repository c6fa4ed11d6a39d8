//! Linear detrend followed by a causal single-pole high-pass / low-pass
//! cascade.
//!
//! The cascade only approximates a band-pass: no zero-phase pass, no
//! higher-order design. Downstream consumers were fitted on exactly this
//! response, so it stays as is.

use std::f32::consts::PI;

use log::debug;

/// Subtract the least-squares line through `(index, value)`.
///
/// Fewer than two samples are returned unchanged.
pub fn detrend(data: &[f32]) -> Vec<f32> {
    let n = data.len();
    if n < 2 {
        return data.to_vec();
    }

    let nf = n as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = data.iter().enumerate().fold(
        (0.0f64, 0.0f64, 0.0f64, 0.0f64),
        |(sx, sy, sxy, sx2), (i, &y)| {
            let x = i as f64;
            let y = y as f64;
            (sx + x, sy + y, sxy + x * y, sx2 + x * x)
        },
    );

    let slope = (nf * sum_xy - sum_x * sum_y) / (nf * sum_x2 - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / nf;
    debug!("linear trend: slope={slope:.6}, intercept={intercept:.3}");

    data.iter()
        .enumerate()
        .map(|(i, &y)| (y as f64 - (slope * i as f64 + intercept)) as f32)
        .collect()
}

/// Smoothing factor of the single-pole high-pass.
pub fn high_pass_alpha(cutoff_hz: f32, sample_rate_hz: f32) -> f32 {
    1.0 / (1.0 + 2.0 * PI * cutoff_hz / sample_rate_hz)
}

/// Smoothing factor of the single-pole low-pass.
pub fn low_pass_alpha(cutoff_hz: f32, sample_rate_hz: f32) -> f32 {
    let w = 2.0 * PI * cutoff_hz / sample_rate_hz;
    w / (1.0 + w)
}

/// `y[0] = x[0]`, `y[n] = α·(y[n-1] + x[n] - x[n-1])`.
pub fn high_pass(data: &[f32], cutoff_hz: f32, sample_rate_hz: f32) -> Vec<f32> {
    let alpha = high_pass_alpha(cutoff_hz, sample_rate_hz);
    let mut out = Vec::with_capacity(data.len());
    if let Some(&first) = data.first() {
        out.push(first);
        for i in 1..data.len() {
            let y = alpha * (out[i - 1] + data[i] - data[i - 1]);
            out.push(y);
        }
    }
    out
}

/// `y[0] = x[0]`, `y[n] = α·x[n] + (1-α)·y[n-1]`.
pub fn low_pass(data: &[f32], cutoff_hz: f32, sample_rate_hz: f32) -> Vec<f32> {
    let alpha = low_pass_alpha(cutoff_hz, sample_rate_hz);
    let mut out = Vec::with_capacity(data.len());
    if let Some(&first) = data.first() {
        out.push(first);
        for i in 1..data.len() {
            let y = alpha * data[i] + (1.0 - alpha) * out[i - 1];
            out.push(y);
        }
    }
    out
}

/// Heart-rate band cascade: high-pass at `low_hz`, then low-pass at `high_hz`.
pub fn band_pass(data: &[f32], low_hz: f32, high_hz: f32, sample_rate_hz: f32) -> Vec<f32> {
    let out = low_pass(&high_pass(data, low_hz, sample_rate_hz), high_hz, sample_rate_hz);
    debug!(
        "band-pass {low_hz}-{high_hz} Hz at {sample_rate_hz} Hz over {} samples",
        out.len()
    );
    out
}

/// Detrend, then run the cascade.
pub fn condition(data: &[f32], low_hz: f32, high_hz: f32, sample_rate_hz: f32) -> Vec<f32> {
    band_pass(&detrend(data), low_hz, high_hz, sample_rate_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn detrend_removes_line() {
        let data: Vec<f32> = (0..100).map(|i| 3.0 * i as f32 - 250.0).collect();
        assert!(detrend(&data).iter().all(|&v| close(v, 0.0, 1e-3)));
    }

    #[test]
    fn detrend_keeps_oscillation_around_zero() {
        let data: Vec<f32> = (0..200)
            .map(|i| 1000.0 + 0.5 * i as f32 + (i as f32 * 0.3).sin())
            .collect();
        let out = detrend(&data);
        let mean = out.iter().sum::<f32>() / out.len() as f32;
        assert!(close(mean, 0.0, 1e-2));
        assert!(out.iter().all(|v| v.abs() < 2.0));
    }

    #[test]
    fn short_input_is_untouched() {
        assert_eq!(detrend(&[42.0]), vec![42.0]);
        assert!(band_pass(&[], 0.5, 8.0, 50.0).is_empty());
    }

    #[test]
    fn alphas_match_closed_form() {
        let hp = high_pass_alpha(0.5, 50.0);
        assert!(close(hp, 1.0 / (1.0 + 2.0 * PI * 0.01), 1e-6));
        let lp = low_pass_alpha(8.0, 50.0);
        let w = 2.0 * PI * 0.16;
        assert!(close(lp, w / (1.0 + w), 1e-6));
    }

    #[test]
    fn high_pass_recursion() {
        let alpha = high_pass_alpha(0.5, 50.0);
        let out = high_pass(&[1.0, 3.0, 2.0], 0.5, 50.0);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], alpha * (1.0 + 3.0 - 1.0));
        assert_eq!(out[2], alpha * (out[1] + 2.0 - 3.0));
    }

    #[test]
    fn high_pass_decays_step_response() {
        let mut data = vec![0.0f32; 10];
        data.extend(std::iter::repeat(1.0).take(500));
        let out = high_pass(&data, 0.5, 50.0);
        assert!(close(out[10], high_pass_alpha(0.5, 50.0), 1e-6));
        assert!(out[509].abs() < 0.01);
    }

    #[test]
    fn low_pass_settles_to_constant_input() {
        let mut data = vec![0.0f32];
        data.extend(std::iter::repeat(5.0).take(200));
        let out = low_pass(&data, 8.0, 50.0);
        assert_eq!(out[0], 0.0);
        assert!(close(*out.last().unwrap(), 5.0, 1e-4));
    }

    #[test]
    fn cascade_preserves_length_and_zeroes() {
        let zeros = vec![0.0f32; 300];
        let out = condition(&zeros, 0.5, 8.0, 50.0);
        assert_eq!(out.len(), 300);
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
