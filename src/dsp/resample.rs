use log::debug;

/// Linear-interpolation rate conversion.
///
/// Output length is `floor(len × to_hz / from_hz)`; output sample `i` reads
/// source position `i × from_hz / to_hz`. Equal rates return the input.
pub fn resample_linear(data: &[f32], from_hz: f32, to_hz: f32) -> Vec<f32> {
    if data.is_empty() || from_hz <= 0.0 || to_hz <= 0.0 {
        return Vec::new();
    }

    let from = from_hz as f64;
    let to = to_hz as f64;
    let new_len = (data.len() as f64 * to / from).floor() as usize;
    let step = from / to;
    let last = data.len() - 1;

    let out: Vec<f32> = (0..new_len)
        .map(|i| {
            let pos = i as f64 * step;
            let lower = pos.floor() as usize;
            if lower > last {
                return data[last];
            }
            let upper = (lower + 1).min(last);
            let frac = (pos - lower as f64) as f32;
            data[lower] * (1.0 - frac) + data[upper] * frac
        })
        .collect();

    debug!("resampled {from_hz} Hz -> {to_hz} Hz: {} -> {} samples", data.len(), out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsampling_doubles_length_and_interpolates() {
        let out = resample_linear(&[0.0, 2.0, 4.0], 25.0, 50.0);
        assert_eq!(out, vec![0.0, 1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn length_is_floored() {
        let data = vec![1.0f32; 7];
        assert_eq!(resample_linear(&data, 100.0, 50.0).len(), 3);
        assert_eq!(resample_linear(&data, 30.0, 50.0).len(), 11);
    }

    #[test]
    fn equal_rates_are_identity() {
        let data: Vec<f32> = (0..50).map(|i| (i as f32 * 0.37).sin()).collect();
        assert_eq!(resample_linear(&data, 50.0, 50.0), data);
    }

    #[test]
    fn downsampling_picks_source_positions() {
        let data: Vec<f32> = (0..8).map(|i| i as f32).collect();
        assert_eq!(resample_linear(&data, 100.0, 50.0), vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(resample_linear(&[], 25.0, 50.0).is_empty());
    }
}
