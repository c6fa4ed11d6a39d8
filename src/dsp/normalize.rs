use crate::data::model::ValueRange;

/// Output used when a range is degenerate or a sample is not a number.
pub const MIDPOINT: f32 = 0.5;

/// Map `data` onto [0, 1] with an explicit range, clamping what falls outside.
///
/// A range with `max <= min` maps everything to [`MIDPOINT`].
pub fn normalize_with_range(data: &[f32], range: ValueRange) -> Vec<f32> {
    let span = range.span();
    if !(span.is_finite() && span > 0.0) {
        return vec![MIDPOINT; data.len()];
    }
    data.iter()
        .map(|&v| {
            if v.is_nan() {
                MIDPOINT
            } else {
                ((v - range.min) / span).clamp(0.0, 1.0)
            }
        })
        .collect()
}

/// Map `data` onto [0, 1] using its own finite min/max.
pub fn normalize_segment(data: &[f32]) -> Vec<f32> {
    match ValueRange::of(data) {
        Some(range) => normalize_with_range(data, range),
        None => vec![MIDPOINT; data.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_range_segment_is_unchanged() {
        let data = [0.0f32, 0.25, 1.0, 0.7];
        assert_eq!(normalize_segment(&data), data.to_vec());
    }

    #[test]
    fn constant_segment_maps_to_midpoint() {
        assert_eq!(normalize_segment(&[-3.0; 5]), vec![0.5; 5]);
        assert_eq!(normalize_segment(&[f32::NAN; 2]), vec![0.5; 2]);
    }

    #[test]
    fn scales_to_own_extremes() {
        assert_eq!(normalize_segment(&[-10.0, 0.0, 10.0]), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn explicit_range_clamps() {
        let range = ValueRange { min: 0.0, max: 100.0 };
        assert_eq!(
            normalize_with_range(&[-50.0, 25.0, 150.0, f32::NAN], range),
            vec![0.0, 0.25, 1.0, 0.5]
        );
        let flat = ValueRange { min: 4.0, max: 4.0 };
        assert_eq!(normalize_with_range(&[1.0, 9.0], flat), vec![0.5, 0.5]);
    }
}
