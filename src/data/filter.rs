use log::debug;

use crate::config::Heuristics;

use super::model::{DataRegime, ValueRange};

// ---------------------------------------------------------------------------
// Validity predicate: which samples survive, per regime
// ---------------------------------------------------------------------------

/// Inclusive bounds a sample must fall within to be kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f32,
    pub upper: f32,
}

impl Bounds {
    pub fn contains(&self, v: f32) -> bool {
        v.is_finite() && v >= self.lower && v <= self.upper
    }
}

/// Bounds derived from the data's own extremes.
///
/// Each side is clamped at `±hard_bound`, scaled by `scale_factor` when it
/// lies beyond `±scaled_bound`, and otherwise widened by `range_margin` of
/// the full range.
pub fn adaptive_bounds(range: ValueRange, h: &Heuristics) -> Bounds {
    let span = range.span();

    let lower = if range.min < -h.hard_bound {
        -h.hard_bound
    } else if range.min < -h.scaled_bound {
        range.min * h.scale_factor
    } else {
        range.min - span * h.range_margin
    };

    let upper = if range.max > h.hard_bound {
        h.hard_bound
    } else if range.max > h.scaled_bound {
        range.max * h.scale_factor
    } else {
        range.max + span * h.range_margin
    };

    Bounds { lower, upper }
}

/// Bounds applied for a regime, or `None` when nothing finite is present.
pub fn bounds_for(data: &[f32], regime: DataRegime, h: &Heuristics) -> Option<Bounds> {
    match regime {
        DataRegime::Normalized => Some(Bounds {
            lower: 0.0,
            upper: 1.0,
        }),
        DataRegime::Adc => Some(Bounds {
            lower: 0.0,
            upper: f32::MAX,
        }),
        DataRegime::RawPpg | DataRegime::Unknown => {
            ValueRange::of(data).map(|range| adaptive_bounds(range, h))
        }
    }
}

/// Drop non-finite and out-of-range samples, preserving order.
pub fn retain_valid(data: &[f32], regime: DataRegime, h: &Heuristics) -> Vec<f32> {
    let Some(bounds) = bounds_for(data, regime, h) else {
        debug!("no finite samples, validity filter keeps nothing");
        return Vec::new();
    };

    let kept: Vec<f32> = data.iter().copied().filter(|&v| bounds.contains(v)).collect();
    debug!(
        "validity filter ({regime}): bounds [{}, {}], {} -> {} samples",
        bounds.lower,
        bounds.upper,
        data.len(),
        kept.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h() -> Heuristics {
        Heuristics::default()
    }

    #[test]
    fn adaptive_bounds_scale_large_negative_offsets() {
        let bounds = adaptive_bounds(
            ValueRange {
                min: -200_000.0,
                max: -150_000.0,
            },
            &h(),
        );
        // 240000 is not exact after the f32 multiply
        assert_eq!(bounds.lower, -200_000.0f32 * 1.2);
        assert!((bounds.lower - -240_000.0).abs() < 0.05);
        assert_eq!(bounds.upper, -145_000.0);
    }

    #[test]
    fn adaptive_bounds_clamp_at_hard_limit() {
        let bounds = adaptive_bounds(
            ValueRange {
                min: -5_000_000.0,
                max: 2_000_000.0,
            },
            &h(),
        );
        assert_eq!(bounds, Bounds { lower: -1_000_000.0, upper: 1_000_000.0 });
    }

    #[test]
    fn adaptive_bounds_add_margin_for_small_ranges() {
        let bounds = adaptive_bounds(ValueRange { min: -10.0, max: 10.0 }, &h());
        assert_eq!(bounds, Bounds { lower: -12.0, upper: 12.0 });

        let flat = adaptive_bounds(ValueRange { min: 0.0, max: 0.0 }, &h());
        assert!(flat.contains(0.0));
    }

    #[test]
    fn raw_filter_drops_extremes_beyond_hard_bound() {
        let data = [-2_000_000.0f32, -200_000.0, f32::NAN, -180_000.0];
        let kept = retain_valid(&data, DataRegime::RawPpg, &h());
        assert_eq!(kept, vec![-200_000.0, -180_000.0]);
    }

    #[test]
    fn normalized_and_adc_use_fixed_bounds() {
        let data = [-0.1f32, 0.0, 0.5, 1.0, 1.5, f32::INFINITY];
        assert_eq!(retain_valid(&data, DataRegime::Normalized, &h()), vec![0.0, 0.5, 1.0]);
        assert_eq!(retain_valid(&data, DataRegime::Adc, &h()), vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn all_nan_keeps_nothing() {
        assert!(retain_valid(&[f32::NAN; 4], DataRegime::Unknown, &h()).is_empty());
    }
}
