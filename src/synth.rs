//! Deterministic synthetic PPG recordings for demos and tests.

use crate::data::channel::PRIMARY_CHANNEL_OFFSET;
use crate::data::npy;

/// Minimal deterministic PRNG (xoshiro256**)
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// One cardiac cycle at phase `p` in [0, 1): systolic peak plus a smaller
/// dicrotic wave.
fn pulse_shape(p: f64) -> f64 {
    gaussian(p, 0.2, 0.07) + 0.4 * gaussian(p, 0.55, 0.1)
}

// ---------------------------------------------------------------------------
// SyntheticRecording
// ---------------------------------------------------------------------------

/// Builder for an interleaved multi-channel recording.
///
/// The pulse is strongest on the primary channel; the other channels carry
/// an attenuated copy. Every channel sits on `baseline` with gaussian noise.
#[derive(Debug, Clone)]
pub struct SyntheticRecording {
    pub duration_s: f64,
    pub rate_hz: f64,
    pub channels: usize,
    pub baseline: f64,
    pub amplitude: f64,
    pub heart_rate_bpm: f64,
    pub noise: f64,
    pub seed: u64,
}

impl Default for SyntheticRecording {
    /// One minute of raw 4-channel optical counts at 25 Hz.
    fn default() -> Self {
        Self {
            duration_s: 60.0,
            rate_hz: 25.0,
            channels: 4,
            baseline: -200_000.0,
            amplitude: 2_000.0,
            heart_rate_bpm: 72.0,
            noise: 50.0,
            seed: 42,
        }
    }
}

impl SyntheticRecording {
    pub fn frames(&self) -> usize {
        (self.duration_s * self.rate_hz).round().max(0.0) as usize
    }

    /// Flat sample sequence, frame by frame.
    pub fn interleaved(&self) -> Vec<f64> {
        let mut rng = SimpleRng::new(self.seed);
        let beat_hz = self.heart_rate_bpm / 60.0;
        let channels = self.channels.max(1);

        let mut out = Vec::with_capacity(self.frames() * channels);
        for frame in 0..self.frames() {
            let t = frame as f64 / self.rate_hz;
            let pulse = pulse_shape((t * beat_hz).fract());
            for c in 0..channels {
                let gain = if channels == 1 || c == PRIMARY_CHANNEL_OFFSET {
                    1.0
                } else {
                    0.3
                };
                let noise = rng.gauss(0.0, self.noise);
                out.push(self.baseline + gain * self.amplitude * pulse + noise);
            }
        }
        out
    }

    /// Encoded as a little-endian float64 array.
    pub fn to_npy(&self) -> Vec<u8> {
        npy::encode_f64(&self.interleaved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_deterministic() {
        let mut a = SimpleRng::new(7);
        let mut b = SimpleRng::new(7);
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let u = SimpleRng::new(1).next_f64();
        assert!((0.0..1.0).contains(&u));
    }

    #[test]
    fn default_recording_shape() {
        let rec = SyntheticRecording::default();
        let values = rec.interleaved();
        assert_eq!(values.len(), 6000);
        assert!(values.iter().all(|v| *v < -190_000.0 && *v > -210_000.0));
    }

    #[test]
    fn primary_channel_carries_the_pulse() {
        let rec = SyntheticRecording {
            noise: 0.0,
            ..Default::default()
        };
        let values = rec.interleaved();
        let peak = |c: usize| {
            values
                .iter()
                .skip(c)
                .step_by(4)
                .fold(f64::MIN, |m, &v| m.max(v))
        };
        assert!(peak(PRIMARY_CHANNEL_OFFSET) > peak(0));
    }

    #[test]
    fn encodes_as_doubles() {
        let rec = SyntheticRecording {
            duration_s: 1.0,
            channels: 1,
            ..Default::default()
        };
        let decoded = npy::decode(&rec.to_npy());
        assert_eq!(decoded, rec.interleaved());
    }
}
