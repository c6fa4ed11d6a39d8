use log::debug;

/// Offset of the PPG stream inside each interleaved frame.
///
/// Not derived from metadata: the device writes the primary optical channel
/// second.
pub const PRIMARY_CHANNEL_OFFSET: usize = 1;

/// Pull the primary channel out of an interleaved recording.
///
/// For 2 or 4 channels this takes every `channels`-th value starting at index
/// 1; any other count returns the data unchanged.
pub fn extract_primary<T: Copy>(data: &[T], channels: usize) -> Vec<T> {
    match channels {
        2 | 4 => {
            let out: Vec<T> = data
                .iter()
                .skip(PRIMARY_CHANNEL_OFFSET)
                .step_by(channels)
                .copied()
                .collect();
            debug!("{channels}-channel extraction: {} -> {} samples", data.len(), out.len());
            out
        }
        _ => data.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_channel_takes_offset_one_of_each_frame() {
        let data: Vec<u32> = (0..16).collect();
        assert_eq!(extract_primary(&data, 4), vec![1, 5, 9, 13]);
    }

    #[test]
    fn output_length_rounds_up_partial_frames() {
        let data: Vec<u32> = (0..11).collect();
        // floor((11 - 1) / 4) + 1
        assert_eq!(extract_primary(&data, 4).len(), 3);
        assert_eq!(extract_primary(&data, 2), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn single_channel_is_untouched() {
        let data = [3.0f32, 1.0, 2.0];
        assert_eq!(extract_primary(&data, 1), data.to_vec());
        assert!(extract_primary::<f32>(&[], 4).is_empty());
    }
}
