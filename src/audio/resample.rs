//! Downmix and linear-interpolation resampling.
//!
//! Normalizes arbitrary PCM buffers into the mono shape the transcription
//! model requires. Bit-exact for 8/16/32-bit PCM; other widths (24-bit)
//! are resampled in the i32 domain and clipped to the width's range,
//! which is best-effort rather than an error.

use crate::audio::buffer::AudioBuffer;

/// Resample a buffer to `target_rate`, downmixing to mono first.
///
/// When the rates already match the input is returned unchanged (identity
/// fast path, bit-exact). Otherwise the output has `floor(frames / rate *
/// target_rate)` samples produced by linear interpolation over evenly
/// spaced positions, cast back to the input width with clipping.
///
/// A zero-length input yields a zero-length output.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    if buffer.sample_rate() == target_rate {
        return buffer.clone();
    }

    let mono = downmix_to_mono(buffer);
    let n = mono.samples().len();
    let new_len =
        ((n as u128 * target_rate as u128) / mono.sample_rate() as u128) as usize;

    tracing::debug!(
        from_rate = mono.sample_rate(),
        to_rate = target_rate,
        frames_in = n,
        frames_out = new_len,
        "resampling"
    );

    let (min, max) = width_range(mono.bits_per_sample());
    let samples = mono.samples();
    let mut out = Vec::with_capacity(new_len);
    for i in 0..new_len {
        // Evenly spaced fractional positions over [0, n-1]
        let pos = if new_len == 1 {
            0.0
        } else {
            i as f64 * (n - 1) as f64 / (new_len - 1) as f64
        };
        let idx = pos.floor() as usize;
        let frac = pos - idx as f64;

        let value = if idx + 1 < n {
            let left = samples[idx] as f64;
            let right = samples[idx + 1] as f64;
            left + (right - left) * frac
        } else {
            samples[idx] as f64
        };

        out.push((value as i64).clamp(min, max) as i32);
    }

    AudioBuffer::new(out, target_rate, 1, mono.bits_per_sample())
}

/// Downmix a stereo buffer to mono by averaging the channel pair per frame.
///
/// The average rounds half away from zero and stays at the input width.
/// Mono input is returned unchanged.
pub fn downmix_to_mono(buffer: &AudioBuffer) -> AudioBuffer {
    if buffer.channels() == 1 {
        return buffer.clone();
    }

    let mono: Vec<i32> = buffer
        .samples()
        .chunks_exact(2)
        .map(|frame| {
            let sum = frame[0] as i64 + frame[1] as i64;
            let avg = if sum >= 0 { (sum + 1) / 2 } else { (sum - 1) / 2 };
            avg as i32
        })
        .collect();

    AudioBuffer::new(mono, buffer.sample_rate(), 1, buffer.bits_per_sample())
}

/// Representable range for a sample width, in the i64 domain used for clipping.
fn width_range(bits: u16) -> (i64, i64) {
    match bits {
        8 => (i8::MIN as i64, i8::MAX as i64),
        16 => (i16::MIN as i64, i16::MAX as i64),
        24 => (-(1 << 23), (1 << 23) - 1),
        _ => (i32::MIN as i64, i32::MAX as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_16(samples: Vec<i32>, rate: u32) -> AudioBuffer {
        AudioBuffer::new(samples, rate, 1, 16)
    }

    #[test]
    fn identity_when_rates_match() {
        let buffer = mono_16(vec![1, 2, 3, -4], 16000);
        assert_eq!(resample(&buffer, 16000), buffer);
    }

    #[test]
    fn identity_preserves_stereo() {
        // The fast path skips downmix entirely; no recomputation at all.
        let buffer = AudioBuffer::new(vec![10, -10, 20, -20], 44100, 2, 16);
        assert_eq!(resample(&buffer, 44100), buffer);
    }

    #[test]
    fn length_law_holds() {
        for (n, from, to) in [
            (8000usize, 8000u32, 16000u32),
            (16000, 16000, 8000),
            (44100, 44100, 16000),
            (1000, 22050, 16000),
            (3, 48000, 16000),
        ] {
            let buffer = mono_16(vec![0; n], from);
            let expected = (n as u64 * to as u64 / from as u64) as usize;
            assert_eq!(
                resample(&buffer, to).samples().len(),
                expected,
                "n={} {}→{}",
                n,
                from,
                to
            );
        }
    }

    #[test]
    fn one_second_8k_silence_to_16k_is_16000_zeros() {
        let buffer = mono_16(vec![0; 8000], 8000);
        let out = resample(&buffer, 16000);

        assert_eq!(out.sample_rate(), 16000);
        assert_eq!(out.channels(), 1);
        assert_eq!(out.bits_per_sample(), 16);
        assert_eq!(out.samples().len(), 16000);
        assert!(out.samples().iter().all(|&s| s == 0));
    }

    #[test]
    fn zero_length_input_yields_zero_length_output() {
        let buffer = mono_16(vec![], 44100);
        let out = resample(&buffer, 16000);
        assert!(out.is_empty());
        assert_eq!(out.sample_rate(), 16000);
    }

    #[test]
    fn single_sample_input() {
        let buffer = mono_16(vec![123], 8000);
        let out = resample(&buffer, 16000);
        assert_eq!(out.samples().len(), 2);
        assert!(out.samples().iter().all(|&s| s == 123));
    }

    #[test]
    fn downmix_averages_channel_pairs() {
        let buffer = AudioBuffer::new(vec![100, 200, -100, -200, 0, 0], 16000, 2, 16);
        let mono = downmix_to_mono(&buffer);

        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.samples(), &[150, -150, 0]);
    }

    #[test]
    fn downmix_rounds_half_away_from_zero() {
        let buffer = AudioBuffer::new(vec![1, 2, -1, -2], 16000, 2, 16);
        let mono = downmix_to_mono(&buffer);
        // (1+2)/2 = 1.5 → 2, (-1-2)/2 = -1.5 → -2
        assert_eq!(mono.samples(), &[2, -2]);
    }

    #[test]
    fn downmix_applies_before_rate_conversion() {
        let buffer = AudioBuffer::new(vec![1000, 2000, 1000, 2000], 8000, 2, 16);
        let out = resample(&buffer, 16000);

        assert_eq!(out.channels(), 1);
        // Constant 1500 after downmix stays constant through interpolation
        assert!(out.samples().iter().all(|&s| s == 1500));
        assert_eq!(out.samples().len(), 4);
    }

    #[test]
    fn interpolation_is_linear_between_neighbors() {
        // 2 samples at rate 2 → 3 samples at rate 3, positions 0, 0.5, 1
        let buffer = mono_16(vec![0, 3000], 2);
        let out = resample(&buffer, 3);

        assert_eq!(out.samples(), &[0, 1500, 3000]);
    }

    #[test]
    fn output_clips_to_sample_width() {
        let buffer = AudioBuffer::new(vec![120, 120, -120, -120], 8000, 1, 8);
        let out = resample(&buffer, 16000);

        assert_eq!(out.bits_per_sample(), 8);
        assert!(out
            .samples()
            .iter()
            .all(|&s| (i8::MIN as i32..=i8::MAX as i32).contains(&s)));
    }

    #[test]
    fn downsampling_preserves_constant_signal() {
        let buffer = mono_16(vec![500; 44100], 44100);
        let out = resample(&buffer, 16000);

        assert_eq!(out.samples().len(), 16000);
        assert!(out.samples().iter().all(|&s| s == 500));
    }
}
