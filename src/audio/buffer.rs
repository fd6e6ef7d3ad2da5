//! Decoded PCM audio buffers with WAV container read/write.

use crate::error::{Result, TalkbackError};
use std::io::Read;
use std::path::Path;

/// A decoded PCM buffer.
///
/// Samples are stored interleaved in the widest supported width (i32);
/// `bits_per_sample` records the container width so writes and clipping
/// stay bit-exact for 8/16/32-bit PCM. 24-bit input decodes fine but is
/// handled best-effort (see [`crate::audio::resample`]).
///
/// Buffers are created fresh per pipeline invocation and never shared
/// across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<i32>,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples.
    pub fn new(samples: Vec<i32>, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        debug_assert!(sample_rate > 0);
        debug_assert!(channels == 1 || channels == 2);
        Self {
            samples,
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Read and decode a WAV file.
    ///
    /// # Errors
    /// Returns `TalkbackError::UnsupportedAudioFormat` for malformed
    /// containers, float PCM, or more than two channels.
    pub fn from_wav_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| TalkbackError::UnsupportedAudioFormat {
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        Self::from_wav_reader(std::io::BufReader::new(file))
    }

    /// Read and decode WAV data from any reader.
    pub fn from_wav_reader(reader: impl Read) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| TalkbackError::UnsupportedAudioFormat {
                message: format!("failed to parse WAV container: {}", e),
            })?;

        let spec = wav_reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(TalkbackError::UnsupportedAudioFormat {
                message: "float PCM is not supported, expected integer samples".to_string(),
            });
        }
        if spec.channels == 0 || spec.channels > 2 {
            return Err(TalkbackError::UnsupportedAudioFormat {
                message: format!("expected 1 or 2 channels, got {}", spec.channels),
            });
        }

        let samples: Vec<i32> = wav_reader
            .samples::<i32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TalkbackError::UnsupportedAudioFormat {
                message: format!("failed to read WAV samples: {}", e),
            })?;

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
        })
    }

    /// Persist the buffer as a WAV file, distinct from any input artifact.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).map_err(|e| {
            TalkbackError::UnsupportedAudioFormat {
                message: format!("failed to create WAV file: {}", e),
            }
        })?;

        for &sample in &self.samples {
            let written = match self.bits_per_sample {
                8 => writer.write_sample(sample as i8),
                16 => writer.write_sample(sample as i16),
                _ => writer.write_sample(sample),
            };
            written.map_err(|e| TalkbackError::UnsupportedAudioFormat {
                message: format!("failed to write WAV sample: {}", e),
            })?;
        }
        writer
            .finalize()
            .map_err(|e| TalkbackError::UnsupportedAudioFormat {
                message: format!("failed to finalize WAV file: {}", e),
            })
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Convert a mono buffer to 16-bit samples for model input.
    ///
    /// Wider samples are shifted down, narrower shifted up; a 16-bit
    /// buffer passes through unchanged.
    pub fn to_i16_samples(&self) -> Vec<i16> {
        debug_assert_eq!(self.channels, 1);
        let shift = self.bits_per_sample as i32 - 16;
        self.samples
            .iter()
            .map(|&s| {
                let v = if shift >= 0 {
                    (s as i64) >> shift
                } else {
                    (s as i64) << (-shift)
                };
                v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, bits: u16, samples: &[i32]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            match bits {
                8 => writer.write_sample(s as i8).unwrap(),
                16 => writer.write_sample(s as i16).unwrap(),
                _ => writer.write_sample(s).unwrap(),
            }
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn reads_mono_16bit_wav() {
        let data = make_wav_data(16000, 1, 16, &[0, 100, -100, 32767, -32768]);
        let buffer = AudioBuffer::from_wav_reader(Cursor::new(data)).unwrap();

        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.bits_per_sample(), 16);
        assert_eq!(buffer.samples(), &[0, 100, -100, 32767, -32768]);
        assert_eq!(buffer.frames(), 5);
    }

    #[test]
    fn reads_stereo_wav() {
        let data = make_wav_data(44100, 2, 16, &[1, 2, 3, 4]);
        let buffer = AudioBuffer::from_wav_reader(Cursor::new(data)).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 2);
    }

    #[test]
    fn reads_8bit_wav() {
        let data = make_wav_data(8000, 1, 8, &[0, 127, -128]);
        let buffer = AudioBuffer::from_wav_reader(Cursor::new(data)).unwrap();

        assert_eq!(buffer.bits_per_sample(), 8);
        assert_eq!(buffer.samples(), &[0, 127, -128]);
    }

    #[test]
    fn rejects_garbage_container() {
        let result = AudioBuffer::from_wav_reader(Cursor::new(b"not a wav file".to_vec()));
        assert!(matches!(
            result,
            Err(TalkbackError::UnsupportedAudioFormat { .. })
        ));
    }

    #[test]
    fn rejects_missing_file() {
        let result = AudioBuffer::from_wav_path(Path::new("/nonexistent/input.wav"));
        assert!(matches!(
            result,
            Err(TalkbackError::UnsupportedAudioFormat { .. })
        ));
    }

    #[test]
    fn empty_wav_decodes_to_empty_buffer() {
        let data = make_wav_data(16000, 1, 16, &[]);
        let buffer = AudioBuffer::from_wav_reader(Cursor::new(data)).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.frames(), 0);
    }

    #[test]
    fn write_wav_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buffer = AudioBuffer::new(vec![0, 500, -500], 16000, 1, 16);

        buffer.write_wav(&path).unwrap();
        let read_back = AudioBuffer::from_wav_path(&path).unwrap();

        assert_eq!(read_back, buffer);
    }

    #[test]
    fn to_i16_passes_16bit_through() {
        let buffer = AudioBuffer::new(vec![0, 1000, -1000], 16000, 1, 16);
        assert_eq!(buffer.to_i16_samples(), vec![0, 1000, -1000]);
    }

    #[test]
    fn to_i16_scales_widths() {
        let buffer = AudioBuffer::new(vec![127], 16000, 1, 8);
        assert_eq!(buffer.to_i16_samples(), vec![127 << 8]);

        let buffer = AudioBuffer::new(vec![i32::MAX], 16000, 1, 32);
        assert_eq!(buffer.to_i16_samples(), vec![i16::MAX]);
    }
}
