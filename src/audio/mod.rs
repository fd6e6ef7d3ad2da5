//! PCM buffers and resampling.

pub mod buffer;
pub mod resample;

pub use buffer::AudioBuffer;
pub use resample::resample;
