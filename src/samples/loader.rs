// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! WAV decoding for the sample bank.
//!
//! Every sample is decoded fully into memory, folded down to mono and converted
//! to the output sample rate so that playback is a plain copy.

use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavReader};
use tracing::{debug, info};

use super::error::SampleBankError;

/// Decodes a WAV file into mono f32 frames at `target_sample_rate`.
pub fn load_wav(path: &Path, target_sample_rate: u32) -> Result<Vec<f32>, SampleBankError> {
    if target_sample_rate == 0 {
        return Err(SampleBankError::InvalidSampleRate);
    }

    let wav_error = |source| SampleBankError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let reader = WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(SampleBankError::UnsupportedBitDepth {
                    path: path.to_path_buf(),
                    bits: spec.bits_per_sample,
                });
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    let mono = match spec.channels {
        1 => interleaved,
        2 => stereo_to_mono(&interleaved),
        channels => {
            return Err(SampleBankError::UnsupportedChannels {
                path: path.to_path_buf(),
                channels,
            })
        }
    };

    let frames = if spec.sample_rate != target_sample_rate {
        debug!(
            path = ?path,
            source_rate = spec.sample_rate,
            target_rate = target_sample_rate,
            "Resampling sample"
        );
        resample_linear(&mono, spec.sample_rate, target_sample_rate)
    } else {
        mono
    };

    let duration = Duration::from_secs_f64(frames.len() as f64 / target_sample_rate as f64);
    info!(
        path = ?path,
        channels = spec.channels,
        source_rate = spec.sample_rate,
        frames = frames.len(),
        duration_ms = duration.as_millis(),
        "Sample decoded"
    );

    Ok(frames)
}

/// Averages left and right channels.
fn stereo_to_mono(samples: &[f32]) -> Vec<f32> {
    samples
        .chunks_exact(2)
        .map(|frame| (frame[0] + frame[1]) * 0.5)
        .collect()
}

/// Converts mono frames from one sample rate to another using linear interpolation.
/// Good enough for drum hits and one-shots.
fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let target_frames = (samples.len() as f64 * ratio).ceil() as usize;

    (0..target_frames)
        .map(|target_frame| {
            let source_pos = target_frame as f64 / ratio;
            let index = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            match (samples.get(index), samples.get(index + 1)) {
                (Some(&s0), Some(&s1)) => s0 + (s1 - s0) * frac,
                (Some(&s0), None) => s0,
                _ => 0.0,
            }
        })
        .collect()
}
