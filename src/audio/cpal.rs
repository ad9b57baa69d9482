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
use std::{error::Error, fmt};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{error, info};

use super::thread_priority::{
    callback_thread_priority, configure_audio_thread_priority, rt_audio_enabled,
};
use crate::pattern::{DensityMap, Engine};

/// Largest number of frames rendered in one pass. Larger device buffers are
/// rendered in several passes so the scratch buffers never grow in the callback.
const MAX_BLOCK_FRAMES: usize = 4096;

/// A small wrapper around a cpal::Device with its default output configuration.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The configuration streams are opened with.
    config: cpal::SupportedStreamConfig,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={}, Format={:?}) ({})",
            self.name,
            self.config.channels(),
            self.config.sample_rate().0,
            self.config.sample_format(),
            self.host_id.name()
        )
    }
}

/// A running output stream. Playback stops when this is dropped.
pub struct OutputStream {
    _stream: cpal::Stream,
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(config) = device.default_output_config() else {
                    continue;
                };
                let Ok(name) = device.name() else {
                    continue;
                };
                devices.push(Device {
                    name,
                    host_id,
                    device,
                    config,
                });
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the output device with the given name.
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        match Device::list()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => Ok(device),
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    /// Gets the default output device of the default host.
    pub fn default_output() -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no default output device")?;
        Ok(Device {
            name: device.name()?,
            host_id: host.id(),
            config: device.default_output_config()?,
            device,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sample rate streams on this device run at.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    /// Moves the engine onto the device's audio thread and starts playback.
    pub fn play<M: DensityMap + 'static>(
        &self,
        engine: Engine<M>,
    ) -> Result<OutputStream, Box<dyn Error>> {
        let config = self.config.config();
        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32, M>(&self.device, &config, engine)?,
            cpal::SampleFormat::I16 => build_stream::<i16, M>(&self.device, &config, engine)?,
            cpal::SampleFormat::I32 => build_stream::<i32, M>(&self.device, &config, engine)?,
            cpal::SampleFormat::U16 => build_stream::<u16, M>(&self.device, &config, engine)?,
            format => return Err(format!("unsupported sample format {:?}", format).into()),
        };
        stream.play()?;

        info!(
            device = %self.name,
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?self.config.sample_format(),
            "Output stream started"
        );
        Ok(OutputStream { _stream: stream })
    }
}

fn build_stream<T, M>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine<M>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
    M: DensityMap + 'static,
{
    let channels = config.channels as usize;
    let priority = callback_thread_priority();
    let rt_audio = rt_audio_enabled();
    let mut priority_set = false;
    let mut scratch = Scratch::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            configure_audio_thread_priority(priority, rt_audio, &mut priority_set);
            render(&mut engine, data, channels, &mut scratch);
        },
        |err| error!(err = %err, "CPAL output stream error"),
        None,
    )
}

/// Planar buffers the engine renders into before interleaving.
struct Scratch {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Scratch {
    fn new() -> Scratch {
        Scratch {
            left: vec![0.0; MAX_BLOCK_FRAMES],
            right: vec![0.0; MAX_BLOCK_FRAMES],
        }
    }
}

/// Renders an interleaved device buffer. Mono devices get the mono mix, anything
/// wider gets the stereo mix on its first two channels and silence on the rest.
fn render<T, M>(engine: &mut Engine<M>, data: &mut [T], channels: usize, scratch: &mut Scratch)
where
    T: Sample + FromSample<f32>,
    M: DensityMap,
{
    if channels == 0 {
        return;
    }

    for block in data.chunks_mut(MAX_BLOCK_FRAMES * channels) {
        let frames = block.len() / channels;
        let left = &mut scratch.left[..frames];
        let right = &mut scratch.right[..frames];

        if channels == 1 {
            engine.process(left);
            for (out, sample) in block.iter_mut().zip(left.iter()) {
                *out = T::from_sample(*sample);
            }
            continue;
        }

        engine.process_stereo(left, right);
        for (i, frame) in block.chunks_exact_mut(channels).enumerate() {
            frame[0] = T::from_sample(left[i]);
            frame[1] = T::from_sample(right[i]);
            for out in frame[2..].iter_mut() {
                *out = T::EQUILIBRIUM;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{DrumPart, EngineOptions};
    use crate::testutil::{bank, mapping, ScriptedMap};

    fn engine() -> Engine<ScriptedMap> {
        let mut map = ScriptedMap::new(8);
        map.script = vec![DrumPart::Bd.mask()];
        let mut engine = Engine::new(
            map,
            bank(&[(36, vec![0.5; 20_000])]),
            EngineOptions {
                seed: Some(1),
                ..EngineOptions::default()
            },
        )
        .unwrap();
        engine.set_mappings(vec![mapping(36, DrumPart::Bd)]);
        engine
    }

    #[test]
    fn test_render_mono() {
        let mut engine = engine();
        let mut scratch = Scratch::new();
        let mut data = vec![0.0f32; 1000];
        render(&mut engine, &mut data, 1, &mut scratch);
        assert_eq!(engine.pulse_count(), 1);
        assert!(data.iter().all(|s| *s == 0.5));
    }

    #[test]
    fn test_render_interleaves_and_silences_extra_channels() {
        let mut engine = engine();
        engine.set_spread(1.0);
        let mut scratch = Scratch::new();
        let mut data = vec![7i16; 4 * 1000];
        render(&mut engine, &mut data, 4, &mut scratch);

        let centered = i16::from_sample(0.5 * std::f32::consts::FRAC_1_SQRT_2);
        for frame in data.chunks_exact(4) {
            assert_eq!(frame[0], centered);
            assert_eq!(frame[1], centered);
            assert_eq!(&frame[2..], &[0, 0]);
        }
    }

    #[test]
    fn test_render_large_buffer_in_blocks() {
        let mut engine = engine();
        let mut scratch = Scratch::new();
        let mut data = vec![0.0f32; 2 * (MAX_BLOCK_FRAMES * 2 + 100)];
        render(&mut engine, &mut data, 2, &mut scratch);
        assert_eq!(engine.pulse_count(), 8);
    }
}
