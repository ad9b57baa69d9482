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

use std::any::TypeId;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::pattern::{
    DensityMap, DrumPart, PatternSettings, SampleMapping, TriggerSink, VelocitySequence,
};
use crate::samples::{Sample, SampleBank};

/// Writes a WAV file with one inner vector per channel. The channels are
/// interleaved on write. `f32` samples are written as 32-bit float, `i16` as 16-bit
/// integer and `i32` as 32-bit integer.
pub fn write_wav<S: hound::Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let (sample_format, bits_per_sample) = if TypeId::of::<S>() == TypeId::of::<f32>() {
        (SampleFormat::Float, 32)
    } else if TypeId::of::<S>() == TypeId::of::<i16>() {
        (SampleFormat::Int, 16)
    } else if TypeId::of::<S>() == TypeId::of::<i32>() {
        (SampleFormat::Int, 32)
    } else {
        return Err("Unsupported sample format".into());
    };

    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let frames = samples.iter().map(Vec::len).max().unwrap_or(0);
    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )?;

    for frame in 0..frames {
        for channel in &samples {
            if let Some(sample) = channel.get(frame) {
                writer.write_sample(*sample)?;
            }
        }
    }
    writer.finalize()?;

    Ok(())
}

/// Builds an in-memory sample bank.
pub fn bank(samples: &[(u8, Vec<f32>)]) -> Arc<SampleBank> {
    Arc::new(SampleBank::from_samples(samples.iter().map(|(note, data)| {
        (*note, Sample::new(data.clone(), format!("{note}.wav")))
    })))
}

/// A centered mapping whose velocity sequence always accents.
pub fn mapping(note: u8, part: DrumPart) -> SampleMapping {
    let velocity = VelocitySequence::new(&[1]).expect("one step is a valid sequence");
    SampleMapping::new(note, part, velocity)
}

/// A trigger sink that records every trigger it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub triggers: Vec<(u8, f32, f32)>,
}

impl TriggerSink for RecordingSink {
    fn trigger(&mut self, note: u8, velocity: f32, pan: f32) {
        self.triggers.push((note, velocity, pan));
    }
}

type LevelFn = dyn Fn(usize, DrumPart, u8, u8) -> u8 + Send;

/// A density map that plays back a script of trigger states and records how the
/// engine drives it.
pub struct ScriptedMap {
    pub settings: PatternSettings,
    pub num_steps: usize,
    pub pulses_per_step: usize,
    /// Trigger states returned by successive ticks, repeated. Empty means silence.
    pub script: Vec<u8>,
    pub levels: Box<LevelFn>,
    pub step: usize,
    pub ticks: usize,
    pub init_calls: usize,
    pub pulse_counter_calls: usize,
    pub resets: usize,
    /// Map position seen by each tick.
    pub tick_positions: Vec<(u8, u8)>,
    state: u8,
}

impl ScriptedMap {
    pub fn new(num_steps: usize) -> ScriptedMap {
        ScriptedMap {
            settings: PatternSettings::default(),
            num_steps,
            pulses_per_step: 3,
            script: Vec::new(),
            levels: Box::new(|_, _, _, _| 0),
            step: 0,
            ticks: 0,
            init_calls: 0,
            pulse_counter_calls: 0,
            resets: 0,
            tick_positions: Vec::new(),
            state: 0,
        }
    }
}

impl DensityMap for ScriptedMap {
    fn init(&mut self) {
        self.init_calls += 1;
        self.step = 0;
        self.state = 0;
    }

    fn tick_clock(&mut self, pulses: u8) {
        for _ in 0..pulses {
            self.tick_positions.push((self.settings.x, self.settings.y));
            self.state = if self.script.is_empty() {
                0
            } else {
                self.script[self.ticks % self.script.len()]
            };
            self.ticks += 1;
            if self.ticks % self.pulses_per_step == 0 {
                self.step = (self.step + 1) % self.num_steps;
            }
        }
    }

    fn state(&self) -> u8 {
        self.state
    }

    fn increment_pulse_counter(&mut self) {
        self.pulse_counter_calls += 1;
        self.state = 0;
    }

    fn drum_map_level(&self, step: usize, part: DrumPart, x: u8, y: u8) -> u8 {
        (self.levels)(step, part, x, y)
    }

    fn num_steps(&self) -> usize {
        self.num_steps
    }

    fn step(&self) -> usize {
        self.step
    }

    fn reset_step(&mut self) {
        self.resets += 1;
        self.step = 0;
    }

    fn settings(&self) -> &PatternSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut PatternSettings {
        &mut self.settings
    }
}
