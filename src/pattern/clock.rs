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

/// Sequencer pulses per quarter note.
pub const PPQN: u32 = 24;

/// Returns the number of audio frames in one pulse at the given tempo.
#[inline]
pub fn frames_per_pulse(sample_rate: u32, bpm: f32) -> f64 {
    let pulses_per_second = bpm as f64 * PPQN as f64 / 60.0;
    sample_rate as f64 / pulses_per_second
}

/// A frame-driven pulse clock.
///
/// The clock is fed one frame at a time. The fractional remainder of each pulse
/// carries into the next one, so the clock never drifts over long runs.
#[derive(Clone, Debug)]
pub struct PatternClock {
    sample_rate: u32,
    frames_per_pulse: f64,
    elapsed: f64,
}

impl PatternClock {
    /// Creates a new clock. The caller must have validated that both the sample rate
    /// and tempo are positive.
    pub fn new(sample_rate: u32, bpm: f32) -> PatternClock {
        PatternClock {
            sample_rate,
            frames_per_pulse: frames_per_pulse(sample_rate, bpm),
            elapsed: 0.0,
        }
    }

    /// Changes the tempo without resetting the phase of the current pulse.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.frames_per_pulse = frames_per_pulse(self.sample_rate, bpm);
    }

    pub fn frames_per_pulse(&self) -> f64 {
        self.frames_per_pulse
    }

    /// Frames accumulated towards the next pulse.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Moves the pulse phase by the given number of frames. A positive value makes
    /// the next pulse arrive earlier.
    pub fn shift(&mut self, frames: f64) {
        self.elapsed += frames;
    }

    /// Resets the phase to the start of a pulse.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    /// Consumes a single frame and returns how many pulses elapsed during it.
    ///
    /// This is almost always zero or one. It can be more when the phase was shifted
    /// forward or a pulse is shorter than a frame.
    #[inline]
    pub fn tick(&mut self) -> u32 {
        self.elapsed += 1.0;
        let mut pulses = 0;
        while self.elapsed >= self.frames_per_pulse {
            self.elapsed -= self.frames_per_pulse;
            pulses += 1;
        }
        pulses
    }
}
