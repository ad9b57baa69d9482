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

//! Fixed-size voice pool for polyphonic sample playback.
//!
//! Voices are allocated round-robin. The next slot is always taken, whether or not
//! it is still playing, so a trigger never fails and the oldest sound is cut off
//! when the pool wraps around. Nothing in this module allocates after construction.

use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

use super::bank::SampleBank;

/// Default number of voices in the pool.
pub const DEFAULT_POOL_CAPACITY: usize = 256;

/// Gain applied to both channels of a centered voice (cos(pi/4)).
const CENTER_PAN_GAIN: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Returns equal-power (left, right) gains for a pan value in [-1, 1].
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let theta = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (theta.cos(), theta.sin())
}

/// A single playback slot.
#[derive(Clone, Debug)]
pub struct Voice {
    /// Shared sample frames; None while the voice is idle.
    sample: Option<Arc<[f32]>>,
    /// Current playback position in frames.
    position: usize,
    /// Linear gain derived from velocity.
    gain: f32,
    pan_left: f32,
    pan_right: f32,
    active: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Voice {
            sample: None,
            position: 0,
            gain: 1.0,
            pan_left: CENTER_PAN_GAIN,
            pan_right: CENTER_PAN_GAIN,
            active: false,
        }
    }
}

impl Voice {
    fn start(&mut self, sample: Arc<[f32]>, velocity: f32, pan: f32) {
        let (left, right) = pan_gains(pan);
        self.sample = Some(sample);
        self.position = 0;
        self.gain = velocity;
        self.pan_left = left;
        self.pan_right = right;
        self.active = true;
    }

    fn reset(&mut self) {
        *self = Voice::default();
    }

    fn len(&self) -> usize {
        self.sample.as_ref().map_or(0, |s| s.len())
    }

    fn is_finished(&self) -> bool {
        self.position >= self.len()
    }

    /// Returns the frames still to be played.
    fn remaining(&self) -> &[f32] {
        match &self.sample {
            Some(sample) => &sample[self.position.min(sample.len())..],
            None => &[],
        }
    }

    /// Returns true if this voice is currently playing.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the current playback position in frames.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the linear gain of this voice.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Returns the (left, right) pan gains of this voice.
    pub fn pan_gains(&self) -> (f32, f32) {
        (self.pan_left, self.pan_right)
    }
}

/// Pre-allocated pool of voices mixed into the output on every audio period.
pub struct VoicePool {
    voices: Box<[Voice]>,
    /// Next slot to allocate (circular).
    next_voice: usize,
    bank: Arc<SampleBank>,
    /// Voices that produced output during the last process call.
    active_voices: usize,
    total_triggers: u64,
}

impl VoicePool {
    /// Creates a pool with the given number of voices. A zero capacity is raised to one.
    pub fn new(bank: Arc<SampleBank>, capacity: usize) -> VoicePool {
        VoicePool {
            voices: vec![Voice::default(); capacity.max(1)].into_boxed_slice(),
            next_voice: 0,
            bank,
            active_voices: 0,
            total_triggers: 0,
        }
    }

    /// Starts playback of the sample mapped to `note`.
    ///
    /// Velocity is clamped to [0, 1] and pan to [-1, 1]. Unknown or empty samples are
    /// ignored without touching any counters.
    pub fn trigger(&mut self, note: u8, velocity: f32, pan: f32) {
        let Some(sample) = self.bank.get(note) else {
            return;
        };
        if sample.is_empty() {
            return;
        }

        let voice = &mut self.voices[self.next_voice];
        let was_active = voice.active;
        voice.start(Arc::clone(sample.data()), velocity.clamp(0.0, 1.0), pan);

        if !was_active {
            self.active_voices += 1;
        }
        self.total_triggers += 1;
        self.next_voice = (self.next_voice + 1) % self.voices.len();
    }

    /// Mixes all active voices into a mono buffer, overwriting its contents.
    pub fn process(&mut self, output: &mut [f32]) {
        if output.is_empty() {
            return;
        }
        output.fill(0.0);

        self.active_voices = 0;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            if voice.is_finished() {
                voice.reset();
                continue;
            }
            let gain = voice.gain;
            let remaining = voice.remaining();
            let frames = remaining.len().min(output.len());
            for (out, sample) in output.iter_mut().zip(&remaining[..frames]) {
                *out += sample * gain;
            }

            voice.position += frames;
            if voice.is_finished() {
                voice.reset();
            } else {
                self.active_voices += 1;
            }
        }
    }

    /// Mixes all active voices into a pair of planar buffers using each voice's pan.
    /// Only the frames both buffers share are rendered.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        if frames == 0 {
            return;
        }
        let (left, right) = (&mut left[..frames], &mut right[..frames]);
        left.fill(0.0);
        right.fill(0.0);

        self.active_voices = 0;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            if voice.is_finished() {
                voice.reset();
                continue;
            }
            let gain_left = voice.gain * voice.pan_left;
            let gain_right = voice.gain * voice.pan_right;
            let remaining = voice.remaining();
            let count = remaining.len().min(frames);
            for (i, sample) in remaining[..count].iter().enumerate() {
                left[i] += sample * gain_left;
                right[i] += sample * gain_right;
            }

            voice.position += count;
            if voice.is_finished() {
                voice.reset();
            } else {
                self.active_voices += 1;
            }
        }
    }

    /// Returns the number of voices still playing after the last process call,
    /// plus any started since.
    pub fn active_voice_count(&self) -> usize {
        self.active_voices
    }

    /// Returns the total number of triggers accepted since creation.
    pub fn total_triggers(&self) -> u64 {
        self.total_triggers
    }

    /// Returns the number of voices in the pool.
    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Returns the voice slots.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("capacity", &self.voices.len())
            .field("active_voices", &self.active_voices)
            .field("total_triggers", &self.total_triggers)
            .finish()
    }
}
