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

//! The rhythm engine: a pulse clock driving a density map, whose triggers are
//! spread over sample mappings and played through a voice pool.
//!
//! Everything reachable from [`Engine::process`] and [`Engine::process_stereo`] is
//! safe to call from an audio callback: no allocation, no locks and no I/O. All
//! other methods configure the engine and are meant to be called before it is
//! handed to the audio thread.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::samples::{SampleBank, VoicePool, DEFAULT_POOL_CAPACITY};

use super::clock::PatternClock;
use super::density::{DensityMap, DrumPart, NUM_PARTS};
use super::dispatch::dispatch_triggers;
use super::error::{validate_tempo, EngineError};
use super::humanize::{HumanizeScheduler, Humanized};
use super::lfo::{frequency_for_period, LfoModulator, LfoState, MAX_PERIOD_SECS, MIN_PERIOD_SECS};
use super::mapping::{apply_spread, SampleMapping, VelocitySequence, MAX_VELOCITY_STEPS};
use super::monitor::{PatternChangeMonitor, PatternSnapshot, SnapshotReader};

/// Startup parameters of an [`Engine`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    pub sample_rate: u32,
    pub bpm: f32,
    /// Number of voices in the pool.
    pub voices: usize,
    /// Seed for sample assignment and jitter. Uses entropy if unset.
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            sample_rate: 48000,
            bpm: 120.0,
            voices: DEFAULT_POOL_CAPACITY,
            seed: None,
        }
    }
}

pub struct Engine<M: DensityMap> {
    map: M,
    pool: VoicePool,
    clock: PatternClock,
    lfo: LfoModulator,
    humanize: HumanizeScheduler,
    monitor: PatternChangeMonitor,
    mappings: Vec<SampleMapping>,
    /// Bitmask of parts with at least one mapping.
    active_parts: u8,
    sample_rate: u32,
    bpm: f32,
    pattern_length: usize,
    spread: f32,
    output_gain: f32,
    pulse_count: u64,
    rng: StdRng,
}

impl<M: DensityMap> Engine<M> {
    /// Creates a new engine. Fails if the sample rate, tempo or voice count is unusable.
    pub fn new(
        mut map: M,
        bank: Arc<SampleBank>,
        options: EngineOptions,
    ) -> Result<Engine<M>, EngineError> {
        if options.sample_rate == 0 {
            return Err(EngineError::InvalidSampleRate);
        }
        validate_tempo(options.bpm)?;
        if options.voices == 0 {
            return Err(EngineError::NoVoices);
        }

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        map.init();
        let pattern_length = map.num_steps();

        info!(
            sample_rate = options.sample_rate,
            bpm = options.bpm,
            voices = options.voices,
            "Engine initialized"
        );

        Ok(Engine {
            pool: VoicePool::new(bank, options.voices),
            clock: PatternClock::new(options.sample_rate, options.bpm),
            lfo: LfoModulator::new(false),
            humanize: HumanizeScheduler::new(rng.gen()),
            monitor: PatternChangeMonitor::new(),
            mappings: Vec::new(),
            active_parts: 0,
            sample_rate: options.sample_rate,
            bpm: options.bpm,
            pattern_length,
            spread: 0.0,
            output_gain: 1.0,
            pulse_count: 0,
            map,
            rng,
        })
    }

    /// Picks up to `max_parts` distinct notes at random and assigns each one a drum
    /// part, a random map coordinate, a random velocity sequence of `velocity_steps`
    /// steps and a slow LFO. The current stereo spread is applied to the result.
    pub fn assign_samples_to_parts(
        &mut self,
        notes: &[u8],
        max_parts: usize,
        velocity_steps: usize,
    ) -> Result<&[SampleMapping], EngineError> {
        if max_parts == 0 {
            return Err(EngineError::NoParts);
        }
        if velocity_steps == 0 || velocity_steps > MAX_VELOCITY_STEPS {
            return Err(EngineError::InvalidVelocitySteps(velocity_steps));
        }

        let count = max_parts.min(notes.len());
        let selected: Vec<u8> = notes
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();

        // Round-robin over a shuffle so every part is used once there are enough notes.
        let mut parts: Vec<DrumPart> = (0..count).map(|i| DrumPart::ALL[i % NUM_PARTS]).collect();
        parts.shuffle(&mut self.rng);

        let mut mappings = Vec::with_capacity(count);
        let mut steps = [0u8; MAX_VELOCITY_STEPS];
        for (note, part) in selected.into_iter().zip(parts) {
            let x: u8 = self.rng.gen();
            let y: u8 = self.rng.gen();
            for step in steps[..velocity_steps].iter_mut() {
                *step = self.rng.gen_range(0..=1);
            }
            let velocity = VelocitySequence::new(&steps[..velocity_steps])
                .ok_or(EngineError::InvalidVelocitySteps(velocity_steps))?;
            let freq_x = frequency_for_period(
                self.rng.gen_range(MIN_PERIOD_SECS..=MAX_PERIOD_SECS),
                self.sample_rate,
            );
            let freq_y = frequency_for_period(
                self.rng.gen_range(MIN_PERIOD_SECS..=MAX_PERIOD_SECS),
                self.sample_rate,
            );

            debug!(note, part = %part, x, y, "Assigned sample");
            mappings.push(SampleMapping {
                note,
                part,
                x,
                y,
                velocity,
                lfo: LfoState::seeded(x, y, freq_x, freq_y),
                pan: 0.0,
            });
        }
        mappings.sort_by_key(|mapping| mapping.note);

        info!(
            available = notes.len(),
            assigned = mappings.len(),
            velocity_steps,
            "Assigned samples to parts"
        );

        self.set_mappings(mappings);
        apply_spread(&mut self.mappings, self.spread);
        Ok(&self.mappings)
    }

    /// Replaces the mappings as they are, keeping their pans and cursors.
    pub fn set_mappings(&mut self, mappings: Vec<SampleMapping>) {
        self.mappings = mappings;
        self.active_parts = self
            .mappings
            .iter()
            .fold(0, |parts, mapping| parts | mapping.part.mask());
        self.monitor
            .force_update(&self.map, self.pattern_length, self.active_parts);
    }

    pub fn mappings(&self) -> &[SampleMapping] {
        &self.mappings
    }

    /// Changes the tempo without restarting the current pulse.
    ///
    /// If the shorter pulse leaves no room for jitter, waiting triggers are played
    /// immediately, as when humanize is turned off.
    pub fn set_tempo(&mut self, bpm: f32) -> Result<(), EngineError> {
        validate_tempo(bpm)?;
        self.bpm = bpm;
        self.clock.set_tempo(bpm);
        self.humanize
            .set_frames_per_pulse(self.clock.frames_per_pulse());
        if !self.humanize.is_enabled() {
            self.humanize.flush(&mut self.pool);
        }
        Ok(())
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames_per_pulse(&self) -> f64 {
        self.clock.frames_per_pulse()
    }

    pub fn set_pattern_x(&mut self, x: u8) {
        self.map.settings_mut().x = x;
    }

    pub fn pattern_x(&self) -> u8 {
        self.map.settings().x
    }

    pub fn set_pattern_y(&mut self, y: u8) {
        self.map.settings_mut().y = y;
    }

    pub fn pattern_y(&self) -> u8 {
        self.map.settings().y
    }

    pub fn set_randomness(&mut self, randomness: u8) {
        self.map.settings_mut().randomness = randomness;
    }

    pub fn randomness(&self) -> u8 {
        self.map.settings().randomness
    }

    pub fn set_density(&mut self, part: DrumPart, density: u8) {
        self.map.settings_mut().density[part.index()] = density;
    }

    pub fn density(&self, part: DrumPart) -> u8 {
        self.map.settings().density[part.index()]
    }

    /// Loops the pattern after `length` steps instead of the map's native length.
    pub fn set_pattern_length(&mut self, length: usize) -> Result<(), EngineError> {
        let max = self.map.num_steps();
        if length == 0 || length > max {
            return Err(EngineError::InvalidPatternLength { length, max });
        }
        self.pattern_length = length;
        if self.map.step() >= length {
            self.map.reset_step();
        }
        Ok(())
    }

    pub fn pattern_length(&self) -> usize {
        self.pattern_length
    }

    pub fn set_lfo_enabled(&mut self, enabled: bool) {
        self.lfo.set_enabled(enabled);
    }

    pub fn lfo_enabled(&self) -> bool {
        self.lfo.is_enabled()
    }

    /// Sets the timing jitter in `[0, 1]`, where 1 is up to half a step either way.
    ///
    /// The pulse clock is shifted forward by the change in maximum jitter so that
    /// jittered triggers stay centered on the grid. Triggers still waiting when
    /// humanize is turned off are played immediately.
    pub fn set_humanize(&mut self, amount: f32) {
        let shift = self
            .humanize
            .set_amount(amount, self.clock.frames_per_pulse());
        self.clock.shift(shift);
        if !self.humanize.is_enabled() {
            self.humanize.flush(&mut self.pool);
        }
    }

    pub fn humanize(&self) -> f32 {
        self.humanize.amount()
    }

    /// Spreads the mappings across the stereo field. See [`apply_spread`].
    pub fn set_spread(&mut self, spread: f32) {
        self.spread = spread;
        apply_spread(&mut self.mappings, self.spread);
    }

    pub fn spread(&self) -> f32 {
        self.spread
    }

    /// Sets the gain applied to the mixed output. Negative values are treated as zero.
    pub fn set_output_gain(&mut self, gain: f32) {
        self.output_gain = gain.max(0.0);
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain
    }

    /// Returns a reader for pattern snapshots that can be moved to another thread.
    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.monitor.reader()
    }

    /// The last published pattern snapshot.
    pub fn snapshot(&self) -> PatternSnapshot {
        *self.monitor.current()
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_voice_count()
    }

    pub fn total_triggers(&self) -> u64 {
        self.pool.total_triggers()
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulse_count
    }

    /// Number of humanized triggers still waiting to play.
    pub fn pending_triggers(&self) -> usize {
        self.humanize.pending()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Runs the engine for `output.len()` frames and renders them as mono.
    pub fn process(&mut self, output: &mut [f32]) {
        self.advance(output.len());
        self.pool.process(output);
        apply_gain(output, self.output_gain);
    }

    /// Runs the engine for as many frames as both buffers hold and renders them as
    /// panned stereo.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        self.advance(frames);
        self.pool.process_stereo(left, right);
        apply_gain(&mut left[..frames], self.output_gain);
        apply_gain(&mut right[..frames], self.output_gain);
    }

    fn advance(&mut self, frames: usize) {
        for _ in 0..frames {
            for _ in 0..self.clock.tick() {
                self.pulse();
            }
            if self.humanize.is_enabled() {
                self.humanize.tick(&mut self.pool);
            }
        }
    }

    fn pulse(&mut self) {
        self.lfo.update(
            &mut self.mappings,
            self.clock.frames_per_pulse(),
            self.map.settings_mut(),
        );
        self.monitor
            .update(&self.map, self.pattern_length, self.active_parts);

        self.map.tick_clock(1);
        let state = self.map.state();
        let mut sink = Humanized {
            scheduler: &mut self.humanize,
            sink: &mut self.pool,
        };
        dispatch_triggers(state, &mut self.mappings, &mut sink);
        self.map.increment_pulse_counter();
        self.pulse_count += 1;

        if self.pattern_length < self.map.num_steps() && self.map.step() >= self.pattern_length {
            self.map.reset_step();
        }
    }
}

#[inline]
fn apply_gain(buffer: &mut [f32], gain: f32) {
    if gain != 1.0 {
        buffer.iter_mut().for_each(|sample| *sample *= gain);
    }
}
