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

//! A small procedural density map.
//!
//! The map is a 3x3 grid of nodes. Each node blends a metric template per drum part
//! (strong beats for the kick, backbeats for the snare, off-beats for the hats) with
//! a deterministic hash, and positions between nodes are interpolated bilinearly.
//! A trigger state is evaluated on the first pulse of every step.

use super::density::{step_fires, DensityMap, DrumPart, PatternSettings};
use super::humanize::Lcg;

/// Steps in one pattern.
pub const NUM_STEPS: usize = 32;

/// Clock pulses per step (24 PPQN, eight steps per quarter note).
pub const PULSES_PER_STEP: u8 = 3;

/// Number of pulses a trigger stays high.
const TRIGGER_PULSES: u8 = 1;

/// How far each node leans away from the metric template towards hashed noise.
const NODE_VARIATION: [u32; 9] = [0, 48, 96, 64, 128, 160, 112, 192, 224];

pub struct ProceduralMap {
    settings: PatternSettings,
    step: usize,
    pulse: u8,
    state: u8,
    pulse_duration_counter: u8,
    rng: Lcg,
}

impl ProceduralMap {
    /// Creates a map whose randomness is driven by the given seed.
    pub fn new(seed: u64) -> ProceduralMap {
        ProceduralMap {
            settings: PatternSettings::default(),
            step: 0,
            pulse: 0,
            state: 0,
            pulse_duration_counter: 0,
            rng: Lcg::new((seed ^ (seed >> 32)) as u32),
        }
    }

    fn evaluate_drums(&mut self) {
        let PatternSettings {
            x,
            y,
            randomness,
            density,
        } = self.settings;

        self.state = 0;
        for part in DrumPart::ALL {
            let mut level = self.drum_map_level(self.step, part, x, y);
            if randomness > 0 {
                let perturbation = ((self.rng.next_u32() >> 24) * randomness as u32) >> 8;
                level = level.saturating_add(perturbation as u8);
            }
            if step_fires(level, density[part.index()]) {
                self.state |= part.mask();
            }
        }
    }
}

impl Default for ProceduralMap {
    fn default() -> Self {
        ProceduralMap::new(0)
    }
}

impl DensityMap for ProceduralMap {
    fn init(&mut self) {
        self.step = 0;
        self.pulse = 0;
        self.state = 0;
        self.pulse_duration_counter = 0;
    }

    fn tick_clock(&mut self, pulses: u8) {
        for _ in 0..pulses {
            if self.pulse == 0 {
                self.evaluate_drums();
                self.pulse_duration_counter = 0;
            }
            self.pulse += 1;
            if self.pulse >= PULSES_PER_STEP {
                self.pulse = 0;
                self.step = (self.step + 1) % NUM_STEPS;
            }
        }
    }

    fn state(&self) -> u8 {
        self.state
    }

    fn increment_pulse_counter(&mut self) {
        self.pulse_duration_counter = self.pulse_duration_counter.saturating_add(1);
        if self.pulse_duration_counter >= TRIGGER_PULSES {
            self.state = 0;
        }
    }

    fn drum_map_level(&self, step: usize, part: DrumPart, x: u8, y: u8) -> u8 {
        let step = step % NUM_STEPS;
        let (col, x_frac) = grid_position(x);
        let (row, y_frac) = grid_position(y);

        let level = |row: usize, col: usize| node_level(row * 3 + col, part, step);
        let top = lerp(level(row, col), level(row, col + 1), x_frac);
        let bottom = lerp(level(row + 1, col), level(row + 1, col + 1), x_frac);
        lerp(top, bottom, y_frac) as u8
    }

    fn num_steps(&self) -> usize {
        NUM_STEPS
    }

    fn step(&self) -> usize {
        self.step
    }

    fn reset_step(&mut self) {
        self.step = 0;
    }

    fn settings(&self) -> &PatternSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut PatternSettings {
        &mut self.settings
    }
}

/// Splits a map coordinate into a cell index (0 or 1) and a fraction in 0..=255.
fn grid_position(coord: u8) -> (usize, u32) {
    let cell = (coord >> 7) as usize;
    let frac = ((coord & 0x7f) as u32) << 1;
    (cell, frac)
}

fn lerp(a: u32, b: u32, frac: u32) -> u32 {
    (a * (255 - frac) + b * frac) / 255
}

fn node_level(node: usize, part: DrumPart, step: usize) -> u32 {
    let variation = NODE_VARIATION[node];
    let noise = hash(((node as u32) << 10) | ((part.index() as u32) << 6) | step as u32) & 0xff;
    (metric_weight(part, step) * (255 - variation) + noise * variation) / 255
}

fn metric_weight(part: DrumPart, step: usize) -> u32 {
    match part {
        DrumPart::Bd => match step {
            s if s % 16 == 0 => 255,
            s if s % 8 == 0 => 200,
            s if s % 4 == 0 => 120,
            s if s % 2 == 0 => 60,
            _ => 20,
        },
        DrumPart::Sd => match step {
            s if s % 16 == 8 => 255,
            s if s % 8 == 4 => 110,
            s if s % 2 == 0 => 50,
            _ => 30,
        },
        DrumPart::Hh => match step {
            s if s % 4 == 2 => 230,
            s if s % 2 == 0 => 150,
            _ => 90,
        },
    }
}

fn hash(value: u32) -> u32 {
    let mut h = value.wrapping_mul(0x9e37_79b9);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}
