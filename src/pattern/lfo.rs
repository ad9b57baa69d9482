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

//! Slow sinusoidal drift of the density-map coordinate.

use std::f64::consts::TAU;

use super::density::PatternSettings;
use super::mapping::SampleMapping;

/// Center of the coordinate range. A sine of amplitude `COORD_CENTER` around it
/// spans exactly 0..=255.
const COORD_CENTER: f64 = 127.5;

/// Shortest and longest LFO periods handed out during assignment, in seconds.
pub const MIN_PERIOD_SECS: f64 = 16.0;
pub const MAX_PERIOD_SECS: f64 = 64.0;

/// Phase and frequency of the two-axis oscillator of a single mapping.
/// Frequencies are in radians per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LfoState {
    pub phase_x: f64,
    pub phase_y: f64,
    pub freq_x: f64,
    pub freq_y: f64,
}

impl LfoState {
    /// Creates an oscillator whose starting output equals the given coordinate.
    pub fn seeded(x: u8, y: u8, freq_x: f64, freq_y: f64) -> LfoState {
        LfoState {
            phase_x: phase_for_coordinate(x),
            phase_y: phase_for_coordinate(y),
            freq_x,
            freq_y,
        }
    }

    /// Advances both phases by the given number of frames.
    #[inline]
    pub fn advance(&mut self, frames: f64) {
        self.phase_x = (self.phase_x + self.freq_x * frames).rem_euclid(TAU);
        self.phase_y = (self.phase_y + self.freq_y * frames).rem_euclid(TAU);
    }

    /// Returns the current coordinate pair, each in `[0, 255]`.
    #[inline]
    pub fn coordinates(&self) -> (f64, f64) {
        (
            coordinate_for_phase(self.phase_x),
            coordinate_for_phase(self.phase_y),
        )
    }
}

/// Returns the frequency in radians per frame of an oscillator with the given period.
pub fn frequency_for_period(period_secs: f64, sample_rate: u32) -> f64 {
    TAU / (period_secs * sample_rate as f64)
}

/// Returns a phase in `[0, 2π)` whose sine maps back onto the given coordinate.
pub fn phase_for_coordinate(coord: u8) -> f64 {
    let normalized = ((coord as f64 - COORD_CENTER) / COORD_CENTER).clamp(-1.0, 1.0);
    normalized.asin().rem_euclid(TAU)
}

#[inline]
pub fn coordinate_for_phase(phase: f64) -> f64 {
    COORD_CENTER + COORD_CENTER * phase.sin()
}

/// Drives the shared density-map position from the per-mapping oscillators.
#[derive(Clone, Copy, Debug, Default)]
pub struct LfoModulator {
    enabled: bool,
}

impl LfoModulator {
    pub fn new(enabled: bool) -> LfoModulator {
        LfoModulator { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Advances every mapping's oscillator by one pulse and writes the average of
    /// their outputs into the map position. Returns the new position, or None if
    /// the modulator is disabled or there are no mappings.
    pub fn update(
        &self,
        mappings: &mut [SampleMapping],
        frames_per_pulse: f64,
        settings: &mut PatternSettings,
    ) -> Option<(u8, u8)> {
        if !self.enabled || mappings.is_empty() {
            return None;
        }

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for mapping in mappings.iter_mut() {
            mapping.lfo.advance(frames_per_pulse);
            let (x, y) = mapping.lfo.coordinates();
            sum_x += x;
            sum_y += y;
        }

        let count = mappings.len() as f64;
        let x = to_coordinate(sum_x / count);
        let y = to_coordinate(sum_y / count);
        settings.x = x;
        settings.y = y;
        Some((x, y))
    }
}

fn to_coordinate(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
