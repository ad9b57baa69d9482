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

//! The boundary to the density-map rhythm generator.

use std::fmt;

/// Number of drum parts driven by the density map.
pub const NUM_PARTS: usize = 3;

/// Default density threshold for every part (middle of the range).
pub const DEFAULT_DENSITY: u8 = 128;

/// A percussion role driven by the density map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrumPart {
    /// Bass drum.
    Bd = 0,
    /// Snare drum.
    Sd = 1,
    /// Hi-hat.
    Hh = 2,
}

impl DrumPart {
    /// All parts in trigger-bit order.
    pub const ALL: [DrumPart; NUM_PARTS] = [DrumPart::Bd, DrumPart::Sd, DrumPart::Hh];

    /// Returns the trigger-bit index of this part.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the part for a trigger-bit index.
    pub fn from_index(index: usize) -> Option<DrumPart> {
        DrumPart::ALL.get(index).copied()
    }

    /// Returns the trigger bit of this part in a state bitmask.
    pub fn mask(self) -> u8 {
        1 << self.index()
    }

    /// Returns the short display name of this part.
    pub fn name(self) -> &'static str {
        match self {
            DrumPart::Bd => "BD",
            DrumPart::Sd => "SD",
            DrumPart::Hh => "HH",
        }
    }
}

impl fmt::Display for DrumPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable settings of a density map: the map position, randomness and the
/// per-part density thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternSettings {
    pub x: u8,
    pub y: u8,
    pub randomness: u8,
    pub density: [u8; NUM_PARTS],
}

impl Default for PatternSettings {
    fn default() -> Self {
        PatternSettings {
            x: 128,
            y: 128,
            randomness: 0,
            density: [DEFAULT_DENSITY; NUM_PARTS],
        }
    }
}

/// A rhythm generator that maps a 2-D coordinate to per-step trigger intensities.
///
/// The engine advances it one pulse at a time from the audio thread, so
/// implementations must not allocate, lock or block in any of these methods.
pub trait DensityMap: Send {
    /// Resets the generator to its first step and clears its state.
    fn init(&mut self);

    /// Advances the generator by the given number of pulses.
    fn tick_clock(&mut self, pulses: u8);

    /// Returns the trigger bitmask for the current pulse, one bit per [`DrumPart`].
    fn state(&self) -> u8;

    /// Advances the counter that ends trigger pulses.
    fn increment_pulse_counter(&mut self);

    /// Returns the intensity of a step for a part at a map coordinate.
    fn drum_map_level(&self, step: usize, part: DrumPart, x: u8, y: u8) -> u8;

    /// Returns the number of steps in the generator's native pattern.
    fn num_steps(&self) -> usize;

    /// Returns the current step index.
    fn step(&self) -> usize;

    /// Moves the generator back to step zero without touching its settings.
    fn reset_step(&mut self);

    fn settings(&self) -> &PatternSettings;

    fn settings_mut(&mut self) -> &mut PatternSettings;
}

/// Returns true if a step with the given intensity fires at the given density.
#[inline]
pub fn step_fires(level: u8, density: u8) -> bool {
    level > !density
}
