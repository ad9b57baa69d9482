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

use super::density::DrumPart;
use super::lfo::LfoState;

/// Maximum number of steps in a velocity sequence.
pub const MAX_VELOCITY_STEPS: usize = 32;

/// Velocity of an accented (non-zero) step.
pub const ACCENT_VELOCITY: f32 = 1.0;

/// Velocity of a ghost (zero) step.
pub const GHOST_VELOCITY: f32 = 0.1;

/// A fixed-length sequence of two-level velocity steps with its own cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VelocitySequence {
    steps: [u8; MAX_VELOCITY_STEPS],
    len: usize,
    cursor: usize,
}

impl VelocitySequence {
    /// Creates a sequence from the given steps. Returns None if there are no steps
    /// or more than [`MAX_VELOCITY_STEPS`].
    pub fn new(steps: &[u8]) -> Option<VelocitySequence> {
        if steps.is_empty() || steps.len() > MAX_VELOCITY_STEPS {
            return None;
        }
        let mut sequence = VelocitySequence {
            steps: [0; MAX_VELOCITY_STEPS],
            len: steps.len(),
            cursor: 0,
        };
        sequence.steps[..steps.len()].copy_from_slice(steps);
        Some(sequence)
    }

    pub fn steps(&self) -> &[u8] {
        &self.steps[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: sequences are never empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Rewinds the cursor to the first step.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Returns the velocity at the cursor and moves the cursor to the next step.
    #[inline]
    pub fn next_velocity(&mut self) -> f32 {
        let velocity = if self.steps[self.cursor] != 0 {
            ACCENT_VELOCITY
        } else {
            GHOST_VELOCITY
        };
        self.cursor = (self.cursor + 1) % self.len;
        velocity
    }
}

/// A playable sample assigned to a drum part.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleMapping {
    pub note: u8,
    pub part: DrumPart,
    /// Coordinate the mapping was created with. Only used to seed its LFO.
    pub x: u8,
    pub y: u8,
    pub velocity: VelocitySequence,
    pub lfo: LfoState,
    pub pan: f32,
}

impl SampleMapping {
    pub fn new(note: u8, part: DrumPart, velocity: VelocitySequence) -> SampleMapping {
        SampleMapping {
            note,
            part,
            x: 128,
            y: 128,
            velocity,
            lfo: LfoState::default(),
            pan: 0.0,
        }
    }
}

/// Spreads the mappings linearly across the stereo field, from `-spread` for the
/// first mapping to `spread` for the last. A single mapping stays centered.
///
/// A negative spread mirrors the field. Pans outside `[-1, 1]` are left for the
/// voice pool to clamp.
pub fn apply_spread(mappings: &mut [SampleMapping], spread: f32) {
    let count = mappings.len();
    for (i, mapping) in mappings.iter_mut().enumerate() {
        mapping.pan = if count > 1 {
            -spread + 2.0 * spread * i as f32 / (count - 1) as f32
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::mapping;

    #[test]
    fn test_two_level_velocity() {
        let mut sequence = VelocitySequence::new(&[1, 0, 1, 0]).unwrap();
        let velocities: Vec<f32> = (0..6).map(|_| sequence.next_velocity()).collect();
        assert_eq!(velocities, vec![1.0, 0.1, 1.0, 0.1, 1.0, 0.1]);
        assert_eq!(sequence.cursor(), 2);
    }

    #[test]
    fn test_odd_length_wraps() {
        let mut sequence = VelocitySequence::new(&[0, 5, 5]).unwrap();
        assert_eq!(sequence.next_velocity(), 0.1);
        assert_eq!(sequence.next_velocity(), 1.0);
        assert_eq!(sequence.next_velocity(), 1.0);
        assert_eq!(sequence.cursor(), 0);
        assert_eq!(sequence.next_velocity(), 0.1);

        sequence.rewind();
        assert_eq!(sequence.cursor(), 0);
    }

    #[test]
    fn test_sequence_bounds() {
        assert!(VelocitySequence::new(&[]).is_none());
        assert!(VelocitySequence::new(&[1; MAX_VELOCITY_STEPS + 1]).is_none());
        let full = VelocitySequence::new(&[1; MAX_VELOCITY_STEPS]).unwrap();
        assert_eq!(full.len(), MAX_VELOCITY_STEPS);
        assert!(!full.is_empty());
        assert_eq!(full.steps(), &[1; MAX_VELOCITY_STEPS]);
    }

    #[test]
    fn test_spread_four() {
        let mut mappings: Vec<_> = (0..4).map(|i| mapping(36 + i, DrumPart::Bd)).collect();
        apply_spread(&mut mappings, 0.6);
        let pans: Vec<f32> = mappings.iter().map(|m| m.pan).collect();
        let expected = [-0.6, -0.2, 0.2, 0.6];
        for (pan, expected) in pans.iter().zip(expected) {
            assert!((pan - expected).abs() < 1e-6, "{pans:?}");
        }
    }

    #[test]
    fn test_spread_single_is_centered() {
        let mut mappings = vec![mapping(36, DrumPart::Sd)];
        apply_spread(&mut mappings, 1.0);
        assert_eq!(mappings[0].pan, 0.0);
    }

    #[test]
    fn test_spread_follows_sign() {
        let mut mappings = vec![mapping(36, DrumPart::Bd), mapping(38, DrumPart::Hh)];
        apply_spread(&mut mappings, -0.5);
        assert_eq!(mappings[0].pan, 0.5);
        assert_eq!(mappings[1].pan, -0.5);

        apply_spread(&mut mappings, 3.0);
        assert_eq!(mappings[0].pan, -3.0);
        assert_eq!(mappings[1].pan, 3.0);

        apply_spread(&mut mappings, 0.0);
        assert_eq!(mappings[0].pan, 0.0);
        assert_eq!(mappings[1].pan, 0.0);
    }
}
