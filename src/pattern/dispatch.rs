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

//! Routing of pulse triggers to sample mappings.

use crate::samples::VoicePool;

use super::density::DrumPart;
use super::mapping::SampleMapping;

/// Anything that can start playback of a note.
pub trait TriggerSink {
    fn trigger(&mut self, note: u8, velocity: f32, pan: f32);
}

impl TriggerSink for VoicePool {
    #[inline]
    fn trigger(&mut self, note: u8, velocity: f32, pan: f32) {
        VoicePool::trigger(self, note, velocity, pan);
    }
}

/// Fires every mapping whose drum part is set in the trigger state.
///
/// Each firing mapping reads its velocity sequence at its own cursor and then
/// advances it, so mappings that don't fire keep their place. Returns the number
/// of triggers sent to the sink.
pub fn dispatch_triggers<S: TriggerSink + ?Sized>(
    state: u8,
    mappings: &mut [SampleMapping],
    sink: &mut S,
) -> usize {
    let mut fired = 0;
    for part in DrumPart::ALL {
        if state & part.mask() == 0 {
            continue;
        }
        for mapping in mappings.iter_mut().filter(|mapping| mapping.part == part) {
            let velocity = mapping.velocity.next_velocity();
            sink.trigger(mapping.note, velocity, mapping.pan);
            fired += 1;
        }
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::mapping::VelocitySequence;
    use crate::testutil::{mapping, RecordingSink};

    #[test]
    fn test_only_set_parts_fire() {
        let mut mappings = vec![
            mapping(36, DrumPart::Bd),
            mapping(38, DrumPart::Sd),
            mapping(42, DrumPart::Hh),
            mapping(35, DrumPart::Bd),
        ];
        let mut sink = RecordingSink::default();

        let bits = DrumPart::Bd.mask() | DrumPart::Hh.mask();
        let fired = dispatch_triggers(bits, &mut mappings, &mut sink);
        assert_eq!(fired, 3);
        let notes: Vec<u8> = sink.triggers.iter().map(|t| t.0).collect();
        assert_eq!(notes, vec![36, 35, 42]);

        assert_eq!(dispatch_triggers(0, &mut mappings, &mut sink), 0);
        assert_eq!(sink.triggers.len(), 3);
    }

    #[test]
    fn test_cursor_advances_only_when_firing() {
        let mut mappings = vec![mapping(36, DrumPart::Bd), mapping(38, DrumPart::Sd)];
        mappings[0].velocity = VelocitySequence::new(&[1, 0]).unwrap();
        mappings[1].velocity = VelocitySequence::new(&[1, 0]).unwrap();
        let mut sink = RecordingSink::default();

        let bd = DrumPart::Bd.mask();
        let sd = DrumPart::Sd.mask();
        for state in [bd, sd, bd, bd | sd, bd] {
            dispatch_triggers(state, &mut mappings, &mut sink);
        }

        let kick: Vec<f32> = sink.triggers.iter().filter(|t| t.0 == 36).map(|t| t.1).collect();
        let snare: Vec<f32> = sink.triggers.iter().filter(|t| t.0 == 38).map(|t| t.1).collect();
        assert_eq!(kick, vec![1.0, 0.1, 1.0, 0.1]);
        assert_eq!(snare, vec![1.0, 0.1]);
        assert_eq!(mappings[0].velocity.cursor(), 0);
        assert_eq!(mappings[1].velocity.cursor(), 0);
    }

    #[test]
    fn test_pan_is_forwarded() {
        let mut mappings = vec![mapping(36, DrumPart::Bd)];
        mappings[0].pan = -0.5;
        let mut sink = RecordingSink::default();
        dispatch_triggers(DrumPart::Bd.mask(), &mut mappings, &mut sink);
        assert_eq!(sink.triggers, vec![(36, 1.0, -0.5)]);
    }
}
