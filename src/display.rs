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

//! Text rendering of patterns and mappings for the terminal. Nothing in here runs
//! on the audio thread.

use std::fmt;

use crate::pattern::{DrumPart, PatternSnapshot, SampleMapping};

/// Number of velocity steps shown per mapping.
const VELOCITY_PREVIEW_STEPS: usize = 16;

/// Renders a snapshot as one row per part that has mappings, with `x` on the
/// steps that trigger.
pub struct SnapshotView<'a>(pub &'a PatternSnapshot);

impl fmt::Display for SnapshotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.0;
        writeln!(
            f,
            "Pattern (x={}, y={}, steps={}):",
            snapshot.x, snapshot.y, snapshot.length
        )?;
        for part in DrumPart::ALL {
            if !snapshot.is_active(part) {
                continue;
            }
            write!(f, "  {:<3}", part.name())?;
            for step in 0..snapshot.length {
                f.write_str(if snapshot.fires(part, step) { "x" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Renders the sample mappings as a table.
pub struct MappingTable<'a>(pub &'a [SampleMapping]);

impl fmt::Display for MappingTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4}  {:<4} {:>3} {:>3}  {:<19} {:>5}",
            "Note", "Part", "X", "Y", "Velocity", "Pan"
        )?;
        for mapping in self.0 {
            let steps = mapping.velocity.steps();
            let mut velocity: String = steps
                .iter()
                .take(VELOCITY_PREVIEW_STEPS)
                .map(|step| if *step != 0 { '1' } else { '0' })
                .collect();
            if steps.len() > VELOCITY_PREVIEW_STEPS {
                velocity.push_str("...");
            }
            writeln!(
                f,
                "{:>4}  {:<4} {:>3} {:>3}  {:<19} {:>5.2}",
                mapping.note,
                mapping.part.name(),
                mapping.x,
                mapping.y,
                velocity,
                mapping.pan
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::VelocitySequence;

    #[test]
    fn test_snapshot_shows_active_parts_only() {
        let snapshot = PatternSnapshot {
            x: 10,
            y: 200,
            length: 8,
            masks: [0b0001_0001, 0b0100_0000, 0b1111_1111],
            active_parts: DrumPart::Bd.mask() | DrumPart::Sd.mask(),
        };
        let rendered = SnapshotView(&snapshot).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Pattern (x=10, y=200, steps=8):",
                "  BD x...x...",
                "  SD ......x.",
            ]
        );
    }

    #[test]
    fn test_snapshot_without_parts() {
        let rendered = SnapshotView(&PatternSnapshot::default()).to_string();
        assert_eq!(rendered, "Pattern (x=0, y=0, steps=0):\n");
    }

    #[test]
    fn test_mapping_table() {
        let mut long = SampleMapping::new(
            36,
            DrumPart::Bd,
            VelocitySequence::new(&[1, 0, 0, 1, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1])
                .unwrap(),
        );
        long.x = 12;
        long.y = 250;
        long.pan = -1.0;
        let mut short = SampleMapping::new(
            42,
            DrumPart::Hh,
            VelocitySequence::new(&[1, 0]).unwrap(),
        );
        short.pan = 0.5;

        let rendered = MappingTable(&[long, short]).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Note  Part"));
        assert_eq!(
            lines[1],
            "  36  BD    12 250  1001001011110000... -1.00"
        );
        assert_eq!(
            lines[2],
            "  42  HH   128 128  10                   0.50"
        );
    }
}
