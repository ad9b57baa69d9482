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

//! Detection and publication of pattern changes.
//!
//! The audio thread is the only writer. It fills the idle slot of a double buffer
//! and then publishes it by bumping a version counter with release ordering.
//! Readers load the version with acquire ordering and read the slot it points
//! at. A reader only has to retry if the writer came back around to the slot it
//! was reading, which takes two publications in a row.

use std::sync::atomic::{fence, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use super::density::{step_fires, DensityMap, DrumPart, NUM_PARTS};

/// Maximum number of steps a snapshot can describe.
pub const MAX_SNAPSHOT_STEPS: usize = 32;

/// The step pattern of every part at one map position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternSnapshot {
    pub x: u8,
    pub y: u8,
    /// Number of valid steps in each mask.
    pub length: usize,
    /// One bit per step, step zero in the lowest bit.
    pub masks: [u32; NUM_PARTS],
    /// Parts that had at least one mapping when the snapshot was taken.
    pub active_parts: u8,
}

impl PatternSnapshot {
    /// Returns true if the part fires on the given step.
    pub fn fires(&self, part: DrumPart, step: usize) -> bool {
        step < self.length && self.masks[part.index()] & (1 << step) != 0
    }

    pub fn is_active(&self, part: DrumPart) -> bool {
        self.active_parts & part.mask() != 0
    }
}

#[derive(Default)]
struct SnapshotSlot {
    x: AtomicU8,
    y: AtomicU8,
    length: AtomicU8,
    active_parts: AtomicU8,
    masks: [AtomicU32; NUM_PARTS],
}

impl SnapshotSlot {
    fn store(&self, snapshot: &PatternSnapshot) {
        self.x.store(snapshot.x, Ordering::Relaxed);
        self.y.store(snapshot.y, Ordering::Relaxed);
        self.length.store(snapshot.length as u8, Ordering::Relaxed);
        self.active_parts
            .store(snapshot.active_parts, Ordering::Relaxed);
        for (slot, mask) in self.masks.iter().zip(snapshot.masks) {
            slot.store(mask, Ordering::Relaxed);
        }
    }

    fn load(&self) -> PatternSnapshot {
        let mut masks = [0; NUM_PARTS];
        for (mask, slot) in masks.iter_mut().zip(&self.masks) {
            *mask = slot.load(Ordering::Relaxed);
        }
        PatternSnapshot {
            x: self.x.load(Ordering::Relaxed),
            y: self.y.load(Ordering::Relaxed),
            length: self.length.load(Ordering::Relaxed) as usize,
            masks,
            active_parts: self.active_parts.load(Ordering::Relaxed),
        }
    }
}

/// The double-buffered snapshot shared between the audio thread and readers.
#[derive(Default)]
pub struct SharedSnapshot {
    /// Number of the last complete publication. Its slot is `version % 2`.
    version: AtomicU64,
    /// Number of the publication being written, stored before its slot is touched.
    writing: AtomicU64,
    slots: [SnapshotSlot; 2],
}

impl SharedSnapshot {
    fn publish(&self, snapshot: &PatternSnapshot) {
        let next = self.version.load(Ordering::Relaxed) + 1;
        self.writing.store(next, Ordering::Relaxed);
        fence(Ordering::Release);
        self.slots[(next % 2) as usize].store(snapshot);
        self.version.store(next, Ordering::Release);
    }

    fn read(&self) -> (u64, PatternSnapshot) {
        loop {
            let version = self.version.load(Ordering::Acquire);
            let snapshot = self.slots[(version % 2) as usize].load();
            fence(Ordering::Acquire);
            let writing = self.writing.load(Ordering::Relaxed);
            if writing.wrapping_sub(version) < 2 {
                return (version, snapshot);
            }
            std::hint::spin_loop();
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

/// Reads pattern snapshots from a non-real-time thread.
#[derive(Clone)]
pub struct SnapshotReader {
    shared: Arc<SharedSnapshot>,
    last_seen: u64,
}

impl SnapshotReader {
    /// Returns the latest snapshot if it was published since the last call.
    pub fn poll_changed(&mut self) -> Option<PatternSnapshot> {
        let (version, snapshot) = self.shared.read();
        if version == self.last_seen {
            return None;
        }
        self.last_seen = version;
        Some(snapshot)
    }

    /// Returns the latest snapshot without marking it as seen.
    pub fn latest(&self) -> PatternSnapshot {
        self.shared.read().1
    }
}

/// Recomputes the step pattern on every pulse and publishes it when it changes.
pub struct PatternChangeMonitor {
    shared: Arc<SharedSnapshot>,
    current: PatternSnapshot,
}

impl Default for PatternChangeMonitor {
    fn default() -> Self {
        PatternChangeMonitor::new()
    }
}

impl PatternChangeMonitor {
    pub fn new() -> PatternChangeMonitor {
        PatternChangeMonitor {
            shared: Arc::new(SharedSnapshot::default()),
            current: PatternSnapshot::default(),
        }
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: self.shared.clone(),
            last_seen: 0,
        }
    }

    /// The last published snapshot.
    pub fn current(&self) -> &PatternSnapshot {
        &self.current
    }

    /// Recomputes the pattern at the map's current position and publishes it if any
    /// part in `active_parts` changed. Returns true if a snapshot was published.
    pub fn update<M: DensityMap + ?Sized>(
        &mut self,
        map: &M,
        pattern_length: usize,
        active_parts: u8,
    ) -> bool {
        let snapshot = compute_snapshot(map, pattern_length, active_parts);
        let changed = DrumPart::ALL
            .iter()
            .filter(|part| active_parts & part.mask() != 0)
            .any(|part| snapshot.masks[part.index()] != self.current.masks[part.index()]);
        if changed {
            self.publish(snapshot);
        }
        changed
    }

    /// Recomputes and publishes the pattern unconditionally.
    pub fn force_update<M: DensityMap + ?Sized>(
        &mut self,
        map: &M,
        pattern_length: usize,
        active_parts: u8,
    ) {
        let snapshot = compute_snapshot(map, pattern_length, active_parts);
        self.publish(snapshot);
    }

    fn publish(&mut self, snapshot: PatternSnapshot) {
        self.current = snapshot;
        self.shared.publish(&snapshot);
    }
}

/// Computes the trigger mask of every part at the map's current position.
pub fn compute_snapshot<M: DensityMap + ?Sized>(
    map: &M,
    pattern_length: usize,
    active_parts: u8,
) -> PatternSnapshot {
    let settings = map.settings();
    let length = pattern_length.min(MAX_SNAPSHOT_STEPS);
    let mut masks = [0u32; NUM_PARTS];
    for part in DrumPart::ALL {
        let density = settings.density[part.index()];
        for step in 0..length {
            let level = map.drum_map_level(step, part, settings.x, settings.y);
            if step_fires(level, density) {
                masks[part.index()] |= 1 << step;
            }
        }
    }
    PatternSnapshot {
        x: settings.x,
        y: settings.y,
        length,
        masks,
        active_parts,
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::testutil::ScriptedMap;

    fn levels_map() -> ScriptedMap {
        let mut map = ScriptedMap::new(8);
        // Kick on even steps, snare on step 4, hats everywhere.
        map.levels = Box::new(|step, part, _, _| match part {
            DrumPart::Bd if step % 2 == 0 => 200,
            DrumPart::Sd if step == 4 => 200,
            DrumPart::Hh => 200,
            _ => 0,
        });
        map
    }

    #[test]
    fn test_compute_snapshot() {
        let map = levels_map();
        let snapshot = compute_snapshot(&map, 8, 0b111);
        assert_eq!(snapshot.masks, [0b0101_0101, 0b0001_0000, 0b1111_1111]);
        assert_eq!(snapshot.length, 8);
        assert!(snapshot.fires(DrumPart::Sd, 4));
        assert!(!snapshot.fires(DrumPart::Sd, 3));
        assert!(!snapshot.fires(DrumPart::Hh, 8));
    }

    #[test]
    fn test_density_threshold() {
        let mut map = levels_map();
        // 200 > !density only while density > 55.
        map.settings_mut().density = [55, 56, 0];
        let snapshot = compute_snapshot(&map, 8, 0b111);
        assert_eq!(snapshot.masks, [0, 0b0001_0000, 0]);
    }

    #[test]
    fn test_length_limits_mask() {
        let map = levels_map();
        let snapshot = compute_snapshot(&map, 3, 0b111);
        assert_eq!(snapshot.masks[DrumPart::Hh.index()], 0b111);
    }

    #[test]
    fn test_publishes_on_change() {
        let mut map = levels_map();
        let mut monitor = PatternChangeMonitor::new();
        let mut reader = monitor.reader();
        assert_eq!(reader.poll_changed(), None);

        assert!(monitor.update(&map, 8, 0b111));
        let snapshot = reader.poll_changed().unwrap();
        assert_eq!(snapshot.masks[0], 0b0101_0101);
        // The change is reported once.
        assert_eq!(reader.poll_changed(), None);

        assert!(!monitor.update(&map, 8, 0b111));
        assert_eq!(reader.poll_changed(), None);

        map.settings_mut().density[DrumPart::Sd.index()] = 0;
        assert!(monitor.update(&map, 8, 0b111));
        assert_eq!(reader.poll_changed().unwrap().masks[1], 0);
        assert_eq!(reader.latest().masks[1], 0);
    }

    #[test]
    fn test_ignores_parts_without_mappings() {
        let mut map = levels_map();
        let mut monitor = PatternChangeMonitor::new();
        let mut reader = monitor.reader();
        monitor.force_update(&map, 8, DrumPart::Bd.mask());
        assert!(reader.poll_changed().is_some());

        map.settings_mut().density[DrumPart::Hh.index()] = 0;
        assert!(!monitor.update(&map, 8, DrumPart::Bd.mask()));
        assert_eq!(reader.poll_changed(), None);

        map.settings_mut().density[DrumPart::Bd.index()] = 0;
        assert!(monitor.update(&map, 8, DrumPart::Bd.mask()));
        let snapshot = reader.poll_changed().unwrap();
        assert!(snapshot.is_active(DrumPart::Bd));
        assert!(!snapshot.is_active(DrumPart::Hh));
    }

    #[test]
    fn test_concurrent_reads_are_consistent() {
        let mut monitor = PatternChangeMonitor::new();
        let reader = monitor.reader();

        // Every published snapshot has all three masks equal, so a torn read would
        // show up as a mismatch.
        let handle = thread::spawn(move || {
            for _ in 0..100_000 {
                let snapshot = reader.latest();
                assert_eq!(snapshot.masks[0], snapshot.masks[1]);
                assert_eq!(snapshot.masks[1], snapshot.masks[2]);
                assert_eq!(snapshot.x, snapshot.y);
            }
        });

        for i in 0..100_000u32 {
            monitor.publish(PatternSnapshot {
                x: i as u8,
                y: i as u8,
                length: 32,
                masks: [i; NUM_PARTS],
                active_parts: 0b111,
            });
        }
        handle.join().unwrap();
    }
}
