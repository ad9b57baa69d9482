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

//! Timing jitter for triggers.
//!
//! Triggers are parked in a fixed table with a random delay drawn from
//! `[0, 2 * max_jitter]` frames. The pulse clock is shifted forward by
//! `max_jitter` when humanize is configured, so on average a humanized trigger
//! still lands on the grid.

use super::dispatch::TriggerSink;

/// Number of triggers that can be waiting at once.
pub const HUMANIZE_CAPACITY: usize = 64;

/// Maximum jitter as a fraction of a pulse at full humanize. Half of a three-pulse step.
const JITTER_PULSES: f64 = 1.5;

/// A trigger waiting for its delay to run out.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendingTrigger {
    pub note: u8,
    pub velocity: f32,
    pub pan: f32,
    pub delay_frames: i64,
    pub active: bool,
}

/// Numerical Recipes linear congruential generator.
///
/// Independent of every other random source so that jitter never touches a
/// library RNG on the audio thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Lcg {
        Lcg { state: seed }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state
    }

    /// Returns a value uniformly distributed in `0..=max`.
    #[inline]
    pub fn next_inclusive(&mut self, max: u32) -> u32 {
        ((self.next_u32() as u64 * (max as u64 + 1)) >> 32) as u32
    }
}

/// Fixed-capacity scheduler of jittered triggers.
#[derive(Clone, Debug)]
pub struct HumanizeScheduler {
    slots: [PendingTrigger; HUMANIZE_CAPACITY],
    amount: f32,
    max_jitter_frames: u32,
    rng: Lcg,
}

impl HumanizeScheduler {
    pub fn new(seed: u32) -> HumanizeScheduler {
        HumanizeScheduler {
            slots: [PendingTrigger::default(); HUMANIZE_CAPACITY],
            amount: 0.0,
            max_jitter_frames: 0,
            rng: Lcg::new(seed),
        }
    }

    /// Sets the humanize amount in `[0, 1]` for the given pulse length and returns
    /// how many frames the pulse clock must be shifted by to keep the jitter window
    /// centered on the grid.
    pub fn set_amount(&mut self, amount: f32, frames_per_pulse: f64) -> f64 {
        let previous = self.max_jitter_frames;
        self.amount = amount.clamp(0.0, 1.0);
        self.max_jitter_frames = jitter_frames(self.amount, frames_per_pulse);
        self.max_jitter_frames as f64 - previous as f64
    }

    /// Recomputes the jitter window for a new pulse length, keeping the amount.
    ///
    /// The clock is not shifted again: a tempo change keeps the pulse phase, and
    /// the offset applied when the amount was set stays in it.
    pub fn set_frames_per_pulse(&mut self, frames_per_pulse: f64) {
        self.max_jitter_frames = jitter_frames(self.amount, frames_per_pulse);
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn max_jitter_frames(&self) -> u32 {
        self.max_jitter_frames
    }

    /// Returns true if triggers should go through the scheduler.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.max_jitter_frames > 0
    }

    /// Returns the number of triggers waiting to fire.
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|slot| slot.active).count()
    }

    pub fn slots(&self) -> &[PendingTrigger] {
        &self.slots
    }

    /// Parks a trigger with a random delay. If every slot is taken the trigger is
    /// sent to the sink straight away rather than dropped.
    pub fn queue<S: TriggerSink + ?Sized>(
        &mut self,
        note: u8,
        velocity: f32,
        pan: f32,
        sink: &mut S,
    ) {
        let Some(slot) = self.slots.iter_mut().find(|slot| !slot.active) else {
            sink.trigger(note, velocity, pan);
            return;
        };

        let delay = self.rng.next_inclusive(self.max_jitter_frames.saturating_mul(2));
        *slot = PendingTrigger {
            note,
            velocity,
            pan,
            delay_frames: delay as i64,
            active: true,
        };
    }

    /// Advances every waiting trigger by one frame and fires the ones that are due.
    #[inline]
    pub fn tick<S: TriggerSink + ?Sized>(&mut self, sink: &mut S) {
        for slot in self.slots.iter_mut().filter(|slot| slot.active) {
            slot.delay_frames -= 1;
            if slot.delay_frames <= 0 {
                slot.active = false;
                sink.trigger(slot.note, slot.velocity, slot.pan);
            }
        }
    }

    /// Fires every waiting trigger now, regardless of its delay.
    pub fn flush<S: TriggerSink + ?Sized>(&mut self, sink: &mut S) {
        for slot in self.slots.iter_mut().filter(|slot| slot.active) {
            slot.active = false;
            sink.trigger(slot.note, slot.velocity, slot.pan);
        }
    }

    /// Drops every waiting trigger.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.active = false;
        }
    }
}

fn jitter_frames(amount: f32, frames_per_pulse: f64) -> u32 {
    (amount as f64 * JITTER_PULSES * frames_per_pulse) as u32
}

/// A [`TriggerSink`] that sends triggers through the scheduler when humanize is
/// enabled and directly to the inner sink otherwise.
pub struct Humanized<'a, S: ?Sized> {
    pub scheduler: &'a mut HumanizeScheduler,
    pub sink: &'a mut S,
}

impl<S: TriggerSink + ?Sized> TriggerSink for Humanized<'_, S> {
    #[inline]
    fn trigger(&mut self, note: u8, velocity: f32, pan: f32) {
        if self.scheduler.is_enabled() {
            self.scheduler.queue(note, velocity, pan, &mut *self.sink);
        } else {
            self.sink.trigger(note, velocity, pan);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::RecordingSink;

    #[test]
    fn test_lcg_sequence() {
        let mut lcg = Lcg::new(0);
        assert_eq!(lcg.next_u32(), 1_013_904_223);
        assert_eq!(lcg.next_u32(), 1_196_435_762);
    }

    #[test]
    fn test_lcg_inclusive_bounds() {
        let mut lcg = Lcg::new(12345);
        assert!((0..1000).all(|_| lcg.next_inclusive(0) == 0));

        let mut seen_max = false;
        let mut seen_min = false;
        for _ in 0..10_000 {
            let value = lcg.next_inclusive(3);
            assert!(value <= 3);
            seen_max |= value == 3;
            seen_min |= value == 0;
        }
        assert!(seen_max && seen_min);
    }

    #[test]
    fn test_set_amount() {
        let mut scheduler = HumanizeScheduler::new(1);
        assert!(!scheduler.is_enabled());

        assert_eq!(scheduler.set_amount(1.0, 1000.0), 1500.0);
        assert_eq!(scheduler.max_jitter_frames(), 1500);
        assert!(scheduler.is_enabled());

        // Only the difference is returned when the amount changes.
        assert_eq!(scheduler.set_amount(0.5, 1000.0), -750.0);
        assert_eq!(scheduler.max_jitter_frames(), 750);

        assert_eq!(scheduler.set_amount(2.0, 1000.0), 750.0);
        assert_eq!(scheduler.amount(), 1.0);

        scheduler.set_frames_per_pulse(500.0);
        assert_eq!(scheduler.max_jitter_frames(), 750);
        assert_eq!(scheduler.amount(), 1.0);
    }

    #[test]
    fn test_delay_bounds() {
        let mut scheduler = HumanizeScheduler::new(99);
        scheduler.set_amount(0.2, 100.0);
        let max = scheduler.max_jitter_frames() as i64;
        assert_eq!(max, 30);

        let mut sink = RecordingSink::default();
        for _ in 0..1000 {
            scheduler.queue(36, 1.0, 0.0, &mut sink);
            let slot = scheduler.slots()[0];
            assert!(slot.active);
            assert!((0..=2 * max).contains(&slot.delay_frames));
            scheduler.clear();
        }
        assert!(sink.triggers.is_empty());
    }

    #[test]
    fn test_fires_after_delay() {
        let mut scheduler = HumanizeScheduler::new(7);
        scheduler.set_amount(1.0, 10.0);
        let mut sink = RecordingSink::default();

        scheduler.queue(40, 0.1, 0.25, &mut sink);
        let delay = scheduler.slots()[0].delay_frames;
        assert!((0..=30).contains(&delay));

        // A zero delay still needs one frame to fire.
        for _ in 0..(delay.max(1) - 1) {
            scheduler.tick(&mut sink);
        }
        assert!(sink.triggers.is_empty());
        scheduler.tick(&mut sink);
        assert_eq!(sink.triggers, vec![(40, 0.1, 0.25)]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_full_table_fires_immediately() {
        let mut scheduler = HumanizeScheduler::new(3);
        scheduler.set_amount(1.0, 1000.0);
        let mut sink = RecordingSink::default();

        for i in 0..HUMANIZE_CAPACITY {
            scheduler.queue(i as u8, 1.0, 0.0, &mut sink);
        }
        assert_eq!(scheduler.pending(), HUMANIZE_CAPACITY);
        assert!(sink.triggers.is_empty());

        scheduler.queue(100, 0.1, 0.5, &mut sink);
        assert_eq!(sink.triggers, vec![(100, 0.1, 0.5)]);
        assert_eq!(scheduler.pending(), HUMANIZE_CAPACITY);
    }

    #[test]
    fn test_flush() {
        let mut scheduler = HumanizeScheduler::new(11);
        scheduler.set_amount(1.0, 1000.0);
        let mut sink = RecordingSink::default();
        scheduler.queue(36, 1.0, 0.0, &mut sink);
        scheduler.queue(38, 0.1, 0.0, &mut sink);

        scheduler.flush(&mut sink);
        assert_eq!(sink.triggers, vec![(36, 1.0, 0.0), (38, 0.1, 0.0)]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_zero_amount_bypasses_scheduler() {
        let mut scheduler = HumanizeScheduler::new(5);
        scheduler.set_amount(0.0, 1000.0);
        let mut sink = RecordingSink::default();

        let mut humanized = Humanized {
            scheduler: &mut scheduler,
            sink: &mut sink,
        };
        humanized.trigger(36, 1.0, 0.0);

        assert_eq!(sink.triggers, vec![(36, 1.0, 0.0)]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_enabled_routes_through_scheduler() {
        let mut scheduler = HumanizeScheduler::new(5);
        scheduler.set_amount(0.5, 1000.0);
        let mut sink = RecordingSink::default();

        let mut humanized = Humanized {
            scheduler: &mut scheduler,
            sink: &mut sink,
        };
        humanized.trigger(36, 1.0, 0.0);

        assert!(sink.triggers.is_empty());
        assert_eq!(scheduler.pending(), 1);
    }
}
