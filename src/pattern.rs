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

//! Pulse-driven rhythm generation.
//!
//! This module provides:
//! - A 24 PPQN pulse clock fed one audio frame at a time
//! - The boundary to density-map rhythm generators, plus a built-in procedural one
//! - Sample mappings with per-mapping velocity sequences and LFO drift
//! - Optional timing jitter through a fixed-size trigger table
//! - Lock-free publication of the current step pattern to other threads

mod clock;
mod density;
mod dispatch;
mod engine;
mod error;
mod humanize;
mod lfo;
mod mapping;
mod monitor;
mod procedural;

pub use clock::{frames_per_pulse, PatternClock, PPQN};
pub use density::{step_fires, DensityMap, DrumPart, PatternSettings, DEFAULT_DENSITY, NUM_PARTS};
pub use dispatch::{dispatch_triggers, TriggerSink};
pub use engine::{Engine, EngineOptions};
pub use error::{EngineError, MAX_BPM};
pub use humanize::{HumanizeScheduler, Humanized, Lcg, PendingTrigger, HUMANIZE_CAPACITY};
pub use lfo::{LfoModulator, LfoState};
pub use mapping::{apply_spread, SampleMapping, VelocitySequence, MAX_VELOCITY_STEPS};
pub use monitor::{
    compute_snapshot, PatternChangeMonitor, PatternSnapshot, SnapshotReader, MAX_SNAPSHOT_STEPS,
};
pub use procedural::{ProceduralMap, NUM_STEPS, PULSES_PER_STEP};
