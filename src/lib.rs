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

//! A real-time drum pattern engine. A density-map rhythm generator is clocked at
//! 24 PPQN from the audio callback and its triggers play samples from a
//! fixed-size voice pool.

pub mod audio;
pub mod config;
pub mod display;
pub mod pattern;
pub mod samples;
#[cfg(test)]
mod testutil;
