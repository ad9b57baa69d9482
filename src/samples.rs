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

//! Sample storage and polyphonic playback.
//!
//! This module provides:
//! - Sample loading into memory (decoded, mono, at the output sample rate)
//! - Note-addressed lookup of loaded samples
//! - A fixed-size voice pool with round-robin voice stealing

mod bank;
mod error;
mod loader;
mod voice;

pub use bank::{Sample, SampleBank};
pub use error::SampleBankError;
pub use voice::{pan_gains, Voice, VoicePool, DEFAULT_POOL_CAPACITY};
