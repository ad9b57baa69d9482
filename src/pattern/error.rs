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

use thiserror::Error;

/// Highest accepted tempo.
pub const MAX_BPM: f32 = 300.0;

/// Misconfiguration caught before the engine is allowed to run.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,

    #[error("tempo {0} BPM is outside (0, 300]")]
    InvalidTempo(f32),

    #[error("pattern length {length} is outside 1..={max}")]
    InvalidPatternLength { length: usize, max: usize },

    #[error("velocity sequence length {0} is outside 1..=32")]
    InvalidVelocitySteps(usize),

    #[error("at least one part is required")]
    NoParts,

    #[error("the voice pool needs at least one voice")]
    NoVoices,
}

/// Checks that a tempo is usable.
pub fn validate_tempo(bpm: f32) -> Result<(), EngineError> {
    if bpm > 0.0 && bpm <= MAX_BPM {
        Ok(())
    } else {
        Err(EngineError::InvalidTempo(bpm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tempo() {
        assert!(validate_tempo(120.0).is_ok());
        assert!(validate_tempo(300.0).is_ok());
        assert!(validate_tempo(0.1).is_ok());
        assert_eq!(validate_tempo(0.0), Err(EngineError::InvalidTempo(0.0)));
        assert_eq!(validate_tempo(-5.0), Err(EngineError::InvalidTempo(-5.0)));
        assert_eq!(validate_tempo(300.5), Err(EngineError::InvalidTempo(300.5)));
        assert!(validate_tempo(f32::NAN).is_err());
    }
}
