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
use std::path::PathBuf;

/// Errors that can occur while building a sample bank.
#[derive(Debug, thiserror::Error)]
pub enum SampleBankError {
    #[error("unable to read sample directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("{path} has {channels} channels, only mono and stereo are supported")]
    UnsupportedChannels { path: PathBuf, channels: u16 },

    #[error("{path} uses an unsupported {bits}-bit integer format")]
    UnsupportedBitDepth { path: PathBuf, bits: u16 },

    #[error("target sample rate must be greater than zero")]
    InvalidSampleRate,

    #[error("no samples could be loaded from {0}")]
    NoSamples(PathBuf),
}
