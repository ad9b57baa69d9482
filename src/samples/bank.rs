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

//! Note-addressed storage for decoded samples.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::SampleBankError;
use super::loader;

/// A decoded mono sample held in memory.
/// The frames are stored in an Arc so voices can share them without copying.
#[derive(Clone, Debug)]
pub struct Sample {
    data: Arc<[f32]>,
    file_name: String,
}

impl Sample {
    /// Creates a sample from decoded mono frames.
    pub fn new(data: Vec<f32>, file_name: impl Into<String>) -> Sample {
        Sample {
            data: data.into(),
            file_name: file_name.into(),
        }
    }

    /// Returns the shared frame data.
    pub fn data(&self) -> &Arc<[f32]> {
        &self.data
    }

    /// Returns the sample length in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample has no frames.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the name of the file the sample was loaded from.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// All samples available for playback, keyed by MIDI note.
/// Read-only once built.
#[derive(Default, Debug)]
pub struct SampleBank {
    samples: BTreeMap<u8, Sample>,
}

impl SampleBank {
    /// Creates a bank from already decoded samples.
    pub fn from_samples(samples: impl IntoIterator<Item = (u8, Sample)>) -> SampleBank {
        SampleBank {
            samples: samples.into_iter().collect(),
        }
    }

    /// Loads every `<note>.*.wav` file in the given directory.
    ///
    /// Files whose names don't start with a MIDI note, or that fail to decode, are
    /// skipped with a warning. Loading fails only if nothing could be loaded.
    pub fn load_directory(
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<SampleBank, SampleBankError> {
        if target_sample_rate == 0 {
            return Err(SampleBankError::InvalidSampleRate);
        }

        info!(path = ?path, target_sample_rate, "Loading samples");

        let entries = fs::read_dir(path).map_err(|source| SampleBankError::Directory {
            path: path.to_path_buf(),
            source,
        })?;

        // Sort so that duplicate notes resolve the same way on every run.
        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut samples = BTreeMap::new();
        let mut failed = 0;
        for file in files {
            let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.starts_with('.') || !has_wav_extension(name) {
                continue;
            }

            let Some(note) = parse_midi_note(name) else {
                warn!(file = name, "Could not parse MIDI note from file name");
                failed += 1;
                continue;
            };

            let data = match loader::load_wav(&file, target_sample_rate) {
                Ok(data) => data,
                Err(e) => {
                    warn!(file = name, error = %e, "Failed to load sample");
                    failed += 1;
                    continue;
                }
            };

            if samples.contains_key(&note) {
                warn!(note, file = name, "MIDI note already loaded, replacing");
            }
            samples.insert(note, Sample::new(data, name));
        }

        info!(loaded = samples.len(), failed, "Sample loading complete");

        if samples.is_empty() {
            return Err(SampleBankError::NoSamples(path.to_path_buf()));
        }

        Ok(SampleBank { samples })
    }

    /// Gets the sample for a MIDI note.
    pub fn get(&self, note: u8) -> Option<&Sample> {
        self.samples.get(&note)
    }

    /// Returns all loaded MIDI notes in ascending order.
    pub fn notes(&self) -> Vec<u8> {
        self.samples.keys().copied().collect()
    }

    /// Iterates over notes and samples in ascending note order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Sample)> {
        self.samples.iter().map(|(note, sample)| (*note, sample))
    }

    /// Returns the number of loaded samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the bank has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the total memory used by sample data in bytes.
    pub fn memory_usage(&self) -> usize {
        self.samples
            .values()
            .map(|s| s.len() * std::mem::size_of::<f32>())
            .sum()
    }
}

fn has_wav_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// Parses the MIDI note from the first dot-separated field of a file name,
/// e.g. `60.1.1.1.0.wav` -> 60.
fn parse_midi_note(file_name: &str) -> Option<u8> {
    let (field, _) = file_name.split_once('.')?;
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse::<u8>().ok().filter(|note| *note <= 127)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_wav;

    #[test]
    fn test_parse_midi_note() {
        assert_eq!(parse_midi_note("60.1.1.1.0.wav"), Some(60));
        assert_eq!(parse_midi_note("0.wav"), Some(0));
        assert_eq!(parse_midi_note("127.wav"), Some(127));
        assert_eq!(parse_midi_note("128.wav"), None);
        assert_eq!(parse_midi_note("-1.wav"), None);
        assert_eq!(parse_midi_note("kick.wav"), None);
        assert_eq!(parse_midi_note(".wav"), None);
        assert_eq!(parse_midi_note("60"), None);
    }

    #[test]
    fn test_wav_extension() {
        assert!(has_wav_extension("60.wav"));
        assert!(has_wav_extension("60.WAV"));
        assert!(!has_wav_extension("60.flac"));
        assert!(!has_wav_extension("wav"));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path().join("36.1.wav"), vec![vec![0.5f32; 100]], 48000).unwrap();
        write_wav(dir.path().join("38.wav"), vec![vec![0.25f32; 50]], 24000).unwrap();
        write_wav(dir.path().join("kick.wav"), vec![vec![0.1f32; 10]], 48000).unwrap();
        fs::write(dir.path().join("notes.txt"), "not audio").unwrap();

        let bank = SampleBank::load_directory(dir.path(), 48000).unwrap();
        assert_eq!(bank.notes(), vec![36, 38]);
        assert_eq!(bank.get(36).unwrap().len(), 100);
        // 24kHz -> 48kHz doubles the length.
        assert_eq!(bank.get(38).unwrap().len(), 100);
        assert_eq!(bank.get(38).unwrap().file_name(), "38.wav");
        assert!(bank.get(127).is_none());
        assert_eq!(bank.memory_usage(), 200 * std::mem::size_of::<f32>());
    }

    #[test]
    fn test_duplicate_note_replaces() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path().join("40.a.wav"), vec![vec![0.5f32; 10]], 48000).unwrap();
        write_wav(dir.path().join("40.b.wav"), vec![vec![0.5f32; 20]], 48000).unwrap();

        let bank = SampleBank::load_directory(dir.path(), 48000).unwrap();
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get(40).unwrap().file_name(), "40.b.wav");
    }

    #[test]
    fn test_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SampleBank::load_directory(dir.path(), 48000);
        assert!(matches!(result, Err(SampleBankError::NoSamples(_))));
    }

    #[test]
    fn test_missing_directory_fails() {
        let result = SampleBank::load_directory(Path::new("/nonexistent/samples"), 48000);
        assert!(matches!(result, Err(SampleBankError::Directory { .. })));
    }
}
