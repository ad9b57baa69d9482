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
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::pattern::{
    DensityMap, DrumPart, Engine, EngineError, EngineOptions, MAX_BPM, MAX_VELOCITY_STEPS,
    NUM_STEPS,
};
use crate::samples::DEFAULT_POOL_CAPACITY;

mod error;

pub use error::ConfigError;

/// Prefix of the environment variables that override file settings, e.g. `GRIDBEAT_BPM`.
pub const ENV_PREFIX: &str = "GRIDBEAT";

/// Engine and playback settings.
///
/// Every field has a default, so an empty file (or no file at all) is a valid
/// configuration.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of `<note>.*.wav` samples.
    pub sample_directory: PathBuf,
    pub bpm: f32,
    /// Output device name. Uses the host's default device when unset.
    pub device: Option<String>,
    /// Maximum number of samples assigned to drum parts.
    pub parts: usize,
    pub velocity_steps: usize,
    pub lfo: bool,
    pub output_gain: f32,
    pub humanize: f32,
    pub spread: f32,
    pub pattern_length: usize,
    pub x: u8,
    pub y: u8,
    pub randomness: u8,
    /// Density applied to every drum part.
    pub density: u8,
    pub voices: usize,
    /// Seed for sample assignment. Random when unset.
    pub seed: Option<u64>,
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_directory: PathBuf::from("data"),
            bpm: 120.0,
            device: None,
            parts: 4,
            velocity_steps: MAX_VELOCITY_STEPS,
            lfo: false,
            output_gain: 1.0,
            humanize: 0.0,
            spread: 0.0,
            pattern_length: NUM_STEPS,
            x: 128,
            y: 128,
            randomness: 0,
            density: 128,
            voices: DEFAULT_POOL_CAPACITY,
            seed: None,
            verbose: false,
        }
    }
}

impl EngineConfig {
    /// Loads the configuration from an optional YAML file, overridden by
    /// `GRIDBEAT_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`EngineConfig::load`], but reads overrides from the given map instead of
    /// the process environment when one is provided.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<EngineConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize::<EngineConfig>()?;
        Ok(config)
    }

    /// Checks every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bpm > 0.0 && self.bpm <= MAX_BPM) {
            return Err(ConfigError::invalid(
                "bpm",
                format!("{} is outside (0, {}]", self.bpm, MAX_BPM),
            ));
        }
        if self.parts == 0 {
            return Err(ConfigError::invalid("parts", "must be at least 1"));
        }
        if !(1..=MAX_VELOCITY_STEPS).contains(&self.velocity_steps) {
            return Err(ConfigError::invalid(
                "velocity_steps",
                format!("{} is outside 1..={}", self.velocity_steps, MAX_VELOCITY_STEPS),
            ));
        }
        if !(1..=NUM_STEPS).contains(&self.pattern_length) {
            return Err(ConfigError::invalid(
                "pattern_length",
                format!("{} is outside 1..={}", self.pattern_length, NUM_STEPS),
            ));
        }
        if !self.output_gain.is_finite() || self.output_gain < 0.0 {
            return Err(ConfigError::invalid(
                "output_gain",
                format!("{} must be a non-negative number", self.output_gain),
            ));
        }
        check_unit("humanize", self.humanize)?;
        check_unit("spread", self.spread)?;
        if self.voices == 0 {
            return Err(ConfigError::invalid("voices", "must be at least 1"));
        }
        Ok(())
    }

    /// Returns the engine startup options for the given output sample rate.
    pub fn engine_options(&self, sample_rate: u32) -> EngineOptions {
        EngineOptions {
            sample_rate,
            bpm: self.bpm,
            voices: self.voices,
            seed: self.seed,
        }
    }

    /// Applies the pattern and mixing settings to an engine.
    pub fn apply<M: DensityMap>(&self, engine: &mut Engine<M>) -> Result<(), EngineError> {
        engine.set_pattern_length(self.pattern_length)?;
        engine.set_pattern_x(self.x);
        engine.set_pattern_y(self.y);
        engine.set_randomness(self.randomness);
        for part in DrumPart::ALL {
            engine.set_density(part, self.density);
        }
        engine.set_lfo_enabled(self.lfo);
        engine.set_humanize(self.humanize);
        engine.set_spread(self.spread);
        engine.set_output_gain(self.output_gain);
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("{} is outside [0, 1]", value),
        ))
    }
}
