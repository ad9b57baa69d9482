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

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Args, Parser, Subcommand};
use gridbeat::audio;
use gridbeat::config::EngineConfig;
use gridbeat::display::{MappingTable, SnapshotView};
use gridbeat::pattern::{Engine, ProceduralMap};
use gridbeat::samples::SampleBank;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// How often the pattern display checks for changes.
const DISPLAY_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A drum pattern engine that plays samples from a rhythm map."
)]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Show debug output.
    #[arg(short, long, global = true, env = "VERBOSE")]
    verbose: bool,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays the pattern through an audio output device until interrupted.
    Play(PlayArgs),
    /// Lists the samples that would be loaded from the given directory.
    Samples {
        /// The directory to scan.
        path: PathBuf,
        /// The sample rate to load at.
        #[arg(short = 'r', long, default_value_t = 48000)]
        sample_rate: u32,
    },
    /// Lists the available audio output devices.
    Devices {},
}

/// Overrides for the configuration file. Unset flags keep the configured value.
#[derive(Args)]
struct PlayArgs {
    /// The sample directory.
    #[arg(short = 'd', long)]
    sample_directory: Option<PathBuf>,
    /// The tempo in BPM.
    #[arg(short, long)]
    bpm: Option<f32>,
    /// The output device name. Uses the default device when unset.
    #[arg(short = 'n', long)]
    device: Option<String>,
    /// The number of random samples to select.
    #[arg(short, long, env = "PARTS")]
    parts: Option<usize>,
    /// The number of velocity steps per sample.
    #[arg(short = 's', long = "steps", env = "STEPS")]
    velocity_steps: Option<usize>,
    /// Drift the map position of each sample with slow LFOs.
    #[arg(short, long, env = "LFO")]
    lfo: bool,
    /// The output gain applied after mixing.
    #[arg(short, long)]
    output_gain: Option<f32>,
    /// Timing jitter, from 0 to 1.
    #[arg(long)]
    humanize: Option<f32>,
    /// Stereo spread of the samples, from 0 to 1.
    #[arg(long)]
    spread: Option<f32>,
    /// The number of steps before the pattern restarts.
    #[arg(long)]
    pattern_length: Option<usize>,
    /// Seed for sample selection, for repeatable runs.
    #[arg(long)]
    seed: Option<u64>,
}

impl PlayArgs {
    fn apply(self, config: &mut EngineConfig) {
        if let Some(sample_directory) = self.sample_directory {
            config.sample_directory = sample_directory;
        }
        if let Some(bpm) = self.bpm {
            config.bpm = bpm;
        }
        if self.device.is_some() {
            config.device = self.device;
        }
        if let Some(parts) = self.parts {
            config.parts = parts;
        }
        if let Some(velocity_steps) = self.velocity_steps {
            config.velocity_steps = velocity_steps;
        }
        if self.lfo {
            config.lfo = true;
        }
        if let Some(output_gain) = self.output_gain {
            config.output_gain = output_gain;
        }
        if let Some(humanize) = self.humanize {
            config.humanize = humanize;
        }
        if let Some(spread) = self.spread {
            config.spread = spread;
        }
        if let Some(pattern_length) = self.pattern_length {
            config.pattern_length = pattern_length;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Sets up logging. RUST_LOG takes precedence over the verbose flag.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.verbose = true;
    }
    init_logging(config.verbose);

    match cli.command {
        Commands::Play(args) => {
            args.apply(&mut config);
            config.validate()?;
            play(config).await?;
        }
        Commands::Samples { path, sample_rate } => {
            let bank = SampleBank::load_directory(&path, sample_rate)?;

            println!("Samples (count: {}):", bank.len());
            for (note, sample) in bank.iter() {
                println!(
                    "- {:>3}: {} ({} frames)",
                    note,
                    sample.file_name(),
                    sample.len()
                );
            }
            println!(
                "Memory usage: {:.1} MiB",
                bank.memory_usage() as f64 / (1024.0 * 1024.0)
            );
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}

async fn play(config: EngineConfig) -> Result<(), Box<dyn Error>> {
    debug!(config = ?config, "Starting playback");

    let device = audio::get_device(config.device.as_deref())?;
    let sample_rate = device.sample_rate();

    let bank = Arc::new(SampleBank::load_directory(
        &config.sample_directory,
        sample_rate,
    )?);
    let notes = bank.notes();

    let map_seed = config.seed.unwrap_or_else(rand::random);
    let mut engine = Engine::new(
        ProceduralMap::new(map_seed),
        Arc::clone(&bank),
        config.engine_options(sample_rate),
    )?;
    config.apply(&mut engine)?;
    let mappings = engine.assign_samples_to_parts(&notes, config.parts, config.velocity_steps)?;
    info!(
        samples = notes.len(),
        selected = mappings.len(),
        "Assigned samples to drum parts"
    );
    print!("{}", MappingTable(mappings));

    let mut reader = engine.snapshot_reader();
    print!("{}", SnapshotView(&reader.latest()));

    let _stream = device.play(engine)?;
    println!("Playing on {} at {} BPM. Press Ctrl-C to stop.", device, config.bpm);

    let mut interval = tokio::time::interval(DISPLAY_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                audio::report_thread_priority();
                if let Some(snapshot) = reader.poll_changed() {
                    print!("{}", SnapshotView(&snapshot));
                }
            }
        }
    }

    Ok(())
}
