// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use env_logger::Target;
use log::{error, info};
use std::path::PathBuf;
use structopt::StructOpt;

use cosim::{PinTracer, PlaybackModel, PlaybackOptions, RunConfig, Session};

#[derive(StructOpt)]
#[structopt(
    name = "adpcm-sim",
    about = "Drive the audio playback peripheral and check its output against golden references"
)]
struct Arguments {
    /// channel configuration (JSON, or YAML with a .yaml/.yml extension)
    #[structopt(short = "c", long, parse(from_os_str))]
    ch_config: PathBuf,
    /// test configuration: sample file, time budget, sample count
    #[structopt(short = "t", long, parse(from_os_str))]
    test_config: PathBuf,
    /// golden ADPCM debug capture
    #[structopt(short = "a", long, parse(from_os_str))]
    adpcm_capture_reference: PathBuf,
    /// golden WAV output
    #[structopt(short = "r", long, parse(from_os_str))]
    wav_reference: PathBuf,
    #[structopt(short = "w", long, default_value = "reference.wav", parse(from_os_str))]
    wav_output: PathBuf,
    #[structopt(long, default_value = "adpcm_reference.json", parse(from_os_str))]
    adpcm_capture: PathBuf,
    /// dump every pin to a VCD file
    #[structopt(long, parse(from_os_str))]
    vcd: Option<PathBuf>,
    /// cycles the model stalls every host write
    #[structopt(long, default_value = "0")]
    write_stall_cycles: usize,
    /// supported levels: Off, Error, Warn, Info, Debug, Trace
    #[structopt(short, long, default_value = "Info")]
    log_level: log::LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::from_args();

    let _logger = env_logger::builder()
        .filter(Some("cosim"), args.log_level)
        .filter(Some("adpcm_sim"), args.log_level)
        .target(Target::Stderr)
        .init();

    let channels = cosim::load_channels(&args.ch_config)?;
    let config = RunConfig::from_file(&args.test_config)?;
    let payload = config.load_samples()?;
    info!(
        "{} channels, {} sample bytes from {}",
        channels.len(),
        payload.len(),
        config.sample_path.display()
    );

    let model = PlaybackModel::new(PlaybackOptions {
        write_stall_cycles: args.write_stall_cycles,
        ..Default::default()
    });
    let mut session = Session::new(model, &channels, &payload, &config)?;
    if let Some(path) = &args.vcd {
        let tracer = PinTracer::create(path)
            .with_context(|| format!("Failed to create VCD file: {}", path.display()))?;
        session.trace_to(tracer);
    }

    let summary = session.run();
    info!(
        "Stopped at time {} ({:?}), {} frames captured",
        summary.time, summary.stop, summary.frames
    );

    // Both references are read before the outputs are written; the default
    // output names may point at the references themselves.
    let captures = session.into_captures();
    let verdict = cosim::verify(
        &captures,
        &args.adpcm_capture_reference,
        &args.wav_reference,
    );
    captures.save_audio(&args.wav_output)?;
    captures.save_debug(&args.adpcm_capture)?;

    if !verdict.passed() {
        error!("Simulation failed");
        std::process::exit(1);
    }
    info!("Simulation passed");
    Ok(())
}
