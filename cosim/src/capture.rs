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

use crate::model::Pins;
use crate::wav;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Decoder state observed on the debug port in one cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DebugRecord {
    pub predictor: i16,
    pub step_index: i8,
    /// Simulation time at which the record was captured.
    pub time: u64,
}

/// On-disk layout of a debug capture (and of a debug reference).
#[derive(Debug, Default, Deserialize, Serialize)]
struct DebugCaptureFile {
    adpcm_capture: Vec<DebugRecord>,
}

/// Output streams harvested from the model during one run.
#[derive(Clone, Debug, Default)]
pub struct Captures {
    /// Interleaved stereo samples, left first.
    pub audio: Vec<i16>,
    pub debug: Vec<DebugRecord>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample both output ports once. Call once per full cycle, after both
    /// clock phases were evaluated.
    ///
    /// Returns true if an audio frame was captured.
    pub fn sample(&mut self, pins: &Pins, time: u64) -> bool {
        self.capture_debug(pins, time);
        self.capture_audio(pins)
    }

    fn capture_audio(&mut self, pins: &Pins) -> bool {
        if !pins.output_valid {
            return false;
        }
        self.audio.push(pins.output_l);
        self.audio.push(pins.output_r);
        true
    }

    fn capture_debug(&mut self, pins: &Pins, time: u64) -> bool {
        if !pins.dbg_adpcm_valid {
            return false;
        }
        self.debug.push(DebugRecord {
            predictor: pins.dbg_adpcm_predictor,
            step_index: pins.dbg_adpcm_step_index,
            time,
        });
        true
    }

    /// Number of complete stereo frames captured.
    pub fn frames(&self) -> u64 {
        (self.audio.len() / 2) as u64
    }

    /// Write the captured audio as a stereo WAV file. Nothing is written when
    /// no complete frame was captured.
    pub fn save_audio(&self, path: &Path) -> anyhow::Result<bool> {
        if self.frames() == 0 {
            log::error!("Cannot write WAV output as there isn't any");
            return Ok(false);
        }
        wav::write_stereo(path, &self.audio)?;
        log::info!("Wrote {} frames to {}", self.frames(), path.display());
        Ok(true)
    }

    /// Write the captured debug records; an empty capture still produces a
    /// file.
    pub fn save_debug(&self, path: &Path) -> anyhow::Result<()> {
        save_debug_capture(path, &self.debug)?;
        log::info!(
            "Wrote {} debug records to {}",
            self.debug.len(),
            path.display()
        );
        Ok(())
    }
}

pub fn save_debug_capture(path: &Path, records: &[DebugRecord]) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to open debug capture file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    DebugCaptureFile {
        adpcm_capture: records.to_vec(),
    }
    .serialize(&mut serializer)
    .with_context(|| format!("Failed to write debug capture: {}", path.display()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn load_debug_capture(path: &Path) -> anyhow::Result<Vec<DebugRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open debug capture file: {}", path.display()))?;
    let capture: DebugCaptureFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse debug capture: {}", path.display()))?;
    Ok(capture.adpcm_capture)
}
