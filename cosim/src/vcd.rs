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
use std::fs;
use std::io;
use std::io::BufWriter;
use std::path::Path;

pub const DEFAULT_TOP_MODULE: &str = "tb";
const DEFAULT_VCD_HEADER: &str = "adpcm cosim VCD";

const SIGNAL_COUNT: usize = 19;

/// Traced pins and their widths, in the order of `signal_values`.
const SIGNALS: [(&str, u32); SIGNAL_COUNT] = [
    ("clk", 1),
    ("reset", 1),
    ("host_address", 16),
    ("host_write_data", 16),
    ("host_write_en", 1),
    ("host_write_byte_mask", 2),
    ("host_ready", 1),
    ("host_read_data", 16),
    ("pcm_read_address", 32),
    ("pcm_address_valid", 1),
    ("pcm_read_data", 16),
    ("pcm_data_ready", 1),
    ("output_valid", 1),
    ("output_l", 16),
    ("output_r", 16),
    ("dbg_adpcm_valid", 1),
    ("dbg_adpcm_predictor", 16),
    ("dbg_adpcm_step_index", 8),
    ("host_read_en", 1),
];

fn signal_values(pins: &Pins) -> [u64; SIGNAL_COUNT] {
    [
        pins.clk as u64,
        pins.reset as u64,
        pins.host_address as u64,
        pins.host_write_data as u64,
        pins.host_write_en as u64,
        (pins.host_write_byte_mask & 0x03) as u64,
        pins.host_ready as u64,
        pins.host_read_data as u64,
        pins.pcm_read_address as u64,
        pins.pcm_address_valid as u64,
        pins.pcm_read_data as u64,
        pins.pcm_data_ready as u64,
        pins.output_valid as u64,
        pins.output_l as u16 as u64,
        pins.output_r as u16 as u64,
        pins.dbg_adpcm_valid as u64,
        pins.dbg_adpcm_predictor as u16 as u64,
        pins.dbg_adpcm_step_index as u8 as u64,
        pins.host_read_en as u64,
    ]
}

/// Dumps the model's pins to a VCD file after every evaluation.
///
/// I/O failures are logged once; after that the tracer goes quiet and the
/// simulation carries on untraced.
pub struct PinTracer<W: io::Write> {
    writer: vcd::Writer<W>,
    is_error_state: bool,
    ids: Vec<vcd::IdCode>,
    last_values: [Option<u64>; SIGNAL_COUNT],
}

impl PinTracer<BufWriter<fs::File>> {
    pub fn create(dst: &Path) -> io::Result<Self> {
        let file = fs::File::create(dst)?;
        log::debug!("VCD file: {}", dst.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: io::Write> PinTracer<W> {
    pub fn new(dst: W) -> Self {
        let mut tracer = Self {
            writer: vcd::Writer::new(dst),
            is_error_state: false,
            ids: Vec::with_capacity(SIGNAL_COUNT),
            last_values: [None; SIGNAL_COUNT],
        };
        tracer
            .write_header()
            .unwrap_or_else(|err| tracer.vcd_error_handler(err));
        tracer
    }

    fn vcd_error_handler(&mut self, err: io::Error) {
        if !self.is_error_state {
            self.is_error_state = true;
            log::error!("VCD writing failed with error {:?}", err)
        }
    }

    fn write_header(&mut self) -> io::Result<()> {
        self.writer.comment(DEFAULT_VCD_HEADER)?;
        self.writer.date(chrono::Utc::now().to_string().as_str())?;
        self.writer.timescale(1, vcd::TimescaleUnit::NS)?;
        self.writer.add_module(DEFAULT_TOP_MODULE)?;
        for (name, width) in SIGNALS.iter() {
            let id = self.writer.add_wire(*width, name)?;
            self.ids.push(id);
        }
        self.writer.upscope()?;
        self.writer.enddefinitions()
    }

    /// Record the pin state at `time`. Only changed pins are written.
    pub fn dump(&mut self, time: u64, pins: &Pins) {
        if self.is_error_state {
            return;
        }
        self._dump(time, pins)
            .unwrap_or_else(|err| self.vcd_error_handler(err));
    }

    fn _dump(&mut self, time: u64, pins: &Pins) -> io::Result<()> {
        self.writer.timestamp(time)?;
        for (index, value) in signal_values(pins).iter().enumerate() {
            if self.last_values[index] == Some(*value) {
                continue;
            }
            let (name, width) = SIGNALS[index];
            if cfg!(feature = "trace-echo-vcd-signal-changes") {
                log::trace!("VCD changing {}.{} = {:#x}", DEFAULT_TOP_MODULE, name, value);
            }
            let id = self.ids[index];
            if width == 1 {
                self.writer.change_scalar(id, *value != 0)?;
            } else {
                let bits = (0..width)
                    .rev()
                    .map(|bit| ((value >> bit) & 1 == 1).into())
                    .collect::<Vec<vcd::Value>>();
                self.writer.change_vector(id, bits.as_slice())?;
            }
            self.last_values[index] = Some(*value);
        }
        Ok(())
    }

    pub fn is_error_state(&self) -> bool {
        self.is_error_state
    }
}
