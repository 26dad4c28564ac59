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

//! The cycle loop driving a hardware model.
//!
//! One cycle is two evaluations. After the rising edge the driver answers
//! the model: the pending host write is advanced and the sample memory
//! serves the read port. After the falling edge the outputs are captured
//! and the end conditions are checked.

use crate::capture::Captures;
use crate::channel::{compile_channels, AudioChannel};
use crate::config::RunConfig;
use crate::dispatch::WriteQueue;
use crate::memory::SampleMemory;
use crate::model::HardwareModel;
use crate::termination::{StopReason, Termination};
use crate::vcd::PinTracer;
use crate::{Error, Time};
use log::{debug, info, trace, warn};
use std::fs::File;
use std::io::BufWriter;

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub stop: StopReason,
    /// Simulation time when the loop stopped.
    pub time: Time,
    pub frames: u64,
    /// Host writes driven onto the port.
    pub writes: usize,
}

pub struct Session<M: HardwareModel> {
    model: M,
    writes: WriteQueue,
    memory: SampleMemory,
    captures: Captures,
    termination: Termination,
    time: Time,
    tracer: Option<PinTracer<BufWriter<File>>>,
}

impl<M: HardwareModel> Session<M> {
    /// Build a session that programs `channels` and serves `payload` from
    /// sample memory.
    pub fn new(
        model: M,
        channels: &[AudioChannel],
        payload: &[u8],
        config: &RunConfig,
    ) -> Result<Self, Error> {
        let mut writes = WriteQueue::new();
        writes.extend(compile_channels(channels)?);
        let memory = SampleMemory::for_channels(channels, payload)?;
        debug!(
            "session: {} channels, {} register writes, {} memory words",
            channels.len(),
            writes.len(),
            memory.len()
        );
        Ok(Self::from_parts(
            model,
            writes,
            memory,
            Termination::from_config(config, channels.len()),
        ))
    }

    pub fn from_parts(
        model: M,
        writes: WriteQueue,
        memory: SampleMemory,
        termination: Termination,
    ) -> Self {
        Self {
            model,
            writes,
            memory,
            captures: Captures::new(),
            termination,
            time: 0,
            tracer: None,
        }
    }

    /// Dump the pins after every evaluation of the model.
    pub fn trace_to(&mut self, tracer: PinTracer<BufWriter<File>>) {
        self.tracer = Some(tracer);
    }

    /// Hold the model in reset for one clock edge.
    pub fn reset(&mut self) {
        let pins = self.model.pins_mut();
        pins.reset = true;
        pins.host_write_en = false;
        pins.host_read_en = false;
        pins.clk = false;
        self.model.eval();
        self.model.pins_mut().clk = true;
        self.model.eval();
        let pins = self.model.pins_mut();
        pins.reset = false;
        pins.clk = false;
        self.model.eval();
    }

    fn half_cycle(&mut self, clk: bool) {
        self.model.pins_mut().clk = clk;
        self.model.eval();
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.dump(self.time, self.model.pins());
        }
        self.time += 1;
    }

    /// Simulate one full clock cycle. Returns a stop reason if an end
    /// condition became true during the cycle.
    pub fn step(&mut self) -> Option<StopReason> {
        self.half_cycle(true);

        let pins = self.model.pins_mut();
        let state = self.writes.step(pins);
        let response = self.memory.respond(pins);
        trace!("t={} host: {:?} memory: {:?}", self.time, state, response);

        self.half_cycle(false);

        let audio_captured = self.captures.sample(self.model.pins(), self.time);
        self.termination.after_cycle(
            audio_captured,
            self.captures.frames(),
            self.model.pins().host_read_data,
        )
    }

    /// Reset the model and run it until an end condition or the time budget
    /// is reached.
    pub fn run(&mut self) -> RunSummary {
        self.reset();
        let stop = loop {
            if let Some(stop) = self
                .termination
                .before_cycle(self.time, self.model.finished())
            {
                break stop;
            }
            if let Some(stop) = self.step() {
                break stop;
            }
        };
        self.model.finalize();

        match stop {
            StopReason::TimedOut => warn!("Simulator timed out waiting for channel to end"),
            StopReason::ModelFinished => info!("Model finished before the channels ended"),
            StopReason::SampleCountReached => info!("Captured requested number of samples"),
            StopReason::ChannelsEnded => info!("All channels ended"),
        }
        if !self.writes.is_empty() {
            warn!("{} register writes were never accepted", self.writes.len());
        }
        let summary = RunSummary {
            stop,
            time: self.time,
            frames: self.captures.frames(),
            writes: self.writes.dispatched(),
        };
        debug!("session: {:?}", summary);
        summary
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn memory(&self) -> &SampleMemory {
        &self.memory
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    pub fn into_captures(self) -> Captures {
        self.captures
    }
}
