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

//! Cycle-level co-simulation driver for an audio sample playback peripheral.
//!
//! The driver programs the peripheral's channels over its host port, serves
//! its sample memory port, captures its audio and debug outputs and compares
//! them against golden references.

mod capture;
mod channel;
mod compare;
mod config;
mod dispatch;
mod error;
mod memory;
pub mod model;
mod session;
mod termination;
pub mod vcd;
pub mod wav;

// Simulation time, counted in half clock cycles.
pub type Time = u64;

pub use crate::capture::{load_debug_capture, save_debug_capture, Captures, DebugRecord};
pub use crate::channel::{
    channel_mask, compile_channels, AudioChannel, AudioFlags, Volumes, CHANNEL_ENABLE_REGISTER,
    MAX_CHANNELS,
};
pub use crate::compare::{
    check_audio_reference, check_debug_reference, compare_audio, compare_debug, verify,
    Comparison, Mismatch, Verdict,
};
pub use crate::config::{load_channels, read_config, RunConfig};
pub use crate::dispatch::{DispatchState, PendingWrite, WriteQueue, BYTE_MASK_WORD};
pub use crate::error::Error;
pub use crate::memory::{ReadResponse, SampleMemory, MEMORY_CAPACITY_WORDS};
pub use crate::model::{HardwareModel, Pins, PlaybackModel, PlaybackOptions};
pub use crate::session::{RunSummary, Session};
pub use crate::termination::{StopReason, Termination};
pub use crate::vcd::PinTracer;
