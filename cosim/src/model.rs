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

//! The boundary between the driver and the peripheral model.
//!
//! A model is an opaque, externally evaluated entity: the driver only sees its
//! pins. Inputs are written by the driver between evaluations, outputs are
//! written by the model during `eval()`. Neither side may assume anything about
//! the other's internals.

mod playback;

pub use playback::{PlaybackModel, PlaybackOptions};

/// Pin state of the peripheral, as seen from the testbench.
///
/// Field names follow the RTL port names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pins {
    // Driven by the testbench.
    pub clk: bool,
    pub reset: bool,
    pub host_address: u16,
    pub host_write_data: u16,
    pub host_write_en: bool,
    pub host_write_byte_mask: u8,
    pub host_read_en: bool,
    pub pcm_read_data: u16,
    pub pcm_data_ready: bool,

    // Driven by the model.
    pub host_ready: bool,
    /// Composite end-of-stream status; one bit per channel.
    pub host_read_data: u16,
    pub pcm_read_address: u32,
    pub pcm_address_valid: bool,
    pub output_valid: bool,
    pub output_l: i16,
    pub output_r: i16,
    pub dbg_adpcm_valid: bool,
    pub dbg_adpcm_predictor: i16,
    pub dbg_adpcm_step_index: i8,
}

/// A cycle-evaluated hardware model.
pub trait HardwareModel {
    fn pins(&self) -> &Pins;

    fn pins_mut(&mut self) -> &mut Pins;

    /// Settle the model for the current input pins.
    fn eval(&mut self);

    /// True once the model has requested the end of simulation.
    fn finished(&self) -> bool {
        false
    }

    /// Called once after the last evaluation.
    fn finalize(&mut self) {}
}

impl<M: HardwareModel + ?Sized> HardwareModel for Box<M> {
    fn pins(&self) -> &Pins {
        (**self).pins()
    }

    fn pins_mut(&mut self) -> &mut Pins {
        (**self).pins_mut()
    }

    fn eval(&mut self) {
        (**self).eval()
    }

    fn finished(&self) -> bool {
        (**self).finished()
    }

    fn finalize(&mut self) {
        (**self).finalize()
    }
}
