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

//! Behavioral stand-in for the audio peripheral.
//!
//! It speaks the same pin protocol as the RTL: register writes through the
//! host port, sample fetches through the memory port, one stereo frame per
//! output strobe and an end-of-stream bit per channel. Samples are played as
//! raw 16-bit PCM; there is no ADPCM decoder here.

use super::{HardwareModel, Pins};
use crate::memory::MEMORY_CAPACITY_WORDS;
use crate::channel::{
    AudioFlags, Volumes, ADDRESS_SHIFT, CHANNEL_ENABLE_REGISTER, MAX_CHANNELS, REGISTER_BLOCK_SIZE,
    REG_END_ADDRESS, REG_FLAGS, REG_LOOP_ADDRESS, REG_PITCH, REG_START_ADDRESS, REG_VOLUMES,
};

/// Pitch of 1.0: one sample word per output frame.
const PITCH_UNITY: u32 = 0x1000;
const PITCH_FRACTION_BITS: u32 = 12;

/// Fixed-point volume, 0x80 is unity gain.
const VOLUME_SHIFT: u32 = 7;

/// An end register of zero wraps to the top of sample memory.
const END_WRAPAROUND: u32 = (MEMORY_CAPACITY_WORDS * 2) as u32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Rising edges a host write is held on the port before it is accepted.
    pub write_stall_cycles: usize,
    /// Request the end of simulation after this many output frames.
    pub finish_after_frames: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default)]
struct ChannelRegisters {
    start: u16,
    flags: u16,
    end: u16,
    loop_start: u16,
    volumes: u16,
    pitch: u16,
}

impl ChannelRegisters {
    fn get_mut(&mut self, offset: u16) -> Option<&mut u16> {
        match offset {
            REG_START_ADDRESS => Some(&mut self.start),
            REG_FLAGS => Some(&mut self.flags),
            REG_END_ADDRESS => Some(&mut self.end),
            REG_LOOP_ADDRESS => Some(&mut self.loop_start),
            REG_VOLUMES => Some(&mut self.volumes),
            REG_PITCH => Some(&mut self.pitch),
            _ => None,
        }
    }

    fn end_address(&self) -> u32 {
        match self.end {
            0 => END_WRAPAROUND,
            end => u32::from(end) << ADDRESS_SHIFT,
        }
    }
}

/// Playback position of one channel.
#[derive(Clone, Copy, Debug, Default)]
struct Voice {
    /// Byte address of the next sample word.
    address: u32,
    /// Fractional part of the position.
    phase: u32,
    sample: i16,
}

#[derive(Clone, Debug, Default)]
pub struct PlaybackModel {
    pins: Pins,
    options: PlaybackOptions,
    last_clk: bool,
    registers: [ChannelRegisters; MAX_CHANNELS],
    voices: [Voice; MAX_CHANNELS],
    /// Channels currently playing, one bit per channel.
    playing: u16,
    /// End-of-stream status, one bit per channel.
    ended: u16,
    write_stall: usize,
    /// Next channel to fetch in the current frame.
    cursor: usize,
    /// Channels fetched in the current frame.
    frame_mask: u16,
    fetching: Option<usize>,
    frames: u64,
    finished: bool,
}

impl PlaybackModel {
    pub fn new(options: PlaybackOptions) -> Self {
        Self {
            options,
            write_stall: options.write_stall_cycles,
            ..Default::default()
        }
    }

    /// Output frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn reset_state(&mut self) {
        let options = self.options;
        let clk = self.pins.clk;
        let reset = self.pins.reset;
        *self = Self::new(options);
        self.pins.clk = clk;
        self.pins.reset = reset;
        self.last_clk = clk;
    }

    fn rising_edge(&mut self) {
        self.pins.output_valid = false;
        self.pins.dbg_adpcm_valid = false;
        self.host_port();
        self.sample_port();
        self.pins.host_read_data = self.ended;
    }

    fn host_port(&mut self) {
        if !self.pins.host_write_en {
            self.pins.host_ready = false;
            return;
        }
        if self.write_stall > 0 {
            self.write_stall -= 1;
            self.pins.host_ready = false;
            return;
        }
        self.write_register(
            self.pins.host_address,
            self.pins.host_write_data,
            self.pins.host_write_byte_mask,
        );
        self.pins.host_ready = true;
        self.write_stall = self.options.write_stall_cycles;
    }

    fn write_register(&mut self, address: u16, data: u16, byte_mask: u8) {
        log::trace!("model: register {:#06x} <- {:#06x}", address, data);
        if address == CHANNEL_ENABLE_REGISTER {
            self.enable_channels(merge_bytes(self.playing, data, byte_mask));
            return;
        }
        let channel = (address / REGISTER_BLOCK_SIZE) as usize;
        let offset = address % REGISTER_BLOCK_SIZE;
        match self
            .registers
            .get_mut(channel)
            .and_then(|registers| registers.get_mut(offset))
        {
            Some(register) => *register = merge_bytes(*register, data, byte_mask),
            None => log::warn!("model: write to unmapped register {:#06x}", address),
        }
    }

    fn enable_channels(&mut self, mask: u16) {
        let mask = mask & ((1 << MAX_CHANNELS) - 1);
        for channel in (0..MAX_CHANNELS).filter(|channel| mask & (1 << channel) != 0) {
            let registers = &self.registers[channel];
            if AudioFlags(u32::from(registers.flags)).contains(AudioFlags::ADPCM) {
                log::warn!(
                    "model: channel {} is ADPCM encoded, playing it back as raw PCM",
                    channel
                );
            }
            self.voices[channel] = Voice {
                address: u32::from(registers.start) << ADDRESS_SHIFT,
                ..Default::default()
            };
        }
        self.playing = mask;
        self.ended &= !mask;
        self.cursor = 0;
        self.frame_mask = 0;
        log::debug!("model: playing channels {:#04x}", mask);
    }

    // At most one sample transaction per cycle.
    fn sample_port(&mut self) {
        if let Some(channel) = self.fetching {
            if !self.pins.pcm_data_ready {
                return;
            }
            self.voices[channel].sample = self.pins.pcm_read_data as i16;
            self.pins.pcm_address_valid = false;
            self.fetching = None;
            self.frame_mask |= 1 << channel;
            self.advance(channel);
            if self.next_playing(channel + 1).is_none() {
                self.emit_frame();
            } else {
                self.cursor = channel + 1;
            }
            return;
        }

        if let Some(channel) = self.next_playing(self.cursor).or_else(|| self.next_playing(0)) {
            self.pins.pcm_read_address = self.voices[channel].address;
            self.pins.pcm_address_valid = true;
            self.fetching = Some(channel);
        }
    }

    fn next_playing(&self, from: usize) -> Option<usize> {
        (from..MAX_CHANNELS).find(|channel| self.playing & (1 << channel) != 0)
    }

    fn advance(&mut self, channel: usize) {
        let registers = self.registers[channel];
        let voice = &mut self.voices[channel];
        voice.phase += u32::from(registers.pitch);
        voice.address += (voice.phase >> PITCH_FRACTION_BITS) * 2;
        voice.phase &= PITCH_UNITY - 1;
        if voice.address < registers.end_address() {
            return;
        }
        if AudioFlags(u32::from(registers.flags)).contains(AudioFlags::LOOP) {
            voice.address = u32::from(registers.loop_start) << ADDRESS_SHIFT;
        } else {
            log::debug!("model: channel {} reached its end address", channel);
            self.playing &= !(1 << channel);
            self.ended |= 1 << channel;
        }
    }

    fn emit_frame(&mut self) {
        let (mut left, mut right) = (0i32, 0i32);
        for channel in (0..MAX_CHANNELS).filter(|channel| self.frame_mask & (1 << channel) != 0) {
            let sample = i32::from(self.voices[channel].sample);
            let volumes = Volumes::unpack(self.registers[channel].volumes);
            left += (sample * i32::from(volumes.left)) >> VOLUME_SHIFT;
            right += (sample * i32::from(volumes.right)) >> VOLUME_SHIFT;
        }
        self.pins.output_l = saturate(left);
        self.pins.output_r = saturate(right);
        self.pins.output_valid = true;
        // The debug port follows the lowest channel of the frame.
        let first = self.frame_mask.trailing_zeros() as usize;
        self.pins.dbg_adpcm_predictor = self.voices[first].sample;
        self.pins.dbg_adpcm_step_index = 0;
        self.pins.dbg_adpcm_valid = true;

        self.cursor = 0;
        self.frame_mask = 0;
        self.frames += 1;
        if let Some(limit) = self.options.finish_after_frames {
            self.finished |= self.frames >= limit;
        }
    }
}

impl HardwareModel for PlaybackModel {
    fn pins(&self) -> &Pins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut Pins {
        &mut self.pins
    }

    fn eval(&mut self) {
        if self.pins.reset {
            self.reset_state();
            return;
        }
        let rising = self.pins.clk && !self.last_clk;
        self.last_clk = self.pins.clk;
        if rising {
            self.rising_edge();
        }
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn finalize(&mut self) {
        log::debug!("model: finalized after {} frames", self.frames);
    }
}

fn merge_bytes(old: u16, new: u16, byte_mask: u8) -> u16 {
    let mask = (if byte_mask & 0x01 != 0 { 0x00ff } else { 0 })
        | (if byte_mask & 0x02 != 0 { 0xff00 } else { 0 });
    (old & !mask) | (new & mask)
}

fn saturate(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
