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

use crate::dispatch::PendingWrite;
use crate::Error;
use serde::{Deserialize, Serialize};

/// Width of the channel-enable register.
pub const MAX_CHANNELS: usize = 8;

/// Each channel owns a block of this many registers.
pub const REGISTER_BLOCK_SIZE: u16 = 0x08;

/// Writing a channel mask here starts playback of those channels.
pub const CHANNEL_ENABLE_REGISTER: u16 = 0x100;

/// Sample addresses are programmed in 2 KiB units.
pub const ADDRESS_SHIFT: u32 = 11;

// Register offsets within a channel block.
pub const REG_START_ADDRESS: u16 = 0;
pub const REG_FLAGS: u16 = 1;
pub const REG_END_ADDRESS: u16 = 2;
pub const REG_LOOP_ADDRESS: u16 = 3;
pub const REG_VOLUMES: u16 = 4;
pub const REG_PITCH: u16 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AudioFlags(pub u32);

impl AudioFlags {
    pub const LOOP: AudioFlags = AudioFlags(1 << 0);
    pub const ADPCM: AudioFlags = AudioFlags(1 << 1);

    pub fn contains(self, other: AudioFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The flags register only holds the low byte.
    pub fn register_value(self) -> u16 {
        (self.0 & 0xff) as u16
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Volumes {
    #[serde(rename = "volume_left")]
    pub left: i8,
    #[serde(rename = "volume_right")]
    pub right: i8,
}

impl Volumes {
    /// Left gain in the low byte, right gain in the high byte.
    pub fn packed(self) -> u16 {
        u16::from(self.left as u8) | u16::from(self.right as u8) << 8
    }

    pub fn unpack(value: u16) -> Self {
        Self {
            left: (value & 0xff) as u8 as i8,
            right: (value >> 8) as u8 as i8,
        }
    }
}

/// Static description of one decode channel.
///
/// Addresses are byte offsets into sample memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AudioChannel {
    pub sample_start_address: u32,
    pub sample_end_address: u32,
    pub sample_loop_address: u32,
    pub flags: AudioFlags,
    #[serde(flatten)]
    pub volumes: Volumes,
    pub pitch: u16,
}

impl AudioChannel {
    /// The register writes that set up this channel, in the order the
    /// hardware expects them.
    pub fn register_writes(&self, channel: usize) -> [PendingWrite; 6] {
        let base = channel as u16 * REGISTER_BLOCK_SIZE;
        let write = |offset: u16, data: u16| PendingWrite {
            address: base + offset,
            data,
        };
        [
            write(REG_START_ADDRESS, scaled_address(self.sample_start_address)),
            write(REG_FLAGS, self.flags.register_value()),
            write(REG_END_ADDRESS, scaled_address(self.sample_end_address)),
            write(REG_LOOP_ADDRESS, scaled_address(self.sample_loop_address)),
            write(REG_VOLUMES, self.volumes.packed()),
            write(REG_PITCH, self.pitch),
        ]
    }
}

fn scaled_address(address: u32) -> u16 {
    (address >> ADDRESS_SHIFT) as u16
}

/// One bit set per configured channel. Counts beyond the hardware's channels
/// saturate at all channels.
pub fn channel_mask(count: usize) -> u16 {
    ((1u32 << count.min(MAX_CHANNELS)) - 1) as u16
}

/// Compile channel descriptions into the register writes that configure and
/// then start them.
pub fn compile_channels(channels: &[AudioChannel]) -> Result<Vec<PendingWrite>, Error> {
    if channels.len() > MAX_CHANNELS {
        return Err(Error::TooManyChannels(channels.len()));
    }
    let mut writes = channels
        .iter()
        .enumerate()
        .flat_map(|(index, channel)| channel.register_writes(index))
        .collect::<Vec<_>>();
    writes.push(PendingWrite {
        address: CHANNEL_ENABLE_REGISTER,
        data: channel_mask(channels.len()),
    });
    log::debug!(
        "compiled {} channels into {} register writes",
        channels.len(),
        writes.len()
    );
    Ok(writes)
}
