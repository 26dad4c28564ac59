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

use crate::channel::AudioChannel;
use crate::model::Pins;
use crate::Error;

/// Upper bound of addressable sample memory, in 16-bit words.
pub const MEMORY_CAPACITY_WORDS: usize = 0x100_0000;

/// Outcome of servicing the sample-memory port for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadResponse {
    /// No request; the data pins were cleared.
    Idle,
    Served { address: u32, data: u16 },
    /// Rejected: all sample accesses are 16-bit aligned.
    Misaligned(u32),
    /// Rejected: the address is past the end of sample memory.
    OutOfBounds(u32),
}

/// Flat sample store backing the peripheral's memory-read port.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleMemory {
    words: Vec<u16>,
}

impl SampleMemory {
    pub fn from_words(words: Vec<u16>) -> Self {
        Self { words }
    }

    /// Lay out sample memory for `channels` and load the raw little-endian
    /// `payload` at every channel's start address.
    ///
    /// The memory covers the furthest address any channel can reach, and is
    /// grown to hold the whole payload at each start address. Every address a
    /// channel can reach is checked here once, so the responder never has to
    /// treat an out-of-range configuration as a per-cycle error.
    pub fn for_channels(channels: &[AudioChannel], payload: &[u8]) -> Result<Self, Error> {
        let payload_words = payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();

        let end_words = channels
            .iter()
            .map(|channel| reach_words(channel.sample_end_address))
            .max()
            .unwrap_or(0);
        if end_words > MEMORY_CAPACITY_WORDS {
            return Err(Error::MemoryExhausted(end_words));
        }

        let loaded_words = channels
            .iter()
            .map(|channel| word_index(channel.sample_start_address) + payload_words.len())
            .max()
            .unwrap_or(payload_words.len());
        let size = end_words.max(loaded_words);
        if size > MEMORY_CAPACITY_WORDS {
            return Err(Error::MemoryExhausted(size));
        }

        let mut words = vec![0u16; size];
        for channel in channels {
            let base = word_index(channel.sample_start_address);
            words[base..base + payload_words.len()].copy_from_slice(&payload_words);
        }

        // Start and loop addresses are fetched, the end address is one past
        // the last fetch.
        for (index, channel) in channels.iter().enumerate() {
            let fetched = [channel.sample_start_address, channel.sample_loop_address];
            if let Some(address) = fetched
                .iter()
                .copied()
                .find(|address| word_index(*address) >= size)
            {
                return Err(Error::AddressOutOfRange {
                    channel: index,
                    address,
                });
            }
        }

        log::debug!(
            "sample memory: {:#x} words, payload {:#x} words",
            size,
            payload_words.len()
        );
        Ok(Self { words })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The word at a byte address, if it is aligned and in bounds.
    pub fn read(&self, address: u32) -> Option<u16> {
        if address & 0x01 != 0 {
            return None;
        }
        self.words.get(word_index(address)).copied()
    }

    /// Answer the model's read request for this cycle. Only valid on the
    /// bus-mutation half cycle.
    ///
    /// Without a request the data pins are cleared to zero, so a decoder that
    /// consumes stale data fails loudly instead of passing by accident.
    pub fn respond(&self, pins: &mut Pins) -> ReadResponse {
        if !pins.pcm_address_valid {
            pins.pcm_data_ready = false;
            pins.pcm_read_data = 0;
            return ReadResponse::Idle;
        }

        let address = pins.pcm_read_address;
        if address & 0x01 != 0 {
            log::error!(
                "Expected only even sample addresses (16bit accesses), got {:#x}",
                address
            );
            pins.pcm_data_ready = false;
            return ReadResponse::Misaligned(address);
        }

        match self.words.get(word_index(address)) {
            Some(&data) => {
                pins.pcm_read_data = data;
                pins.pcm_data_ready = true;
                ReadResponse::Served { address, data }
            }
            None => {
                log::error!("Attempted out of bounds sample read at {:#x}", address);
                pins.pcm_data_ready = false;
                ReadResponse::OutOfBounds(address)
            }
        }
    }
}

fn word_index(byte_address: u32) -> usize {
    (byte_address / 2) as usize
}

/// Words a channel can read up to. An end address of zero wraps around to the
/// top of memory.
fn reach_words(end_address: u32) -> usize {
    match end_address {
        0 => MEMORY_CAPACITY_WORDS,
        end => word_index(end),
    }
}
