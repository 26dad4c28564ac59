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

use std::fmt;

/// Setup errors. These abort the run before the first clock edge.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// More channels than bits in the channel-enable register.
    TooManyChannels(usize),
    /// A channel references a sample address beyond the sample memory.
    AddressOutOfRange { channel: usize, address: u32 },
    /// The referenced end address exceeds the sample memory capacity.
    MemoryExhausted(usize),
    MissingSamplePath,
    InvalidWav(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooManyChannels(count) => write!(
                f,
                "ERROR: {} channels configured, the channel-enable register holds {}",
                count,
                crate::channel::MAX_CHANNELS
            ),
            Self::AddressOutOfRange { channel, address } => write!(
                f,
                "ERROR: channel {} address {:#x} is outside of sample memory",
                channel, address
            ),
            Self::MemoryExhausted(words) => write!(
                f,
                "ERROR: sample end address ({:#x} words) exceeds memory capacity",
                words
            ),
            Self::MissingSamplePath => write!(f, "ERROR: expected a sample path in test config"),
            Self::InvalidWav(reason) => write!(f, "ERROR: invalid WAV data: {}", reason),
        }
    }
}

// Lets `anyhow::Result` carry our errors through the file loaders.
impl std::error::Error for Error {}
