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

use crate::channel::channel_mask;
use crate::config::RunConfig;

/// Why the simulation loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The model requested the end of simulation.
    ModelFinished,
    /// The time budget ran out before the streams ended.
    TimedOut,
    /// The requested number of stereo frames was captured.
    SampleCountReached,
    /// Every configured channel reported end-of-stream.
    ChannelsEnded,
}

impl StopReason {
    /// True if the run stopped on one of its own end conditions rather than
    /// on an external limit.
    pub fn end_reached(self) -> bool {
        matches!(self, Self::SampleCountReached | Self::ChannelsEnded)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Termination {
    test_duration: u64,
    sample_count: u64,
    channel_mask: u16,
}

impl Termination {
    pub fn new(test_duration: u64, sample_count: u64, channel_count: usize) -> Self {
        Self {
            test_duration,
            sample_count,
            channel_mask: channel_mask(channel_count),
        }
    }

    pub fn from_config(config: &RunConfig, channel_count: usize) -> Self {
        Self::new(config.test_duration, config.sample_count, channel_count)
    }

    /// Checked before each cycle is simulated.
    pub fn before_cycle(&self, time: u64, model_finished: bool) -> Option<StopReason> {
        if model_finished {
            Some(StopReason::ModelFinished)
        } else if time >= self.test_duration {
            Some(StopReason::TimedOut)
        } else {
            None
        }
    }

    /// Checked after the outputs of a cycle were captured.
    pub fn after_cycle(
        &self,
        audio_captured: bool,
        frames: u64,
        end_status: u16,
    ) -> Option<StopReason> {
        if audio_captured && frames >= self.sample_count {
            Some(StopReason::SampleCountReached)
        } else if self.channels_did_end(end_status) {
            Some(StopReason::ChannelsEnded)
        } else {
            None
        }
    }

    /// True if every configured channel has its end bit set.
    pub fn channels_did_end(&self, end_status: u16) -> bool {
        end_status & self.channel_mask == self.channel_mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_budget() {
        let termination = Termination::new(10, u64::MAX, 1);
        assert_eq!(termination.before_cycle(9, false), None);
        assert_eq!(
            termination.before_cycle(10, false),
            Some(StopReason::TimedOut)
        );
        assert_eq!(
            termination.before_cycle(0, true),
            Some(StopReason::ModelFinished)
        );
    }

    #[test]
    fn sample_count_only_counts_on_capture() {
        let termination = Termination::new(100, 4, 2);
        assert_eq!(termination.after_cycle(false, 4, 0), None);
        assert_eq!(termination.after_cycle(true, 3, 0), None);
        assert_eq!(
            termination.after_cycle(true, 4, 0),
            Some(StopReason::SampleCountReached)
        );
    }

    #[test]
    fn all_configured_channels_must_end() {
        let termination = Termination::new(100, u64::MAX, 3);
        assert_eq!(termination.after_cycle(false, 0, 0b011), None);
        assert_eq!(termination.after_cycle(false, 0, 0b101), None);
        assert_eq!(
            termination.after_cycle(false, 0, 0b1111),
            Some(StopReason::ChannelsEnded)
        );
        assert!(StopReason::ChannelsEnded.end_reached());
        assert!(!StopReason::TimedOut.end_reached());
    }

    #[test]
    fn oversized_channel_count_waits_for_all_hardware_channels() {
        let termination = Termination::new(100, u64::MAX, 64);
        assert!(!termination.channels_did_end(0x7f));
        assert!(termination.channels_did_end(0xff));
    }
}
