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
use std::collections::VecDeque;

/// Both data bytes of a register write are valid.
pub const BYTE_MASK_WORD: u8 = 0x03;

/// A register write waiting to be driven onto the host port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    pub address: u16,
    pub data: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing is driven on the host port.
    Idle,
    /// A write was driven this cycle.
    Pending,
    /// The driven write has not been accepted yet and stays on the port.
    Blocked,
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::Idle
    }
}

/// FIFO of register writes, drained at most one per cycle under the
/// `host_write_en`/`host_ready` handshake.
///
/// A write leaves the queue only when it is driven onto the port, and it stays
/// on the port until the model raises `host_ready`. A stalled handshake
/// therefore neither drops nor repeats a write.
#[derive(Clone, Debug, Default)]
pub struct WriteQueue {
    queue: VecDeque<PendingWrite>,
    state: DispatchState,
    dispatched: usize,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, address: u16, data: u16) {
        self.queue.push_back(PendingWrite { address, data });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Number of writes driven onto the port so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Run the dispatcher for one cycle. Only valid on the bus-mutation half
    /// cycle, i.e. between the rising-edge and falling-edge evaluations.
    pub fn step(&mut self, pins: &mut Pins) -> DispatchState {
        if pins.host_write_en && !pins.host_ready {
            log::trace!(
                "dispatch: write {:#06x} <- {:#06x} not accepted yet",
                pins.host_address,
                pins.host_write_data
            );
            self.state = DispatchState::Blocked;
            return self.state;
        }

        pins.host_write_en = false;

        self.state = match self.queue.pop_front() {
            Some(write) => {
                log::trace!(
                    "dispatch: driving write {:#06x} <- {:#06x}",
                    write.address,
                    write.data
                );
                pins.host_write_en = true;
                pins.host_address = write.address;
                pins.host_write_data = write.data;
                pins.host_write_byte_mask = BYTE_MASK_WORD;
                self.dispatched += 1;
                DispatchState::Pending
            }
            None => DispatchState::Idle,
        };
        self.state
    }
}

impl Extend<PendingWrite> for WriteQueue {
    fn extend<T: IntoIterator<Item = PendingWrite>>(&mut self, iter: T) {
        self.queue.extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    // Accepts a driven write after `stall` rising edges.
    struct Acceptor {
        stall: usize,
        accepted: Vec<PendingWrite>,
    }

    impl Acceptor {
        fn rising_edge(&mut self, pins: &mut Pins, next_stall: usize) {
            if !pins.host_write_en {
                pins.host_ready = false;
                return;
            }
            if self.stall > 0 {
                self.stall -= 1;
                pins.host_ready = false;
                return;
            }
            self.accepted.push(PendingWrite {
                address: pins.host_address,
                data: pins.host_write_data,
            });
            pins.host_ready = true;
            self.stall = next_stall;
        }
    }

    #[test]
    fn holds_write_until_ready() {
        let mut pins = Pins::default();
        let mut queue = WriteQueue::new();
        queue.push(0x01, 0xaaaa);
        queue.push(0x02, 0xbbbb);

        assert_eq!(queue.state(), DispatchState::Idle);
        assert_eq!(queue.step(&mut pins), DispatchState::Pending);
        assert_eq!(queue.state(), DispatchState::Pending);
        assert!(pins.host_write_en);
        assert_eq!(pins.host_address, 0x01);
        assert_eq!(pins.host_write_byte_mask, BYTE_MASK_WORD);

        for _ in 0..3 {
            assert_eq!(queue.step(&mut pins), DispatchState::Blocked);
            assert_eq!(pins.host_address, 0x01);
            assert_eq!(pins.host_write_data, 0xaaaa);
            assert_eq!(queue.len(), 1);
        }

        pins.host_ready = true;
        assert_eq!(queue.step(&mut pins), DispatchState::Pending);
        assert_eq!(pins.host_address, 0x02);
        assert_eq!(pins.host_write_data, 0xbbbb);
        assert!(queue.is_empty());

        assert_eq!(queue.step(&mut pins), DispatchState::Idle);
        assert!(!pins.host_write_en);
        assert_eq!(queue.dispatched(), 2);
    }

    #[test]
    fn idle_queue_releases_enable() {
        let mut pins = Pins {
            host_write_en: true,
            host_ready: true,
            ..Default::default()
        };
        let mut queue = WriteQueue::new();
        assert_eq!(queue.step(&mut pins), DispatchState::Idle);
        assert!(!pins.host_write_en);
    }

    #[test]
    fn random_stalls_keep_fifo_order() {
        let _logger = env_logger::builder().is_test(true).try_init();
        let mut rng = Xoshiro256StarStar::seed_from_u64(0x5eed_0f_ad9c);
        let writes = (0..200u16)
            .map(|i| PendingWrite {
                address: i,
                data: i.wrapping_mul(0x9e37),
            })
            .collect::<Vec<_>>();
        let mut queue = WriteQueue::new();
        queue.extend(writes.iter().copied());

        let mut pins = Pins::default();
        let mut acceptor = Acceptor {
            stall: 0,
            accepted: vec![],
        };
        for _ in 0..10_000 {
            queue.step(&mut pins);
            let next_stall = rng.gen_range(0..6);
            acceptor.rising_edge(&mut pins, next_stall);
        }
        assert_eq!(acceptor.accepted, writes);
        assert_eq!(queue.dispatched(), writes.len());
    }
}
