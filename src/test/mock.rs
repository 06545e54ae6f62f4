//! Host test doubles for the handshake port, the serial lines and the block
//! store.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use std::collections::VecDeque;

use crate::engine::BitLine;
use crate::signal::{InputSignal, OutputSignal, Signal, SignalPort, Signals};
use crate::storage::{BlockStore, StorageError};
use crate::types::{BufferId, Direction, DiskSide};

/// A handshake port with no hardware behind it.  Input lines idle high, so
/// every (active low) input starts deasserted.
pub struct MockPort {
    outputs: Signals,
    inputs: Signals,
    samples: u32,
}

impl Default for MockPort {
    fn default() -> Self {
        Self {
            outputs: Signals::empty(),
            inputs: Signals::INPUTS,
            samples: 0,
        }
    }
}

impl MockPort {
    /// Physical level of an output line.
    pub fn level(&self, signal: OutputSignal) -> bool {
        self.outputs.contains(Signal::from(signal).flag())
    }

    /// Drive an input line to the level that asserts (or deasserts) it.
    pub fn assert_input(&mut self, signal: InputSignal, asserted: bool) {
        let signal = Signal::from(signal);
        self.inputs
            .set(signal.flag(), signal.polarity().level(asserted));
    }

    /// Number of times the inputs have been sampled.
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl SignalPort for MockPort {
    fn drive(&mut self, signal: OutputSignal, high: bool) {
        self.outputs.set(Signal::from(signal).flag(), high);
    }

    fn sample(&mut self) -> Signals {
        self.samples += 1;
        self.inputs
    }
}

/// Serial lines which record what the engine drives, and play back queued
/// bits when it samples.  The write data line reads low once the queue is
/// empty.
#[derive(Default)]
pub struct MockLine {
    pub data: Vec<bool>,
    pub clock: Vec<bool>,
    pub reads: usize,
    input: VecDeque<bool>,
}

impl MockLine {
    pub fn queue_bits(&mut self, bits: &[bool]) {
        self.input.extend(bits);
    }

    pub fn queue_bytes_lsb(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.input.extend((0..8).map(|ii| (byte >> ii) & 1 != 0));
        }
    }
}

impl BitLine for MockLine {
    fn set_data(&mut self, high: bool) {
        self.data.push(high);
    }

    fn set_clock(&mut self, high: bool) {
        self.clock.push(high);
    }

    fn read_data(&mut self) -> bool {
        self.reads += 1;
        self.input.pop_front().unwrap_or(false)
    }
}

/// A store that serves block n of a session filled with n + 1, keeps every
/// drained block, and can be told to fail the next call.
#[derive(Default)]
pub struct MemoryStore {
    pub begins: Vec<(DiskSide, Direction)>,
    pub fills: Vec<BufferId>,
    pub drained: Vec<Vec<u8>>,
    pub fail_next: Option<StorageError>,
    block: u8,
}

impl BlockStore for MemoryStore {
    fn begin(&mut self, side: DiskSide, direction: Direction) -> Result<(), StorageError> {
        self.begins.push((side, direction));
        self.block = 0;
        Ok(())
    }

    fn fill(&mut self, id: BufferId, block: &mut [u8]) -> Result<(), StorageError> {
        if let Some(e) = self.fail_next.take() {
            return Err(e);
        }
        self.fills.push(id);
        self.block = self.block.wrapping_add(1);
        block.fill(self.block);
        Ok(())
    }

    fn drain(&mut self, _id: BufferId, block: &[u8]) -> Result<(), StorageError> {
        if let Some(e) = self.fail_next.take() {
            return Err(e);
        }
        self.drained.push(block.to_vec());
        Ok(())
    }
}
