//! The bit clock engine.
//!
//! [`BitClockEngine::tick`] is called from the bit clock timer interrupt,
//! twice per bit-cell.  Each call toggles the clock phase and, while armed,
//! moves through the gap and then the data one bit per bit-cell:
//!
//! - low half: drive (emit) or sample (capture) the current bit.  When the
//!   eighth bit completes, the byte is exchanged with the double buffer and
//!   fed to the CRC accumulator.
//! - high half: strobe the clock line high.  No data moves.
//!
//! The tick path only touches atomics, the double buffer and the line
//! registers.  It never blocks, allocates or calls into storage.
//!
//! Field ownership follows the double buffer's rules: the main loop writes
//! the session parameters and `armed`, and only rewrites engine-owned fields
//! from [`BitClockEngine::arm`], which requires the engine to be disarmed.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

use crate::buffer::DoubleBuffer;
use crate::crc::Crc16;
use crate::types::{BitOrder, BufferId, Direction, GapPolicy};

/// The serial lines the engine drives or samples.
///
/// Data is logical: `true` is a 1 bit.  Boards whose data lines are
/// inverted map that in their implementation.
pub trait BitLine {
    /// Drive the read data line (emit).
    fn set_data(&mut self, bit: bool);

    /// Drive the clock/strobe line (emit).
    fn set_clock(&mut self, high: bool);

    /// Sample the write data line (capture).
    fn read_data(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EngineState {
    /// Ticks are ignored.
    Disarmed = 0,

    /// Clocking out (or waiting through) the gap before the first block.
    Gap = 1,

    /// Moving real data.
    Transferring = 2,
}

bitflags! {
    // Session parameters, packed so the interrupt reads them in one go.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Mode: u8 {
        const CAPTURE = 1 << 0;
        const WAIT_FOR_MARK = 1 << 1;
        const MSB_FIRST = 1 << 2;
        const CRC = 1 << 3;
    }
}

/// Parameters for one armed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    pub direction: Direction,

    /// Length of the gap in timer ticks (two per bit-cell).
    pub gap_ticks: u32,

    pub gap_policy: GapPolicy,
    pub bit_order: BitOrder,

    /// CRC seed, or `None` to leave the accumulator alone.
    pub crc_seed: Option<u16>,
}

impl EngineConfig {
    fn mode(&self) -> Mode {
        let mut mode = Mode::empty();
        mode.set(Mode::CAPTURE, self.direction == Direction::Capture);
        mode.set(
            Mode::WAIT_FOR_MARK,
            self.gap_policy == GapPolicy::CountdownThenMark,
        );
        mode.set(Mode::MSB_FIRST, self.bit_order == BitOrder::MsbFirst);
        mode.set(Mode::CRC, self.crc_seed.is_some());
        mode
    }
}

/// Read-only counters for the display collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStatus {
    pub state: EngineState,
    pub bits_transferred: u32,
    pub position: u32,
    pub crc: u16,
    pub underruns: u32,
    pub active_buffer: BufferId,
}

pub struct BitClockEngine<const N: usize> {
    buffer: DoubleBuffer<N>,

    // Main loop owned
    armed: AtomicBool,
    mode: AtomicU8,

    // Engine owned while armed
    state: AtomicU8,
    phase_high: AtomicBool,
    gap_remaining: AtomicU32,
    gap_level: AtomicBool,
    bits_sent: AtomicU8,
    byte: AtomicU8,
    need_byte: AtomicBool,
    crc: AtomicU16,
    position: AtomicU32,
    bits: AtomicU32,
}

impl<const N: usize> Default for BitClockEngine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BitClockEngine<N> {
    pub const fn new() -> Self {
        Self {
            buffer: DoubleBuffer::new(),
            armed: AtomicBool::new(false),
            mode: AtomicU8::new(0),
            state: AtomicU8::new(EngineState::Disarmed as u8),
            phase_high: AtomicBool::new(false),
            gap_remaining: AtomicU32::new(0),
            gap_level: AtomicBool::new(false),
            bits_sent: AtomicU8::new(0),
            byte: AtomicU8::new(0),
            need_byte: AtomicBool::new(true),
            crc: AtomicU16::new(0),
            position: AtomicU32::new(0),
            bits: AtomicU32::new(0),
        }
    }

    pub fn buffer(&self) -> &DoubleBuffer<N> {
        &self.buffer
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Start a session.  Does nothing if one is already armed - disarm
    /// first.  The caller prepares the double buffer (reset and, for emit,
    /// prefill both halves) before arming.
    pub fn arm(&self, config: &EngineConfig) {
        if self.is_armed() {
            return;
        }

        self.mode.store(config.mode().bits(), Ordering::Relaxed);
        self.state.store(EngineState::Gap as u8, Ordering::Relaxed);
        self.phase_high.store(false, Ordering::Relaxed);
        self.gap_remaining
            .store(config.gap_ticks, Ordering::Relaxed);
        self.gap_level.store(false, Ordering::Relaxed);
        self.bits_sent.store(0, Ordering::Relaxed);
        self.byte.store(0, Ordering::Relaxed);
        self.need_byte.store(true, Ordering::Relaxed);
        self.crc
            .store(config.crc_seed.unwrap_or(0), Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
        self.bits.store(0, Ordering::Relaxed);

        self.armed.store(true, Ordering::Release);
    }

    /// Stop acting on ticks.  Any partially transferred byte is dropped.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn state(&self) -> EngineState {
        if !self.is_armed() {
            return EngineState::Disarmed;
        }
        match self.state.load(Ordering::Acquire) {
            2 => EngineState::Transferring,
            _ => EngineState::Gap,
        }
    }

    /// Bits of the in-flight byte already moved.
    pub fn bits_sent(&self) -> u8 {
        self.bits_sent.load(Ordering::Acquire)
    }

    /// Whole bytes moved this session.
    pub fn position(&self) -> u32 {
        self.position.load(Ordering::Acquire)
    }

    /// Data bits moved this session.  Gap bit-cells are not counted.
    pub fn bits_transferred(&self) -> u32 {
        self.bits.load(Ordering::Relaxed)
    }

    pub fn crc(&self) -> u16 {
        self.crc.load(Ordering::Relaxed)
    }

    pub fn gap_remaining(&self) -> u32 {
        self.gap_remaining.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state(),
            bits_transferred: self.bits_transferred(),
            position: self.position(),
            crc: self.crc(),
            underruns: self.buffer.underruns(),
            active_buffer: self.buffer.active(),
        }
    }

    /// One timer tick.  Called from the bit clock interrupt.
    #[inline(always)]
    pub fn tick<L: BitLine>(&self, line: &mut L) {
        if !self.armed.load(Ordering::Acquire) {
            return;
        }

        let mode = Mode::from_bits_truncate(self.mode.load(Ordering::Relaxed));
        let low = !self.phase_high.load(Ordering::Relaxed);
        self.phase_high.store(low, Ordering::Relaxed);

        if self.state.load(Ordering::Relaxed) == EngineState::Gap as u8 {
            self.tick_gap(mode, low, line);
        } else {
            self.tick_data(mode, low, line);
        }
    }

    #[inline(always)]
    fn tick_gap<L: BitLine>(&self, mode: Mode, low: bool, line: &mut L) {
        let remaining = self.gap_remaining.load(Ordering::Relaxed);
        if remaining > 0 {
            self.gap_remaining
                .store(remaining - 1, Ordering::Relaxed);
            if !mode.contains(Mode::CAPTURE) {
                let level = !self.gap_level.load(Ordering::Relaxed);
                self.gap_level.store(level, Ordering::Relaxed);
                line.set_clock(!low);
                line.set_data(level);
            }
            return;
        }

        if mode.contains(Mode::WAIT_FOR_MARK) {
            // The mark is a 1 in a data bit position, so only look on the
            // low half.
            if low && line.read_data() {
                self.state
                    .store(EngineState::Transferring as u8, Ordering::Release);
            }
            return;
        }

        self.state
            .store(EngineState::Transferring as u8, Ordering::Release);
        self.tick_data(mode, low, line);
    }

    #[inline(always)]
    fn tick_data<L: BitLine>(&self, mode: Mode, low: bool, line: &mut L) {
        let capture = mode.contains(Mode::CAPTURE);
        if !low {
            if !capture {
                line.set_clock(true);
            }
            return;
        }

        let order = if mode.contains(Mode::MSB_FIRST) {
            BitOrder::MsbFirst
        } else {
            BitOrder::LsbFirst
        };
        let index = self.bits_sent.load(Ordering::Relaxed);

        let byte = if capture {
            let byte = order.place(self.byte.load(Ordering::Relaxed), index, line.read_data());
            self.byte.store(byte, Ordering::Relaxed);
            byte
        } else {
            line.set_clock(false);
            let byte = if self.need_byte.load(Ordering::Relaxed) {
                let byte = self.buffer.pull_byte();
                self.byte.store(byte, Ordering::Relaxed);
                self.need_byte.store(false, Ordering::Relaxed);
                byte
            } else {
                self.byte.load(Ordering::Relaxed)
            };
            line.set_data(order.bit(byte, index));
            byte
        };

        let bits = self.bits.load(Ordering::Relaxed).wrapping_add(1);
        self.bits.store(bits, Ordering::Relaxed);

        let index = index + 1;
        if index < 8 {
            self.bits_sent.store(index, Ordering::Release);
            return;
        }

        if capture {
            self.buffer.push_byte(byte);
            self.byte.store(0, Ordering::Relaxed);
        } else {
            self.need_byte.store(true, Ordering::Relaxed);
        }
        if mode.contains(Mode::CRC) {
            let crc = Crc16::step(self.crc.load(Ordering::Relaxed), byte);
            self.crc.store(crc, Ordering::Relaxed);
        }
        let position = self.position.load(Ordering::Relaxed).wrapping_add(1);
        self.position.store(position, Ordering::Release);
        self.bits_sent.store(0, Ordering::Release);
    }
}
