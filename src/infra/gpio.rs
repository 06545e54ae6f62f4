//! This file handles GPIO pin allocation.
//!
//! The source code serves as the master list of pin assignments for the
//! hardware.  It also provides the board implementations of the transfer
//! core's line traits: [`RpSignalPort`] for the handshake signals, and
//! [`SioBitLine`] for the serial data and clock lines the bit clock
//! interrupt drives.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::pac;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::engine::BitLine;
use crate::signal::{InputSignal, OutputSignal, Signal, SignalPort, Signals};

/// Number of user GPIOs on the boards we support.
const NUM_PINS: usize = 30;

/// GPIO configurations for different device types
pub mod config {
    // We allow dead code in this module because some of the configuration
    // settings wil not be included, depending on the device the firmware is
    // being built for.
    #![allow(dead_code)]

    use super::{HandshakePinConfig, PinConfig, SerialPinConfig};

    /// Configuration for the standard board, which brings the RAM Adapter
    /// cable out on GPIOs 2-11.
    pub fn standard() -> PinConfig {
        PinConfig {
            status_display_pin: 25,
            handshake_pins: HandshakePinConfig {
                media_set: 2,
                motor_on: 3,
                ready: 4,
                rw_media: 5,
                stop_motor: 6,
                scan_media: 7,
                write_enable: 8,
            },
            serial_pins: serial_standard(),
        }
    }

    // The read data line is driven low for a 1, as a real drive does.
    fn serial_standard() -> SerialPinConfig {
        SerialPinConfig {
            read_data: 9,
            write_data: 10,
            clock: 11,
            data_inverted: true,
        }
    }
}

/// Overall pin configuration
#[derive(Clone)]
pub struct PinConfig {
    pub status_display_pin: u8,
    pub handshake_pins: HandshakePinConfig,
    pub serial_pins: SerialPinConfig,
}

/// Handshake signal pin configuration
#[derive(Clone)]
pub struct HandshakePinConfig {
    pub media_set: u8,
    pub motor_on: u8,
    pub ready: u8,
    pub rw_media: u8,
    pub stop_motor: u8,
    pub scan_media: u8,
    pub write_enable: u8,
}

impl HandshakePinConfig {
    pub fn output(&self, signal: OutputSignal) -> u8 {
        match signal {
            OutputSignal::MediaSet => self.media_set,
            OutputSignal::MotorOn => self.motor_on,
            OutputSignal::Ready => self.ready,
            OutputSignal::RwMedia => self.rw_media,
        }
    }

    pub fn input(&self, signal: InputSignal) -> u8 {
        match signal {
            InputSignal::StopMotor => self.stop_motor,
            InputSignal::ScanMedia => self.scan_media,
            InputSignal::WriteEnable => self.write_enable,
        }
    }
}

/// Serial data pin configuration
#[derive(Clone)]
pub struct SerialPinConfig {
    /// Output - the data the RAM Adapter reads from the disk
    pub read_data: u8,
    /// Input - the data the RAM Adapter writes to the disk
    pub write_data: u8,
    /// Output - the bit-cell clock/strobe
    pub clock: u8,
    /// Whether a 1 bit is a low level on both data lines
    pub data_inverted: bool,
}

/// Default pin configuration
impl Default for PinConfig {
    fn default() -> Self {
        config::standard()
    }
}

/// Object which provides methods to create objects that require GPIO pins.
pub struct Gpio {
    pins: [Option<AnyPin>; NUM_PINS],
    config: PinConfig,
}

impl Gpio {
    /// Takes every GPIO.  Pins are handed out by number, according to
    /// `config`.
    pub fn new(pins: [AnyPin; NUM_PINS], config: PinConfig) -> Self {
        Self {
            pins: pins.map(Some),
            config,
        }
    }

    /// Get the pin used for the status display.
    pub fn take_status_display_pin(&mut self) -> AnyPin {
        match self.take_pin_as_any(self.config.status_display_pin) {
            Some(pin) => pin,
            None => panic!(
                "Status display pin {} already taken",
                self.config.status_display_pin
            ),
        }
    }

    pub fn take_output(&mut self, index: u8, level: Level) -> Option<Output<'static>> {
        self.take_pin_as_any(index)
            .map(|pin| Output::new(pin, level))
    }

    pub fn take_input(&mut self, index: u8, pull: Pull) -> Option<Input<'static>> {
        self.take_pin_as_any(index)
            .map(|pin| Input::new(pin, pull))
    }

    /// Create the handshake port.  Outputs start at their deasserted level,
    /// and inputs are pulled up, so an unplugged cable reads as nothing
    /// asserted.
    pub fn create_signal_port(&mut self) -> RpSignalPort {
        let pins = self.config.handshake_pins.clone();

        let outputs = OutputSignal::ALL.map(|signal| {
            let num = pins.output(signal);
            let level = Level::from(Signal::from(signal).polarity().level(false));
            match self.take_output(num, level) {
                Some(output) => output,
                None => panic!("Handshake pin {} already taken", num),
            }
        });

        let inputs = InputSignal::ALL.map(|signal| {
            let num = pins.input(signal);
            match self.take_input(num, Pull::Up) {
                Some(input) => input,
                None => panic!("Handshake pin {} already taken", num),
            }
        });
        let input_masks =
            InputSignal::ALL.map(|signal| (Signal::from(signal).flag(), 1 << pins.input(signal)));

        RpSignalPort {
            outputs,
            _inputs: inputs,
            input_masks,
        }
    }

    /// Configure the serial lines and install them for the bit clock
    /// interrupt, which picks them up with [`SioBitLine::installed`].
    pub fn install_bit_line(&mut self) {
        let pins = self.config.serial_pins.clone();
        let idle = Level::from(pins.data_inverted);

        let (Some(read_data), Some(clock), Some(write_data)) = (
            self.take_output(pins.read_data, idle),
            self.take_output(pins.clock, Level::Low),
            self.take_input(pins.write_data, Pull::Up),
        ) else {
            panic!("Serial pins already taken");
        };

        // The pins stay configured for as long as these objects exist, and
        // the bit clock interrupt runs forever.
        core::mem::forget(read_data);
        core::mem::forget(clock);
        core::mem::forget(write_data);

        let line = SioBitLine {
            read_data: 1 << pins.read_data,
            clock: 1 << pins.clock,
            write_data: 1 << pins.write_data,
            inverted: pins.data_inverted,
        };
        line.install();
        debug!(
            "Serial lines: read data {}, clock {}, write data {}",
            pins.read_data, pins.clock, pins.write_data
        );
    }

    /// Helper to take a pin by index
    fn take_pin_as_any(&mut self, index: u8) -> Option<AnyPin> {
        match self.pins.get_mut(index as usize) {
            Some(pin) => pin.take(),
            None => {
                warn!("Attempt to take non-existant pin {}", index);
                None
            }
        }
    }
}

/// The handshake lines.  Inputs are sampled with a single read of the SIO
/// input register.
pub struct RpSignalPort {
    // In OutputSignal::ALL order
    outputs: [Output<'static>; 4],

    // Held so the pins stay configured as inputs
    _inputs: [Input<'static>; 3],
    input_masks: [(Signals, u32); 3],
}

impl SignalPort for RpSignalPort {
    fn drive(&mut self, signal: OutputSignal, high: bool) {
        self.outputs[signal as usize].set_level(Level::from(high));
    }

    fn sample(&mut self) -> Signals {
        let levels = pac::SIO.gpio_in(0).read();
        let mut high = Signals::empty();
        for (flag, mask) in self.input_masks {
            high.set(flag, levels & mask != 0);
        }
        high
    }
}

// The serial line masks, for the bit clock interrupt.  Written once by
// SioBitLine::install() before the interrupt is unmasked.
static READ_DATA_MASK: AtomicU32 = AtomicU32::new(0);
static CLOCK_MASK: AtomicU32 = AtomicU32::new(0);
static WRITE_DATA_MASK: AtomicU32 = AtomicU32::new(0);
static DATA_INVERTED: AtomicBool = AtomicBool::new(false);

/// The serial lines, driven straight through the SIO set/clear registers so
/// the interrupt never touches a driver object.
#[derive(Clone, Copy)]
pub struct SioBitLine {
    read_data: u32,
    clock: u32,
    write_data: u32,
    inverted: bool,
}

impl SioBitLine {
    fn install(&self) {
        READ_DATA_MASK.store(self.read_data, Ordering::Relaxed);
        CLOCK_MASK.store(self.clock, Ordering::Relaxed);
        WRITE_DATA_MASK.store(self.write_data, Ordering::Relaxed);
        DATA_INVERTED.store(self.inverted, Ordering::Release);
    }

    /// The line most recently installed by [`Gpio::install_bit_line`].
    #[inline(always)]
    pub fn installed() -> Self {
        let inverted = DATA_INVERTED.load(Ordering::Acquire);
        Self {
            read_data: READ_DATA_MASK.load(Ordering::Relaxed),
            clock: CLOCK_MASK.load(Ordering::Relaxed),
            write_data: WRITE_DATA_MASK.load(Ordering::Relaxed),
            inverted,
        }
    }

    #[inline(always)]
    fn write(mask: u32, high: bool) {
        let out = pac::SIO.gpio_out(0);
        if high {
            out.value_set().write_value(mask);
        } else {
            out.value_clr().write_value(mask);
        }
    }
}

impl BitLine for SioBitLine {
    #[inline(always)]
    fn set_data(&mut self, bit: bool) {
        Self::write(self.read_data, bit != self.inverted);
    }

    #[inline(always)]
    fn set_clock(&mut self, high: bool) {
        Self::write(self.clock, high);
    }

    #[inline(always)]
    fn read_data(&mut self) -> bool {
        let high = pac::SIO.gpio_in(0).read() & self.write_data != 0;
        high != self.inverted
    }
}
