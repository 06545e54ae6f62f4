//! Handshake signal lines between the emulated drive and the RAM Adapter.
//!
//! Each of the seven handshake signals is a single line with a fixed active
//! level.  This module maps logical assertion onto physical levels using a
//! per-signal polarity, and keeps the last known logical state of every
//! signal in a [`HandshakeState`].
//!
//! Outputs are written through to the physical line immediately.  Inputs
//! are only refreshed by [`HandshakeLines::poll_inputs`], which samples all
//! of them with a single read of the underlying port so a line changing
//! mid-poll cannot produce an inconsistent snapshot.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;

/// The level at which a line is considered asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Physical level (true is high) for a logical state.
    #[inline(always)]
    pub fn level(self, asserted: bool) -> bool {
        match self {
            Polarity::ActiveHigh => asserted,
            Polarity::ActiveLow => !asserted,
        }
    }

    /// Logical state for a physical level (true is high).
    #[inline(always)]
    pub fn asserted(self, level: bool) -> bool {
        self.level(level)
    }
}

bitflags! {
    /// A set of handshake signals.  Used both for logical state (which
    /// signals are asserted) and for physical samples (which lines are high).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Signals: u8 {
        const MEDIA_SET = 1 << 0;
        const MOTOR_ON = 1 << 1;
        const READY = 1 << 2;
        const RW_MEDIA = 1 << 3;
        const STOP_MOTOR = 1 << 4;
        const SCAN_MEDIA = 1 << 5;
        const WRITE_ENABLE = 1 << 6;

        const OUTPUTS = Self::MEDIA_SET.bits()
            | Self::MOTOR_ON.bits()
            | Self::READY.bits()
            | Self::RW_MEDIA.bits();
        const INPUTS = Self::STOP_MOTOR.bits()
            | Self::SCAN_MEDIA.bits()
            | Self::WRITE_ENABLE.bits();
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Signals {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Signals(0x{:02x})", self.bits())
    }
}

/// Signals the drive drives towards the RAM Adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputSignal {
    MediaSet,
    MotorOn,
    Ready,
    RwMedia,
}

impl OutputSignal {
    pub const ALL: [OutputSignal; 4] = [
        OutputSignal::MediaSet,
        OutputSignal::MotorOn,
        OutputSignal::Ready,
        OutputSignal::RwMedia,
    ];
}

/// Signals the RAM Adapter drives towards the drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputSignal {
    StopMotor,
    ScanMedia,
    WriteEnable,
}

impl InputSignal {
    pub const ALL: [InputSignal; 3] = [
        InputSignal::StopMotor,
        InputSignal::ScanMedia,
        InputSignal::WriteEnable,
    ];
}

/// Any of the seven handshake signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Signal {
    Output(OutputSignal),
    Input(InputSignal),
}

impl From<OutputSignal> for Signal {
    fn from(signal: OutputSignal) -> Self {
        Signal::Output(signal)
    }
}

impl From<InputSignal> for Signal {
    fn from(signal: InputSignal) -> Self {
        Signal::Input(signal)
    }
}

impl Signal {
    /// The active level of each line.  This is fixed by the RAM Adapter's
    /// connector and must not change.
    pub const fn polarity(self) -> Polarity {
        match self {
            Signal::Output(OutputSignal::MediaSet) => Polarity::ActiveLow,
            Signal::Output(OutputSignal::MotorOn) => Polarity::ActiveHigh,
            Signal::Output(OutputSignal::Ready) => Polarity::ActiveHigh,
            Signal::Output(OutputSignal::RwMedia) => Polarity::ActiveHigh,
            Signal::Input(InputSignal::StopMotor) => Polarity::ActiveLow,
            Signal::Input(InputSignal::ScanMedia) => Polarity::ActiveLow,
            Signal::Input(InputSignal::WriteEnable) => Polarity::ActiveLow,
        }
    }

    /// This signal's bit within [`Signals`].
    pub const fn flag(self) -> Signals {
        match self {
            Signal::Output(OutputSignal::MediaSet) => Signals::MEDIA_SET,
            Signal::Output(OutputSignal::MotorOn) => Signals::MOTOR_ON,
            Signal::Output(OutputSignal::Ready) => Signals::READY,
            Signal::Output(OutputSignal::RwMedia) => Signals::RW_MEDIA,
            Signal::Input(InputSignal::StopMotor) => Signals::STOP_MOTOR,
            Signal::Input(InputSignal::ScanMedia) => Signals::SCAN_MEDIA,
            Signal::Input(InputSignal::WriteEnable) => Signals::WRITE_ENABLE,
        }
    }
}

/// Physical access to the handshake lines for a particular board.
pub trait SignalPort {
    /// Drive an output line to a physical level (true is high).
    fn drive(&mut self, signal: OutputSignal, high: bool);

    /// Sample every input line with a single read of the hardware.  Returns
    /// the set of input lines which are physically high.
    fn sample(&mut self) -> Signals;
}

/// Logical state of all seven handshake signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandshakeState {
    asserted: Signals,
}

impl HandshakeState {
    pub fn is_asserted(&self, signal: impl Into<Signal>) -> bool {
        self.asserted.contains(signal.into().flag())
    }

    /// The set of asserted signals.
    pub fn asserted(&self) -> Signals {
        self.asserted
    }

    pub fn media_set(&self) -> bool {
        self.is_asserted(OutputSignal::MediaSet)
    }

    pub fn motor_on(&self) -> bool {
        self.is_asserted(OutputSignal::MotorOn)
    }

    pub fn ready(&self) -> bool {
        self.is_asserted(OutputSignal::Ready)
    }

    pub fn rw_media(&self) -> bool {
        self.is_asserted(OutputSignal::RwMedia)
    }

    pub fn stop_motor(&self) -> bool {
        self.is_asserted(InputSignal::StopMotor)
    }

    pub fn scan_media(&self) -> bool {
        self.is_asserted(InputSignal::ScanMedia)
    }

    pub fn write_enable(&self) -> bool {
        self.is_asserted(InputSignal::WriteEnable)
    }
}

/// The handshake lines, owning both the physical port and the logical
/// state.  Output state lives only here: nothing else may drive the output
/// lines.
pub struct HandshakeLines<P: SignalPort> {
    port: P,
    state: HandshakeState,
}

impl<P: SignalPort> HandshakeLines<P> {
    /// Takes the port and drives every output to deasserted.  Inputs read as
    /// deasserted until the first poll.
    pub fn new(port: P) -> Self {
        let mut lines = Self {
            port,
            state: HandshakeState::default(),
        };
        for signal in OutputSignal::ALL {
            lines.set_signal(signal, false);
        }
        lines
    }

    /// Assert or deassert an output signal, driving the line to the level
    /// its polarity requires.
    pub fn set_signal(&mut self, signal: OutputSignal, asserted: bool) {
        let signal_any = Signal::from(signal);
        self.state.asserted.set(signal_any.flag(), asserted);
        self.port
            .drive(signal, signal_any.polarity().level(asserted));
    }

    /// The last known logical state of a signal.  For inputs this is the
    /// value from the most recent [`Self::poll_inputs`].
    pub fn read_signal(&self, signal: impl Into<Signal>) -> bool {
        self.state.is_asserted(signal)
    }

    /// Refresh the logical state of all inputs from one sample of the port.
    pub fn poll_inputs(&mut self) {
        let levels = self.port.sample();
        for signal in InputSignal::ALL {
            let signal = Signal::from(signal);
            let high = levels.contains(signal.flag());
            self.state
                .asserted
                .set(signal.flag(), signal.polarity().asserted(high));
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    // Tests only.  Driving the port directly would leave the outputs out
    // of step with the logical state.
    #[cfg(test)]
    pub(crate) fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
