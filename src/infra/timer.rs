//! The bit clock.
//!
//! A free running PWM slice wraps every [`BIT_CLOCK_TICK_DIVISOR`] system
//! clocks.  Its wrap interrupt runs at the highest priority and calls
//! [`BitClockEngine::tick`] with the serial lines, giving two ticks per
//! bit-cell.
//!
//! The slice's outputs aren't connected to any pins, it's only used as a
//! timer.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::pac;
use embassy_rp::peripherals::PWM_SLICE0;
use embassy_rp::pwm::{Config, Pwm};
use static_cell::StaticCell;

use crate::constants::{BIT_CLOCK_TICK_DIVISOR, BUFFER_SIZE, SYSTEM_CLOCK_HZ};
use crate::engine::BitClockEngine;
use crate::infra::gpio::SioBitLine;

/// The engine, shared between the bit clock interrupt and the transfer task.
pub static ENGINE: BitClockEngine<BUFFER_SIZE> = BitClockEngine::new();

// Holds the PWM driver, as dropping it would stop the slice.
static BIT_CLOCK: StaticCell<Pwm<'static>> = StaticCell::new();

const SLICE: usize = 0;

#[cfg(feature = "pico")]
const BIT_CLOCK_IRQ: interrupt::Interrupt = interrupt::PWM_IRQ_WRAP;
#[cfg(feature = "pico2")]
const BIT_CLOCK_IRQ: interrupt::Interrupt = interrupt::PWM_IRQ_WRAP_0;

/// Start the bit clock.  The serial lines must already have been installed
/// with [`crate::infra::gpio::Gpio::install_bit_line`].  The engine is
/// disarmed, so ticks do nothing until the transfer task arms it.
pub fn start_bit_clock(slice: PWM_SLICE0) {
    let mut config = Config::default();
    config.top = BIT_CLOCK_TICK_DIVISOR - 1;
    BIT_CLOCK.init(Pwm::new_free(slice, config));

    enable_wrap_irq();
    BIT_CLOCK_IRQ.set_priority(Priority::P0);
    unsafe { BIT_CLOCK_IRQ.enable() };

    info!(
        "Bit clock started, {} ticks/s",
        SYSTEM_CLOCK_HZ / BIT_CLOCK_TICK_DIVISOR as u32
    );
}

#[cfg(feature = "pico")]
fn enable_wrap_irq() {
    pac::PWM.inte().modify(|w| w.set_ch(SLICE, true));
}

#[cfg(feature = "pico2")]
fn enable_wrap_irq() {
    pac::PWM.irq0_inte().modify(|w| w.set_ch(SLICE, true));
}

#[inline(always)]
fn on_wrap() {
    pac::PWM.intr().write(|w| w.set_ch(SLICE, true));
    let mut line = SioBitLine::installed();
    ENGINE.tick(&mut line);
}

#[cfg(feature = "pico")]
#[interrupt]
fn PWM_IRQ_WRAP() {
    on_wrap();
}

#[cfg(feature = "pico2")]
#[interrupt]
fn PWM_IRQ_WRAP_0() {
    on_wrap();
}
