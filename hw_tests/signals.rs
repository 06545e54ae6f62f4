//! test_signals
//!
//! Bench checks the handshake wiring.  Asserts and deasserts each drive
//! output in turn, logging what it did, and logs every change on the host
//! inputs.  Watch the outputs with a logic analyser, and pull the inputs
//! low by hand or from a RAM Adapter.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![no_std]
#![no_main]

use defmt::info;
use embassy_executor::Spawner;
use embassy_rp::gpio::AnyPin;
use embassy_time::{Duration, Instant, Timer};
use fdsdrive_rs::PinConfig;
use fdsdrive_rs::signal::{InputSignal, OutputSignal, Signal};
use fdsdrive_rs::test::{InputPin, OutputPin};
use {defmt_rtt as _, panic_probe as _};

const TOGGLE_INTERVAL: Duration = Duration::from_millis(2500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    info!("fdsdrive signal test");

    let p = embassy_rp::init(Default::default());
    let config = PinConfig::default().handshake_pins;

    let media_set: AnyPin = p.PIN_2.into();
    let motor_on: AnyPin = p.PIN_3.into();
    let ready: AnyPin = p.PIN_4.into();
    let rw_media: AnyPin = p.PIN_5.into();
    let mut outputs = [
        (OutputSignal::MediaSet, "media_set", media_set),
        (OutputSignal::MotorOn, "motor_on", motor_on),
        (OutputSignal::Ready, "ready", ready),
        (OutputSignal::RwMedia, "rw_media", rw_media),
    ]
    .map(|(signal, name, pin)| {
        OutputPin::new(name, pin, Signal::from(signal).polarity())
    });
    for (pin, signal) in outputs.iter().zip(OutputSignal::ALL) {
        assert_eq!(pin.num, config.output(signal));
    }

    let stop_motor: AnyPin = p.PIN_6.into();
    let scan_media: AnyPin = p.PIN_7.into();
    let write_enable: AnyPin = p.PIN_8.into();
    let mut inputs = [
        (InputSignal::StopMotor, "stop_motor", stop_motor),
        (InputSignal::ScanMedia, "scan_media", scan_media),
        (InputSignal::WriteEnable, "write_enable", write_enable),
    ]
    .map(|(signal, name, pin)| InputPin::new(name, pin, Signal::from(signal).polarity()));
    for (pin, signal) in inputs.iter().zip(InputSignal::ALL) {
        assert_eq!(pin.num, config.input(signal));
    }

    let mut next = 0;
    let mut last_toggle = Instant::now();
    loop {
        if last_toggle.elapsed() >= TOGGLE_INTERVAL {
            let pin = &mut outputs[next];
            pin.toggle();
            info!(
                "Output {} (pin {}) asserted {}",
                pin.name,
                pin.num,
                pin.is_asserted()
            );
            next = (next + 1) % outputs.len();
            last_toggle = Instant::now();
        }

        for pin in inputs.iter_mut() {
            if pin.has_changed() {
                info!(
                    "Input {} (pin {}) asserted {}",
                    pin.name,
                    pin.num,
                    pin.is_asserted()
                );
            }
        }

        Timer::after(POLL_INTERVAL).await;
    }
}
