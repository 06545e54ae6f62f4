//! Handles displaying status of the drive on the LED.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::cell::RefCell;
use embassy_rp::gpio::{AnyPin, Level, Output};
use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use embassy_time::{Duration, Instant, Timer};

use crate::constants::{
    STATUS_DISPLAY_BLINK_TIMER, STATUS_DISPLAY_ERROR_BLINK_TIMER, STATUS_DISPLAY_TIMER,
    STATUS_DISPLAY_WATCHDOG_TIMER,
};
use crate::infra::watchdog::{TaskId, WatchdogType};

// The STATUS_DISPLAY static is used to store the StatusDisplay object.  It
// is updated by the transfer task and driven by the status task, so we need
// a Mutex and a RefCell (the latter for mutability).
pub static STATUS_DISPLAY: Mutex<CriticalSectionRawMutex, RefCell<Option<StatusDisplay>>> =
    Mutex::new(RefCell::new(None));

/// Status display types
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DisplayType {
    /// Starting up, LED is fully on
    Init,
    /// No session running, LED is fully off
    Idle,
    /// A session is running, LED blinks quickly
    Transferring,
    /// The last session hit storage errors, LED blinks slowly
    Error,
}

impl DisplayType {
    fn blink_period(self) -> Option<Duration> {
        match self {
            DisplayType::Init | DisplayType::Idle => None,
            DisplayType::Transferring => Some(STATUS_DISPLAY_BLINK_TIMER),
            DisplayType::Error => Some(STATUS_DISPLAY_ERROR_BLINK_TIMER),
        }
    }
}

/// Status display management
pub struct StatusDisplay {
    led: Output<'static>,
    current_status: DisplayType,
    last_toggle: Instant,
    led_state: bool,
}

impl StatusDisplay {
    /// Creates a new StatusDisplay with the specified LED pin and stores it
    /// in the STATUS_DISPLAY static.  The LED starts on (Init).
    pub fn create_static(led_pin: AnyPin) {
        let status_display = Self {
            led: Output::new(led_pin, Level::High),
            current_status: DisplayType::Init,
            last_toggle: Instant::now(),
            led_state: true,
        };

        STATUS_DISPLAY.lock(|d| {
            *d.borrow_mut() = Some(status_display);
        });
    }

    /// Change what the LED displays.
    pub fn update(&mut self, status: DisplayType) {
        if self.current_status != status {
            debug!("Status display {} -> {}", self.current_status, status);
            self.current_status = status;
            match status {
                DisplayType::Init => self.set_led(true),
                DisplayType::Idle => self.set_led(false),
                _ => (),
            }
        }
    }

    /// Perform an action on the status display if one is required.  Doesn't
    /// block.  Returns the maximum Duration until this should next be
    /// called.
    pub fn do_work(&mut self) -> Duration {
        let Some(period) = self.current_status.blink_period() else {
            return STATUS_DISPLAY_TIMER;
        };

        let elapsed = Instant::now().duration_since(self.last_toggle);
        if elapsed >= period {
            self.set_led(!self.led_state);
            period
        } else {
            period - elapsed
        }
    }

    fn set_led(&mut self, on: bool) {
        self.led.set_level(Level::from(on));
        self.led_state = on;
        self.last_toggle = Instant::now();
    }
}

/// Runs the status display task.
#[embassy_executor::task]
pub async fn status_task(watchdog: &'static WatchdogType) -> ! {
    let id = TaskId::Display;
    watchdog
        .register_task(&id, STATUS_DISPLAY_WATCHDOG_TIMER)
        .await;

    loop {
        watchdog.feed(&id).await;

        let next_update = STATUS_DISPLAY.lock(|d| {
            d.borrow_mut()
                .as_mut()
                .map_or(STATUS_DISPLAY_TIMER, StatusDisplay::do_work)
        });

        // Wake for the next blink, but also often enough to pick up status
        // changes.
        Timer::after(Duration::min(next_update, STATUS_DISPLAY_TIMER)).await;
    }
}

/// Helper function to update the status
pub fn update_status(display: DisplayType) {
    STATUS_DISPLAY.lock(|d| {
        if let Some(d) = d.borrow_mut().as_mut() {
            d.update(display);
        }
    });
}
