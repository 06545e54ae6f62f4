//! GPIO wrappers for the hardware test binaries.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pin, Pull};

use crate::signal::Polarity;

/// A handshake output, named so the test can log it.
pub struct OutputPin {
    pub name: &'static str,
    pub num: u8,
    polarity: Polarity,
    pin: Output<'static>,
}

impl OutputPin {
    /// Creates the output deasserted.
    #[must_use]
    pub fn new(name: &'static str, pin: AnyPin, polarity: Polarity) -> Self {
        let num = pin.pin();
        let output = Output::new(pin, Level::from(polarity.level(false)));
        OutputPin {
            name,
            num,
            polarity,
            pin: output,
        }
    }

    pub fn set_asserted(&mut self, asserted: bool) {
        self.pin
            .set_level(Level::from(self.polarity.level(asserted)));
    }

    #[must_use]
    pub fn is_asserted(&self) -> bool {
        self.pin.is_set_high() == self.polarity.level(true)
    }

    pub fn toggle(&mut self) {
        let asserted = self.is_asserted();
        self.set_asserted(!asserted);
    }
}

/// A handshake input which remembers its last level, so changes can be
/// logged.
pub struct InputPin {
    pub name: &'static str,
    pub num: u8,
    polarity: Polarity,
    pin: Input<'static>,
    last_level: Level,
}

impl InputPin {
    #[must_use]
    pub fn new(name: &'static str, pin: AnyPin, polarity: Polarity) -> Self {
        let num = pin.pin();
        let input = Input::new(pin, Pull::Up);
        let last_level = input.get_level();
        InputPin {
            name,
            num,
            polarity,
            pin: input,
            last_level,
        }
    }

    pub fn has_changed(&mut self) -> bool {
        let level = self.pin.get_level();
        if level == self.last_level {
            false
        } else {
            self.last_level = level;
            true
        }
    }

    #[must_use]
    pub fn is_asserted(&self) -> bool {
        (self.last_level == Level::High) == self.polarity.level(true)
    }
}
