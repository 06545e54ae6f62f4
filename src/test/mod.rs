//! Test objects for fdsdrive.
//!
//! `mock` holds the doubles the host tests drive the transfer core with.
//! `pins` holds the GPIO wrappers used by the hardware test binaries.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#[cfg(test)]
mod mock;
#[cfg(test)]
pub use mock::{MemoryStore, MockLine, MockPort};

#[cfg(feature = "firmware")]
mod pins;
#[cfg(feature = "firmware")]
pub use pins::{InputPin, OutputPin};
