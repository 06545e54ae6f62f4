//! fdsdrive
//!
//! This implements a Famicom Disk System disk drive for the RAM Adapter.
//!
//! The drive can either serve a disk image stored in flash to the RAM
//! Adapter (`fdsdrive`), or record what the RAM Adapter writes to the disk
//! (`fdscapture`).
//!
//! The transfer core - handshake signals, double buffer, CRC, bit clock
//! engine and transfer controller - is platform independent, and builds and
//! tests on the host without any features.  The `firmware` feature, pulled in
//! by the `pico` and `pico2` board features, adds the embassy runtime.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![cfg_attr(not(test), no_std)]

// Provide some feature guidance when compiling the library.
#[cfg(all(feature = "firmware", not(any(feature = "pico", feature = "pico2"))))]
compile_error!("Either 'pico' or 'pico2' feature must be enabled for firmware builds");
#[cfg(all(feature = "pico", feature = "pico2"))]
compile_error!("Features 'pico' and 'pico2' cannot be enabled simultaneously");

// Must come first, so the logging macros are visible to every other module.
#[macro_use]
mod fmt;

// The transfer core.
pub mod buffer;
pub mod capture;
pub mod constants;
pub mod controller;
pub mod crc;
pub mod engine;
pub mod image;
pub mod signal;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "firmware"))]
pub mod test;

// The firmware.
#[cfg(feature = "firmware")]
mod drive;
#[cfg(feature = "firmware")]
pub mod entry;
#[cfg(feature = "firmware")]
mod infra;
#[cfg(feature = "firmware")]
mod task;
#[cfg(feature = "firmware")]
mod util;

#[cfg(feature = "firmware")]
pub use entry::{common_main, defmt_panic_handler, panic_handler};
#[cfg(feature = "firmware")]
pub use infra::gpio::{Gpio, PinConfig};

// Extra binary information that picotool can read.
#[cfg(feature = "firmware")]
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"fdsdrive by piers.rocks"),
    embassy_rp::binary_info::rp_program_description!(c"A Famicom Disk System drive emulator for the RAM Adapter, serving disk images from flash or capturing what the RAM Adapter writes."),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

// The RP235x boot ROM needs an image definition to boot the firmware.
#[cfg(feature = "pico2")]
#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: embassy_rp::block::ImageDef = embassy_rp::block::ImageDef::secure_exe();

// A note about Statics
//
// The bit clock engine is shared between the bit clock interrupt and the
// transfer task, so it is a plain static (infra::timer::ENGINE) and every
// field in it is an atomic.  It must never be put behind a Mutex: the
// interrupt cannot wait for a lock.  Instead each field has a single writer,
// as described in the buffer and engine modules.
//
// Everything else follows the usual rules:
//
// - Use StaticCell for statics that cannot be initialized at compile time,
//   such as the watchdog runner and the controller.  The capture RAM is a
//   ConstStaticCell, so it is built in place.
//
// - If you need mutable access from more than one task, you need a Mutex.
//   Generally use CriticalSectionRawMutex, as it works on multi-core
//   systems.  The status display static is the only one of these.
//
// The statics tend to be stored in the module that creates them.  So, for
// example, the STATUS_DISPLAY static is in infra::display.
