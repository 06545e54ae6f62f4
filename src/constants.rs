//! This module contains constants for fdsdrive.
//!
//! Timing constants which depend on the board (system clock, bit clock
//! divisor) are selected by the `pico` and `pico2` features.  The transfer
//! core itself only depends on the board-independent constants, so it can be
//! built and tested on the host.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use static_assertions::const_assert;

//
// Transfer core
//

/// Size of each half of the double buffer, in bytes.  One buffer's worth of
/// bit-cells is the slack the storage collaborator has to refill (or drain)
/// the buffer the engine has just left.
pub const BUFFER_SIZE: usize = 256;
const_assert!(BUFFER_SIZE.is_power_of_two());
const_assert!(BUFFER_SIZE <= u16::MAX as usize);

/// Length of the gap the drive presents before the first block, in
/// bit-cells.  The RAM Adapter needs this long to synchronise after the
/// motor comes up.
pub const DEFAULT_GAP_BIT_CELLS: u32 = 14000;

/// Timer ticks per bit-cell.  The engine toggles the clock on every tick, so
/// a low and a high half make up one bit-cell.
pub const TICKS_PER_BIT_CELL: u32 = 2;

/// The bit rate the RAM Adapter expects from the drive.  It tolerates about
/// 10% either way, as a real drive cannot spin at a constant speed.
pub const NOMINAL_BIT_RATE_HZ: u32 = 96_400;

/// Seed used for the CRC-16 accumulator when the start-of-block mark is
/// included in the checksum.
pub const CRC_SEED_REFERENCE: u16 = 0x0000;

/// Seed used by the FDS block convention, where the gap terminator (0x80) is
/// not part of the checksummed data.  Equivalent to [`CRC_SEED_REFERENCE`]
/// with the mark fed in first.
pub const CRC_SEED_FDS: u16 = 0x8000;

//
// Disk images
//

/// Size of the fwNES header some `.fds` images start with.
pub const FWNES_HEADER_LEN: usize = 16;

/// Magic at the start of a fwNES header.
pub const FWNES_MAGIC: [u8; 4] = *b"FDS\x1a";

/// Start of every disk side: the disk info block code followed by the
/// verification string.
pub const DISK_INFO_BLOCK_HEAD: [u8; 15] = *b"\x01*NINTENDO-HVC*";

/// Bytes per disk side in an `.fds` image.
pub const FDS_SIDE_LEN: u32 = 65500;

/// Maximum number of sides an image may hold.
pub const MAX_DISK_SIDES: u8 = 8;

/// Capacity of the RAM capture sink used by the `fdscapture` firmware - one
/// side's worth of data.
pub const CAPTURE_CAPACITY: usize = FDS_SIDE_LEN as usize;

//
// Bit clock timer calibration
//

/// System clock the bit clock timer runs from.
#[cfg(feature = "pico")]
pub const SYSTEM_CLOCK_HZ: u32 = 125_000_000;
#[cfg(feature = "pico2")]
pub const SYSTEM_CLOCK_HZ: u32 = 150_000_000;

/// System clocks between two bit clock timer ticks.
///
/// This is a calibration constant.  The nominal value is
/// `SYSTEM_CLOCK_HZ / (NOMINAL_BIT_RATE_HZ * TICKS_PER_BIT_CELL)`, trimmed
/// against a real RAM Adapter to allow for interrupt entry latency.  Change
/// it only with a scope on the read data line.
#[cfg(feature = "pico")]
pub const BIT_CLOCK_TICK_DIVISOR: u16 = 648;
#[cfg(feature = "pico2")]
pub const BIT_CLOCK_TICK_DIVISOR: u16 = 778;

// The divisor must keep the bit rate within the RAM Adapter's tolerance.
#[cfg(any(feature = "pico", feature = "pico2"))]
const_assert!(
    (SYSTEM_CLOCK_HZ / (BIT_CLOCK_TICK_DIVISOR as u32 * TICKS_PER_BIT_CELL))
        > NOMINAL_BIT_RATE_HZ * 9 / 10
);
#[cfg(any(feature = "pico", feature = "pico2"))]
const_assert!(
    (SYSTEM_CLOCK_HZ / (BIT_CLOCK_TICK_DIVISOR as u32 * TICKS_PER_BIT_CELL))
        < NOMINAL_BIT_RATE_HZ * 11 / 10
);

//
// Flash layout
//

/// Total flash size on the board.
#[cfg(feature = "pico")]
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
#[cfg(feature = "pico2")]
pub const FLASH_SIZE: usize = 4 * 1024 * 1024;

/// Offset into flash of the disk image region.  The firmware lives below
/// this; flash an image here with picotool.
#[cfg(feature = "firmware")]
pub const DISK_IMAGE_FLASH_OFFSET: u32 = 1024 * 1024;

/// Maximum size of the disk image region.
#[cfg(feature = "firmware")]
pub const DISK_IMAGE_FLASH_LEN: u32 =
    FWNES_HEADER_LEN as u32 + FDS_SIDE_LEN * MAX_DISK_SIDES as u32;
#[cfg(any(feature = "pico", feature = "pico2"))]
const_assert!(
    (DISK_IMAGE_FLASH_OFFSET + DISK_IMAGE_FLASH_LEN) as usize <= FLASH_SIZE
);

//
// Watchdog timers
//

/// Hardware watchdog timeout - the device resets if the watchdog runner
/// doesn't feed it at least this often.
#[cfg(feature = "firmware")]
pub const WATCHDOG_HW_TIMEOUT: embassy_time::Duration = embassy_time::Duration::from_secs(1);

/// How often the watchdog runner checks the policed tasks.
#[cfg(feature = "firmware")]
pub const WATCHDOG_CHECK_INTERVAL: embassy_time::Duration =
    embassy_time::Duration::from_millis(100);

/// How often the transfer task must feed the watchdog to prevent a reset.
#[cfg(feature = "firmware")]
pub const TRANSFER_WATCHDOG_TIMER: embassy_time::Duration = embassy_time::Duration::from_secs(1);

/// How often the status display must feed the watchdog to prevent a reset.
#[cfg(feature = "firmware")]
pub const STATUS_DISPLAY_WATCHDOG_TIMER: embassy_time::Duration =
    embassy_time::Duration::from_secs(1);

//
// Task main runner and related timers.
//

// Blink timer for the StatusDisplay transferring state.
#[cfg(feature = "firmware")]
pub const STATUS_DISPLAY_BLINK_TIMER: embassy_time::Duration =
    embassy_time::Duration::from_millis(100);

// Blink timer for the StatusDisplay error state.
#[cfg(feature = "firmware")]
pub const STATUS_DISPLAY_ERROR_BLINK_TIMER: embassy_time::Duration =
    embassy_time::Duration::from_millis(500);

// Timer for the StatusDisplay to pause between doing work.  Must be less
// than the minimum time the status LED can be on or off.
#[cfg(feature = "firmware")]
pub const STATUS_DISPLAY_TIMER: embassy_time::Duration = embassy_time::Duration::from_millis(50);

// How often we aim to log from our primary loops to prove they are still
// alive.
#[cfg(feature = "firmware")]
pub const LOOP_LOG_INTERVAL: embassy_time::Duration = embassy_time::Duration::from_secs(5);

/// How often the transfer task pauses so other tasks can run.  A buffer
/// lasts 256 * 8 bit-cells (~21ms) so this leaves plenty of slack for the
/// refill.
#[cfg(feature = "firmware")]
pub const TRANSFER_LOOP_TIMER: embassy_time::Duration = embassy_time::Duration::from_micros(500);
