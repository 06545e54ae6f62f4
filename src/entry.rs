//! Start of day for the fdsdrive firmware binaries.
//!
//! Both binaries call [`common_main`], which sets up the hardware and the
//! tasks, then idles.  The direction decides what the drive does:
//! - [`Direction::Emit`] serves the disk image in flash to the RAM Adapter.
//! - [`Direction::Capture`] records what the RAM Adapter writes to RAM.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_executor::Spawner;
use embassy_rp::gpio::AnyPin;
use embassy_time::Timer;
use static_cell::{ConstStaticCell, StaticCell};

use crate::capture::RamCapture;
use crate::constants::{CAPTURE_CAPACITY, LOOP_LOG_INTERVAL};
use crate::controller::{TransferController, config};
use crate::drive::{DriveController, DriveStore, transfer_task};
use crate::image::ImageStore;
use crate::infra::display::{DisplayType, StatusDisplay, status_task, update_status};
use crate::infra::flash::FlashImage;
use crate::infra::gpio::{Gpio, PinConfig};
use crate::infra::timer::{ENGINE, start_bit_clock};
use crate::infra::watchdog::{create_watchdog, reboot_normal, watchdog_task};
use crate::storage::StorageError;
use crate::task::spawn_or_reboot;
use crate::types::Direction;
use crate::util::built::log_fw_info;

// Const, so the capture RAM is built in place rather than on the stack.
static CAPTURE: ConstStaticCell<RamCapture<CAPTURE_CAPACITY>> =
    ConstStaticCell::new(RamCapture::new());

static CONTROLLER: StaticCell<DriveController> = StaticCell::new();

/// Main entry point for the firmware.  Never returns.
pub async fn common_main(spawner: Spawner, direction: Direction) -> ! {
    // Initialize the RP2040/RP235x
    let p = embassy_rp::init(Default::default());

    // Log device and firmware information
    let bin_name = match direction {
        Direction::Emit => "fdsdrive",
        Direction::Capture => "fdscapture",
    };
    log_fw_info(bin_name);

    // Create the watchdog.  Do this early, so it is policing the tasks as
    // soon as they are spawned.
    let watchdog = create_watchdog(p.WATCHDOG);

    // Take all of the GPIOs.  Gpio hands them out by number.
    let pins: [AnyPin; 30] = [
        p.PIN_0.into(),
        p.PIN_1.into(),
        p.PIN_2.into(),
        p.PIN_3.into(),
        p.PIN_4.into(),
        p.PIN_5.into(),
        p.PIN_6.into(),
        p.PIN_7.into(),
        p.PIN_8.into(),
        p.PIN_9.into(),
        p.PIN_10.into(),
        p.PIN_11.into(),
        p.PIN_12.into(),
        p.PIN_13.into(),
        p.PIN_14.into(),
        p.PIN_15.into(),
        p.PIN_16.into(),
        p.PIN_17.into(),
        p.PIN_18.into(),
        p.PIN_19.into(),
        p.PIN_20.into(),
        p.PIN_21.into(),
        p.PIN_22.into(),
        p.PIN_23.into(),
        p.PIN_24.into(),
        p.PIN_25.into(),
        p.PIN_26.into(),
        p.PIN_27.into(),
        p.PIN_28.into(),
        p.PIN_29.into(),
    ];
    let mut gpio = Gpio::new(pins, PinConfig::default());

    // Start the status display, which begins in Init (LED on).
    StatusDisplay::create_static(gpio.take_status_display_pin());
    spawn_or_reboot(spawner.spawn(status_task(watchdog)), "Status Display");

    // Set up the store.
    let store = match direction {
        Direction::Emit => match FlashImage::new(p.FLASH).and_then(ImageStore::new) {
            Ok(image) => {
                info!("Disk image has {} side(s)", image.sides());
                DriveStore::Image(image)
            }
            Err(StorageError::OutOfRange) => {
                // Rebooting wouldn't bring an image.  Present an empty disk
                // instead, so the RAM Adapter still sees a drive.
                warn!("No disk image in flash, serving a blank disk");
                DriveStore::Capture(CAPTURE.take())
            }
            Err(e) => {
                error!("Failed to read disk image: {}", e);
                reboot_normal();
            }
        },
        Direction::Capture => DriveStore::Capture(CAPTURE.take()),
    };

    let transfer_config = match direction {
        Direction::Emit => config::emit(),
        Direction::Capture => config::capture(),
    };

    // The serial lines must exist before the bit clock starts ticking.
    let port = gpio.create_signal_port();
    gpio.install_bit_line();
    let controller = CONTROLLER.init(TransferController::new(
        port,
        &ENGINE,
        store,
        transfer_config,
    ));
    start_bit_clock(p.PWM_SLICE0);

    spawn_or_reboot(
        spawner.spawn(transfer_task(controller, watchdog)),
        "Transfer",
    );
    spawn_or_reboot(spawner.spawn(watchdog_task(watchdog)), "Watchdog");

    update_status(DisplayType::Idle);
    info!("{} ready", bin_name);

    loop {
        Timer::after(LOOP_LOG_INTERVAL).await;
        trace!("Main loop alive");
    }
}

/// Called by the binaries' defmt panic handler.
pub fn defmt_panic_handler() -> ! {
    error!("defmt panic");
    reboot_normal();
}

/// Called by the binaries' core panic handler.
pub fn panic_handler(info: &core::panic::PanicInfo) -> ! {
    match info.location() {
        Some(location) => error!(
            "Panic at {}:{}: {}",
            location.file(),
            location.line(),
            defmt::Display2Format(&info.message())
        ),
        None => error!("Panic: {}", defmt::Display2Format(&info.message())),
    }
    reboot_normal();
}
