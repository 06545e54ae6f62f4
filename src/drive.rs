//! The transfer task, which runs the [`TransferController`] against the
//! board's handshake lines and the bit clock engine.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_time::{Instant, Timer};

use crate::constants::{
    BUFFER_SIZE, CAPTURE_CAPACITY, LOOP_LOG_INTERVAL, TRANSFER_LOOP_TIMER,
    TRANSFER_WATCHDOG_TIMER,
};
use crate::capture::RamCapture;
use crate::controller::{TickStatus, TransferController};
use crate::image::ImageStore;
use crate::infra::display::{DisplayType, update_status};
use crate::infra::flash::FlashImage;
use crate::infra::gpio::RpSignalPort;
use crate::infra::watchdog::{TaskId, WatchdogType};
use crate::storage::{BlockStore, StorageError};
use crate::types::{BufferId, Direction, DiskSide};

/// The storage the drive was started with.  Embassy tasks can't be generic,
/// so the two firmware stores are wrapped in an enum.
pub enum DriveStore {
    /// A disk image in flash, for `fdsdrive`.
    Image(ImageStore<FlashImage>),

    /// RAM, for `fdscapture`.
    Capture(&'static mut RamCapture<CAPTURE_CAPACITY>),
}

impl BlockStore for DriveStore {
    fn begin(&mut self, side: DiskSide, direction: Direction) -> Result<(), StorageError> {
        match self {
            DriveStore::Image(store) => store.begin(side, direction),
            DriveStore::Capture(store) => store.begin(side, direction),
        }
    }

    fn fill(&mut self, id: BufferId, block: &mut [u8]) -> Result<(), StorageError> {
        match self {
            DriveStore::Image(store) => store.fill(id, block),
            DriveStore::Capture(store) => store.fill(id, block),
        }
    }

    fn drain(&mut self, id: BufferId, block: &[u8]) -> Result<(), StorageError> {
        match self {
            DriveStore::Image(store) => store.drain(id, block),
            DriveStore::Capture(store) => store.drain(id, block),
        }
    }
}

pub type DriveController = TransferController<'static, RpSignalPort, DriveStore, BUFFER_SIZE>;

/// Runs the controller forever.  The loop must come round at least once per
/// buffer's worth of bit-cells, or the engine will underrun.
#[embassy_executor::task]
pub async fn transfer_task(
    controller: &'static mut DriveController,
    watchdog: &'static WatchdogType,
) -> ! {
    let id = TaskId::Transfer;
    watchdog.register_task(&id, TRANSFER_WATCHDOG_TIMER).await;
    info!("Transfer task started");

    let mut last_log = Instant::now();
    let mut last_status = TickStatus::Idle;
    let mut errors_before_session = controller.status().storage_errors;

    loop {
        if last_log.elapsed() >= LOOP_LOG_INTERVAL {
            let status = controller.status();
            trace!(
                "Transfer task alive, sessions {}/{}, underruns {}",
                status.sessions_completed,
                status.sessions_started,
                status.engine.underruns
            );
            last_log = Instant::now();
        }

        watchdog.feed(&id).await;

        let errors_before_tick = controller.status().storage_errors;
        let tick_status = controller.tick();
        if tick_status != last_status {
            let status = controller.status();
            let display = match tick_status {
                TickStatus::Busy => {
                    errors_before_session = errors_before_tick;
                    DisplayType::Transferring
                }
                TickStatus::Idle if status.storage_errors > errors_before_session => {
                    warn!(
                        "Session ended with {} storage error(s), last {}",
                        status.storage_errors - errors_before_session,
                        status.last_error
                    );
                    DisplayType::Error
                }
                TickStatus::Idle => DisplayType::Idle,
            };
            update_status(display);
            last_status = tick_status;
        }

        Timer::after(TRANSFER_LOOP_TIMER).await;
    }
}
