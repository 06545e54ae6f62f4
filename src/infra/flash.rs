//! Reads the disk image flashed to the reserved region at
//! [`DISK_IMAGE_FLASH_OFFSET`].

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::peripherals::FLASH;

use crate::constants::{DISK_IMAGE_FLASH_LEN, DISK_IMAGE_FLASH_OFFSET, FLASH_SIZE};
use crate::image::{ImageReader, image_len};
use crate::storage::StorageError;

pub struct FlashImage {
    flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>,

    // How much of the region holds the image, rather than erased flash
    len: usize,
}

impl FlashImage {
    /// Opens the region and works out how much of it the image covers.
    pub fn new(p_flash: FLASH) -> Result<Self, StorageError> {
        let mut image = Self {
            flash: Flash::new_blocking(p_flash),
            len: DISK_IMAGE_FLASH_LEN as usize,
        };
        image.len = image_len(&mut image)?;
        debug!("Disk image is {} bytes", image.len);
        Ok(image)
    }
}

impl ImageReader for FlashImage {
    fn len(&self) -> usize {
        self.len
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.flash
            .blocking_read(DISK_IMAGE_FLASH_OFFSET + offset as u32, buf)
            .map_err(|e| {
                warn!("Flash read at 0x{:x} failed: {}", offset, e);
                StorageError::Io
            })
    }
}
