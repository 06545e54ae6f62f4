//! RAM sink for capture sessions.
//!
//! Drained blocks are appended to a fixed capacity buffer.  What was
//! captured can be served back out through `fill`, so a capture can be
//! replayed to the host as a disk side.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use heapless::Vec;

use crate::storage::{BlockStore, StorageError};
use crate::types::{BufferId, Direction, DiskSide};

pub struct RamCapture<const CAP: usize> {
    data: Vec<u8, CAP>,
    read_offset: usize,

    // Set while the last begin failed.  Fills serve zeros and drains are
    // refused, so neither the previous session's data nor its read position
    // carry over.
    rejected: bool,
}

impl<const CAP: usize> Default for RamCapture<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> RamCapture<CAP> {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            read_offset: 0,
            rejected: false,
        }
    }

    /// Everything captured since the last capture session began.
    pub fn captured(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.read_offset = 0;
    }
}

impl<const CAP: usize> BlockStore for RamCapture<CAP> {
    fn begin(&mut self, side: DiskSide, direction: Direction) -> Result<(), StorageError> {
        self.rejected = true;
        if side != DiskSide::A {
            return Err(StorageError::OutOfRange);
        }
        self.rejected = false;
        match direction {
            Direction::Capture => self.clear(),
            Direction::Emit => self.read_offset = 0,
        }
        Ok(())
    }

    fn fill(&mut self, _id: BufferId, block: &mut [u8]) -> Result<(), StorageError> {
        let source: &[u8] = if self.rejected {
            &[]
        } else {
            self.data.get(self.read_offset..).unwrap_or(&[])
        };
        let len = source.len().min(block.len());
        block[..len].copy_from_slice(&source[..len]);
        block[len..].fill(0);
        self.read_offset += block.len();
        if len == 0 {
            return Err(StorageError::EndOfMedia);
        }
        Ok(())
    }

    fn drain(&mut self, _id: BufferId, block: &[u8]) -> Result<(), StorageError> {
        if self.rejected {
            return Err(StorageError::OutOfRange);
        }

        // Keep what fits, so a full capture still holds the start of the side.
        let room = CAP - self.data.len();
        let len = block.len().min(room);
        self.data
            .extend_from_slice(&block[..len])
            .map_err(|_| StorageError::Full)?;
        if len < block.len() {
            warn!("Capture full, dropped {} bytes", block.len() - len);
            return Err(StorageError::Full);
        }
        Ok(())
    }
}
