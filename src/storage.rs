//! This file defines the BlockStore trait, the storage collaborator the
//! transfer controller refills and drains the double buffer through.
//!
//! Stores are called from the main loop only, never from the bit clock
//! interrupt.  Blocks are sequential: each `fill` returns the next block of
//! the session and each `drain` appends the next block, whichever buffer
//! the block is destined for or came from.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::types::{BufferId, Direction, DiskSide};

/// Defines errors for BlockStore implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The backing medium failed to read or write
    Io,
    /// Nothing left to read on this side
    EndOfMedia,
    /// No room left to store captured data
    Full,
    /// Side or offset outside the medium
    OutOfRange,
    /// This store does not accept writes
    ReadOnly,
}

/// Defines the interface between the transfer controller and whatever holds
/// the disk data.
pub trait BlockStore {
    /// Rewind to the start of `side`, ready for a session in `direction`.
    /// Called once before each session, before any fill or drain.
    fn begin(&mut self, side: DiskSide, direction: Direction) -> Result<(), StorageError>;

    /// Write the next block of the session into `block`.  Anything not
    /// covered by the medium must be zero filled.
    ///
    /// # Arguments
    /// * `id` - The buffer the block will be loaded into
    /// * `block` - Destination, one buffer in length
    fn fill(&mut self, id: BufferId, block: &mut [u8]) -> Result<(), StorageError>;

    /// Persist the next block of the session.  `block` may be shorter than a
    /// buffer when a session ends part way through one.
    ///
    /// # Arguments
    /// * `id` - The buffer the block was captured into
    /// * `block` - The captured bytes
    fn drain(&mut self, id: BufferId, block: &[u8]) -> Result<(), StorageError>;
}

impl<T: BlockStore + ?Sized> BlockStore for &mut T {
    fn begin(&mut self, side: DiskSide, direction: Direction) -> Result<(), StorageError> {
        (**self).begin(side, direction)
    }

    fn fill(&mut self, id: BufferId, block: &mut [u8]) -> Result<(), StorageError> {
        (**self).fill(id, block)
    }

    fn drain(&mut self, id: BufferId, block: &[u8]) -> Result<(), StorageError> {
        (**self).drain(id, block)
    }
}
