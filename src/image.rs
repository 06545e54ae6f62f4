//! Disk image source for emit sessions.
//!
//! Serves the raw bytes of one side of an `.fds` image, block by block, from
//! the start of the side.  Images may carry a 16 byte fwNES header, which is
//! detected and skipped.  Sides are [`FDS_SIDE_LEN`] bytes each, back to
//! back.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::constants::{
    DISK_INFO_BLOCK_HEAD, FDS_SIDE_LEN, FWNES_HEADER_LEN, FWNES_MAGIC, MAX_DISK_SIDES,
};
use crate::storage::{BlockStore, StorageError};
use crate::types::{BufferId, Direction, DiskSide};

/// Random access to the bytes of a stored image.
pub trait ImageReader {
    /// Total length of the image, including any header.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` from `offset`.  The caller never reads past `len()`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;
}

impl ImageReader for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let source = self
            .get(offset..offset + buf.len())
            .ok_or(StorageError::OutOfRange)?;
        buf.copy_from_slice(source);
        Ok(())
    }
}

/// How many bytes at the start of `reader` are disk image.
///
/// For a medium bigger than the image it holds, such as a flash region.
/// With a fwNES header this is the header plus the sides it declares.
/// Without one, sides are counted while each starts with a disk info block,
/// so erased space after the last side isn't served as more sides.
pub fn image_len<R: ImageReader>(reader: &mut R) -> Result<usize, StorageError> {
    let side_len = FDS_SIDE_LEN as usize;
    let mut head = [0; FWNES_HEADER_LEN];
    if reader.len() < head.len() {
        return Ok(0);
    }

    reader.read(0, &mut head)?;
    if head[..FWNES_MAGIC.len()] == FWNES_MAGIC {
        let sides = head[FWNES_MAGIC.len()].min(MAX_DISK_SIDES) as usize;
        return Ok((FWNES_HEADER_LEN + sides * side_len).min(reader.len()));
    }

    let mut sides = 0;
    while sides < MAX_DISK_SIDES as usize {
        let start = sides * side_len;
        if start + DISK_INFO_BLOCK_HEAD.len() > reader.len() {
            break;
        }
        let mut head = [0; DISK_INFO_BLOCK_HEAD.len()];
        reader.read(start, &mut head)?;
        if head != DISK_INFO_BLOCK_HEAD {
            break;
        }
        sides += 1;
    }
    Ok((sides * side_len).min(reader.len()))
}

pub struct ImageStore<R: ImageReader> {
    reader: R,

    // Offset of side A within the image
    data_offset: usize,
    sides: u8,

    // Offset of the current side within the image, and how far into it the
    // session has got
    side_start: usize,
    offset: usize,
}

impl<R: ImageReader> ImageStore<R> {
    /// Inspect the image and work out where its sides are.  An image without
    /// a fwNES header holds as many sides as its length covers.
    pub fn new(mut reader: R) -> Result<Self, StorageError> {
        let mut data_offset = 0;
        let mut sides = None;

        if reader.len() >= FWNES_HEADER_LEN {
            let mut header = [0; FWNES_HEADER_LEN];
            reader.read(0, &mut header)?;
            if header[..FWNES_MAGIC.len()] == FWNES_MAGIC {
                data_offset = FWNES_HEADER_LEN;
                sides = Some(header[FWNES_MAGIC.len()]);
                debug!("fwNES header, {} side(s)", header[FWNES_MAGIC.len()]);
            }
        }

        let sides = match sides {
            Some(sides) => sides.min(MAX_DISK_SIDES),
            None => {
                let len = reader.len() - data_offset;
                len.div_ceil(FDS_SIDE_LEN as usize)
                    .min(MAX_DISK_SIDES as usize) as u8
            }
        };
        if sides == 0 {
            return Err(StorageError::OutOfRange);
        }

        Ok(Self {
            reader,
            data_offset,
            sides,
            side_start: data_offset,
            offset: FDS_SIDE_LEN as usize,
        })
    }

    pub fn sides(&self) -> u8 {
        self.sides
    }

    /// Bytes served so far this session.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the current session has run off the end of its side.
    pub fn is_exhausted(&self) -> bool {
        self.offset >= FDS_SIDE_LEN as usize
    }
}

impl<R: ImageReader> BlockStore for ImageStore<R> {
    fn begin(&mut self, side: DiskSide, direction: Direction) -> Result<(), StorageError> {
        // Until a side is accepted, serve nothing but zeros.
        self.offset = FDS_SIDE_LEN as usize;

        if direction != Direction::Emit {
            return Err(StorageError::ReadOnly);
        }
        if side.0 >= self.sides {
            return Err(StorageError::OutOfRange);
        }
        self.side_start = self.data_offset + side.0 as usize * FDS_SIDE_LEN as usize;
        self.offset = 0;
        Ok(())
    }

    fn fill(&mut self, _id: BufferId, block: &mut [u8]) -> Result<(), StorageError> {
        let side_left = (FDS_SIDE_LEN as usize).saturating_sub(self.offset);
        let start = self.side_start + self.offset;
        let image_left = self.reader.len().saturating_sub(start);
        let len = block.len().min(side_left).min(image_left);

        block[len..].fill(0);
        self.offset += block.len();
        if len == 0 {
            return Err(StorageError::EndOfMedia);
        }
        self.reader.read(start, &mut block[..len])
    }

    fn drain(&mut self, _id: BufferId, _block: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDE: usize = FDS_SIDE_LEN as usize;

    // Two sides, each byte set to its side number plus one, with or without
    // the fwNES header.
    fn image(header: bool) -> Vec<u8> {
        let mut image = Vec::new();
        if header {
            image.extend_from_slice(&FWNES_MAGIC);
            image.push(2);
            image.resize(FWNES_HEADER_LEN, 0);
        }
        image.resize(image.len() + SIDE, 1);
        image.resize(image.len() + SIDE, 2);
        image
    }

    #[test]
    fn header_detected_and_skipped() {
        let image = image(true);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        assert_eq!(store.sides(), 2);

        store.begin(DiskSide::A, Direction::Emit).unwrap();
        let mut block = [0xff; 256];
        store.fill(BufferId::Zero, &mut block).unwrap();
        assert!(block.iter().all(|b| *b == 1));
    }

    #[test]
    fn headerless_image_sides_from_length() {
        let image = image(false);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        assert_eq!(store.sides(), 2);

        store.begin(DiskSide::B, Direction::Emit).unwrap();
        let mut block = [0; 256];
        store.fill(BufferId::Zero, &mut block).unwrap();
        assert!(block.iter().all(|b| *b == 2));
    }

    #[test]
    fn blocks_are_sequential() {
        let data: Vec<u8> = (0..600u32).map(|ii| ii as u8).collect();
        let mut store = ImageStore::new(data.as_slice()).unwrap();
        store.begin(DiskSide::A, Direction::Emit).unwrap();

        let mut block = [0; 256];
        store.fill(BufferId::Zero, &mut block).unwrap();
        assert_eq!(block[0], 0);
        store.fill(BufferId::One, &mut block).unwrap();
        assert_eq!(block[0], 0);
        assert_eq!(block[1], 1);
        assert_eq!(store.offset(), 512);

        // 88 bytes left, then zeros.
        store.fill(BufferId::Zero, &mut block).unwrap();
        assert_eq!(block[87], (599 % 256) as u8);
        assert!(block[88..].iter().all(|b| *b == 0));

        assert_eq!(
            store.fill(BufferId::One, &mut block),
            Err(StorageError::EndOfMedia)
        );
        assert!(block.iter().all(|b| *b == 0));
    }

    #[test]
    fn side_end_pads_without_reading_next_side() {
        let image = image(true);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        store.begin(DiskSide::A, Direction::Emit).unwrap();

        let mut block = [0; 256];
        for _ in 0..SIDE / 256 {
            store.fill(BufferId::Zero, &mut block).unwrap();
        }
        store.fill(BufferId::Zero, &mut block).unwrap();
        let tail = SIDE % 256;
        assert!(block[..tail].iter().all(|b| *b == 1));
        assert!(block[tail..].iter().all(|b| *b == 0));
        assert_eq!(
            store.fill(BufferId::Zero, &mut block),
            Err(StorageError::EndOfMedia)
        );
    }

    #[test]
    fn begin_rewinds() {
        let image = image(false);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        let mut block = [0; 256];
        store.begin(DiskSide::A, Direction::Emit).unwrap();
        store.fill(BufferId::Zero, &mut block).unwrap();
        store.begin(DiskSide::A, Direction::Emit).unwrap();
        assert_eq!(store.offset(), 0);
    }

    #[test]
    fn rejects_missing_side_and_capture() {
        let image = image(true);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        assert_eq!(
            store.begin(DiskSide(2), Direction::Emit),
            Err(StorageError::OutOfRange)
        );
        assert_eq!(
            store.begin(DiskSide::A, Direction::Capture),
            Err(StorageError::ReadOnly)
        );
        assert_eq!(
            store.drain(BufferId::Zero, &[0; 4]),
            Err(StorageError::ReadOnly)
        );
    }

    #[test]
    fn empty_image_rejected() {
        let empty: &[u8] = &[];
        assert!(ImageStore::new(empty).is_err());
    }

    #[test]
    fn failed_begin_serves_zeros() {
        let image = image(true);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        let mut block = [0; 256];
        store.begin(DiskSide::A, Direction::Emit).unwrap();
        store.fill(BufferId::Zero, &mut block).unwrap();
        store.fill(BufferId::One, &mut block).unwrap();

        assert!(store.begin(DiskSide(2), Direction::Emit).is_err());
        assert!(store.is_exhausted());
        block.fill(0xff);
        assert_eq!(
            store.fill(BufferId::Zero, &mut block),
            Err(StorageError::EndOfMedia)
        );
        assert!(block.iter().all(|b| *b == 0));
    }

    #[test]
    fn nothing_served_before_first_begin() {
        let image = image(false);
        let mut store = ImageStore::new(image.as_slice()).unwrap();
        let mut block = [0xff; 16];
        assert_eq!(
            store.fill(BufferId::Zero, &mut block),
            Err(StorageError::EndOfMedia)
        );
        assert_eq!(block, [0; 16]);
    }

    // Reads as all zeros, however long it claims to be.
    struct Blank(usize);

    impl ImageReader for Blank {
        fn len(&self) -> usize {
            self.0
        }

        fn read(&mut self, _offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
            buf.fill(0);
            Ok(())
        }
    }

    #[test]
    fn huge_headerless_image_capped_at_max_sides() {
        // 256 sides would wrap to 0 if counted in a u8.
        let store = ImageStore::new(Blank(256 * SIDE)).unwrap();
        assert_eq!(store.sides(), MAX_DISK_SIDES);
        let store = ImageStore::new(Blank(257 * SIDE)).unwrap();
        assert_eq!(store.sides(), MAX_DISK_SIDES);
    }

    // Erased flash after the image.
    fn in_region(image: &[u8], region: usize) -> Vec<u8> {
        let mut data = image.to_vec();
        data.resize(region, 0xff);
        data
    }

    #[test]
    fn image_len_from_fwnes_header() {
        let region = in_region(&image(true), 4 * SIDE);
        assert_eq!(
            image_len(&mut region.as_slice()),
            Ok(FWNES_HEADER_LEN + 2 * SIDE)
        );
    }

    #[test]
    fn image_len_counts_sides_with_disk_info_blocks() {
        let mut image = Vec::new();
        for side in 0..2 {
            let start = side * SIDE;
            image.resize(start + SIDE, 0);
            image[start..start + DISK_INFO_BLOCK_HEAD.len()]
                .copy_from_slice(&DISK_INFO_BLOCK_HEAD);
        }
        let region = in_region(&image, 4 * SIDE);
        let len = image_len(&mut region.as_slice()).unwrap();
        assert_eq!(len, 2 * SIDE);

        let store = ImageStore::new(&region[..len]).unwrap();
        assert_eq!(store.sides(), 2);
    }

    #[test]
    fn image_len_zero_for_erased_region() {
        let region = vec![0xff; 2 * SIDE];
        assert_eq!(image_len(&mut region.as_slice()), Ok(0));
        let mut short: &[u8] = &[0; 8];
        assert_eq!(image_len(&mut short), Ok(0));
    }
}
