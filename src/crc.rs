//! CRC-16 accumulator used for FDS blocks.
//!
//! This is the reflected CCITT polynomial (0x8408), fed one bit at a time,
//! least significant bit first.  Data bits enter at the top of the register,
//! so feeding a block followed by two zero bytes yields the checksum, and
//! feeding a block followed by its checksum (low byte first) yields zero.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

/// The reflected CCITT polynomial.
pub const CRC16_POLY: u16 = 0x8408;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    pub const fn new(seed: u16) -> Self {
        Self { value: seed }
    }

    pub const fn value(&self) -> u16 {
        self.value
    }

    pub fn reset(&mut self, seed: u16) {
        self.value = seed;
    }

    /// Feed one byte, LSB first.
    #[inline(always)]
    pub fn update(&mut self, byte: u8) {
        self.value = Self::step(self.value, byte);
    }

    /// One byte of the recurrence, usable on a bare register value (the
    /// engine keeps its accumulator in an atomic).
    #[inline(always)]
    pub const fn step(mut crc: u16, byte: u8) -> u16 {
        let mut bit = 0;
        while bit < 8 {
            let carry = crc & 1;
            crc >>= 1;
            if carry != 0 {
                crc ^= CRC16_POLY;
            }
            if (byte >> bit) & 1 != 0 {
                crc ^= 0x8000;
            }
            bit += 1;
        }
        crc
    }

    pub fn update_slice(&mut self, data: &[u8]) {
        for byte in data {
            self.update(*byte);
        }
    }

    /// Checksum of a block as stored on disk: the block followed by two
    /// implicit zero bytes.
    pub fn checksum(seed: u16, block: &[u8]) -> u16 {
        let mut crc = Self::new(seed);
        crc.update_slice(block);
        crc.update_slice(&[0, 0]);
        crc.value()
    }

    /// Check a block which ends with its checksum, low byte first.
    pub fn verify(seed: u16, block_with_crc: &[u8]) -> bool {
        if block_with_crc.len() < 2 {
            return false;
        }
        let mut crc = Self::new(seed);
        crc.update_slice(block_with_crc);
        crc.value() == 0
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new(crate::constants::CRC_SEED_REFERENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CRC_SEED_FDS, CRC_SEED_REFERENCE, DISK_INFO_BLOCK_HEAD};

    const DISK_INFO_HEAD: &[u8] = &DISK_INFO_BLOCK_HEAD;

    #[test]
    fn zero_byte_golden_vector() {
        let mut crc = Crc16::new(CRC_SEED_REFERENCE);
        crc.update(0x00);
        assert_eq!(crc.value(), 0x0000);
    }

    #[test]
    fn single_bit_golden_vectors() {
        let mut crc = Crc16::new(0);
        crc.update(0x01);
        assert_eq!(crc.value(), 0x0100);

        crc.reset(0);
        crc.update(0x80);
        assert_eq!(crc.value(), 0x8000);
    }

    #[test]
    fn check_string_golden_vector() {
        let mut crc = Crc16::default();
        crc.update_slice(b"123456789");
        assert_eq!(crc.value(), 0x507f);
    }

    #[test]
    fn fds_block_checksum() {
        assert_eq!(Crc16::checksum(CRC_SEED_FDS, DISK_INFO_HEAD), 0xe91d);
    }

    #[test]
    fn fds_seed_matches_reference_seed_with_mark() {
        let mut with_mark = [0u8; 16];
        with_mark[0] = 0x80;
        with_mark[1..].copy_from_slice(DISK_INFO_HEAD);
        assert_eq!(
            Crc16::checksum(CRC_SEED_REFERENCE, &with_mark),
            Crc16::checksum(CRC_SEED_FDS, DISK_INFO_HEAD)
        );
    }

    #[test]
    fn verify_accepts_appended_checksum() {
        let crc = Crc16::checksum(CRC_SEED_FDS, DISK_INFO_HEAD);
        let mut block = [0u8; 17];
        block[..15].copy_from_slice(DISK_INFO_HEAD);
        block[15] = crc as u8;
        block[16] = (crc >> 8) as u8;
        assert!(Crc16::verify(CRC_SEED_FDS, &block));

        block[3] ^= 0x10;
        assert!(!Crc16::verify(CRC_SEED_FDS, &block));
    }

    #[test]
    fn step_matches_update() {
        let mut crc = Crc16::new(0x1234);
        crc.update(0xa5);
        assert_eq!(crc.value(), Crc16::step(0x1234, 0xa5));
    }
}
