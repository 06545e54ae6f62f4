//! This module contains general types used across fdsdrive.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

/// Direction of a transfer, from the drive's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// The drive serialises bytes from storage onto the read data line.
    Emit,

    /// The drive samples the write data line and deserialises it into
    /// storage.
    Capture,
}

/// Order in which the bits of a byte go over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

impl BitOrder {
    /// Returns the wire value of bit number `index` (0 is first on the wire)
    /// of `byte`.
    #[inline(always)]
    pub fn bit(self, byte: u8, index: u8) -> bool {
        match self {
            BitOrder::LsbFirst => (byte >> index) & 1 != 0,
            BitOrder::MsbFirst => (byte << index) & 0x80 != 0,
        }
    }

    /// Places a received bit into `byte` at wire position `index`.
    #[inline(always)]
    pub fn place(self, byte: u8, index: u8, bit: bool) -> u8 {
        let mask = match self {
            BitOrder::LsbFirst => 1 << index,
            BitOrder::MsbFirst => 0x80 >> index,
        };
        if bit { byte | mask } else { byte & !mask }
    }
}

/// How the engine decides the gap is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GapPolicy {
    /// Data starts as soon as the gap countdown expires.
    Countdown,

    /// After the countdown, keep waiting until a 1 is sampled on the data
    /// line.  That 1 is the start-of-block mark and is not stored.
    CountdownThenMark,
}

/// One half of the double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferId {
    Zero = 0,
    One = 1,
}

impl BufferId {
    pub const ALL: [BufferId; 2] = [BufferId::Zero, BufferId::One];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn from_index(index: u8) -> Self {
        if index & 1 == 0 {
            BufferId::Zero
        } else {
            BufferId::One
        }
    }
}

/// A side of the disk.  Side A is 0, side B is 1, and multi-disk images
/// carry on from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiskSide(pub u8);

impl DiskSide {
    pub const A: DiskSide = DiskSide(0);
    pub const B: DiskSide = DiskSide(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_order_reads_wire_bits() {
        let byte = 0b1000_0010;
        assert!(!BitOrder::LsbFirst.bit(byte, 0));
        assert!(BitOrder::LsbFirst.bit(byte, 1));
        assert!(BitOrder::LsbFirst.bit(byte, 7));
        assert!(BitOrder::MsbFirst.bit(byte, 0));
        assert!(BitOrder::MsbFirst.bit(byte, 6));
        assert!(!BitOrder::MsbFirst.bit(byte, 7));
    }

    #[test]
    fn bit_order_assembles_bytes() {
        let wire = [true, false, true, true, false, false, false, false];
        let mut lsb = 0;
        let mut msb = 0;
        for (ii, bit) in wire.iter().enumerate() {
            lsb = BitOrder::LsbFirst.place(lsb, ii as u8, *bit);
            msb = BitOrder::MsbFirst.place(msb, ii as u8, *bit);
        }
        assert_eq!(lsb, 0b0000_1101);
        assert_eq!(msb, 0b1011_0000);
    }

    #[test]
    fn buffer_id_from_index() {
        assert_eq!(BufferId::from_index(3), BufferId::One);
        assert_eq!(BufferId::from_index(0).index(), 0);
    }
}
