//! Wire codec for the 5-byte module control frame.

#![no_std]

use crc::{Crc, CRC_8_SMBUS};

/// Length of a frame on the wire.
pub const FRAME_LEN: usize = 5;

/// Marker byte identifying the start of a frame.
pub const SYNC: u8 = 0xd4;

// CRC-8/SMBUS: poly 0x07, init 0x00, no reflection,
// xorout 0x00. The trailing frame byte is this
// checksum of the four bytes before it.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

const ADDRESS_MASK: u16 = 0x3ff;
const POSITION_MASK: u16 = 0xfff;

/// Compute the frame checksum of `bytes`.
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

/// Role of a packet on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    /// Instruction from the host to a module.
    Command,
    /// Status reported back by a module.
    Response,
}

impl PacketKind {
    const fn bit(self) -> u8 {
        match self {
            Self::Command => 1,
            Self::Response => 0,
        }
    }

    const fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Self::Response
        } else {
            Self::Command
        }
    }
}

/// Motion state reported by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleStatus {
    Idle,
    Moving,
}

impl ModuleStatus {
    const fn bit(self) -> u8 {
        match self {
            Self::Moving => 1,
            Self::Idle => 0,
        }
    }

    const fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Self::Idle
        } else {
            Self::Moving
        }
    }
}

/// A control packet exchanged with an addressable
/// module.
///
/// `address` occupies 10 bits on the wire and
/// `position` 12; `encode` truncates out-of-range
/// values to the field width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    pub address: u16,
    pub position: u16,
    pub kind: PacketKind,
    pub status: ModuleStatus,
    /// Authoritative only on packets produced by
    /// `decode`: whether the frame passed sync-byte
    /// and checksum verification.
    pub valid: bool,
}

impl Packet {
    pub const fn new(
        address: u16,
        position: u16,
        kind: PacketKind,
        status: ModuleStatus,
    ) -> Self {
        Self {
            address,
            position,
            kind,
            status,
            valid: true,
        }
    }

    /// Instruction sending a module to `position`.
    pub const fn command(address: u16, position: u16) -> Self {
        Self::new(address, position, PacketKind::Command, ModuleStatus::Idle)
    }

    /// Status frame as reported by a module.
    pub const fn response(address: u16, position: u16, status: ModuleStatus) -> Self {
        Self::new(address, position, PacketKind::Response, status)
    }

    /// Render the packet to its wire frame.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let address = self.address & ADDRESS_MASK;
        let position = self.position & POSITION_MASK;

        let mut raw = [0; FRAME_LEN];
        raw[0] = SYNC;
        raw[1] = (address >> 2) as u8;
        raw[2] = ((address & 0x3) << 6) as u8 | (position >> 6) as u8;
        raw[3] = ((position & 0x3f) << 2) as u8 | self.kind.bit() << 1 | self.status.bit();
        raw[4] = checksum(&raw[..4]);
        raw
    }

    /// Construct a packet from a received frame.
    ///
    /// Never fails: the fields are taken from the raw
    /// bits unconditionally, and `valid` records
    /// whether the sync byte and checksum held up.
    pub fn decode(raw: &[u8; FRAME_LEN]) -> Self {
        Self {
            address: (raw[1] as u16) << 2 | (raw[2] >> 6) as u16,
            position: ((raw[2] & 0x3f) as u16) << 6 | (raw[3] >> 2) as u16,
            kind: PacketKind::from_bit((raw[3] >> 1) & 1),
            status: ModuleStatus::from_bit(raw[3] & 1),
            valid: raw[0] == SYNC && checksum(&raw[..4]) == raw[4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod codec {
        use super::*;

        #[test]
        fn command_frame() {
            let raw = Packet::command(0, 0).encode();

            assert_eq!(raw, [0xd4, 0x00, 0x00, 0x02, 0x9b]);
        }

        #[test]
        fn field_packing() {
            let raw = Packet::response(0x3ff, 0xfff, ModuleStatus::Moving).encode();

            assert_eq!(raw[..4], [0xd4, 0xff, 0xff, 0xfd]);
            assert_eq!(raw[4], checksum(&raw[..4]));
        }

        #[test]
        fn round_trip() {
            for &address in &[0, 1, 2, 3, 0x155, 0x2aa, 1023] {
                for &position in &[0, 1, 63, 64, 0xabc, 4095] {
                    for kind in [PacketKind::Command, PacketKind::Response] {
                        for status in [ModuleStatus::Idle, ModuleStatus::Moving] {
                            let sent = Packet::new(address, position, kind, status);
                            let received = Packet::decode(&sent.encode());

                            assert_eq!(received.address, address);
                            assert_eq!(received.position, position);
                            assert_eq!(received.kind, kind);
                            assert_eq!(received.status, status);
                            assert!(received.valid);
                        }
                    }
                }
            }
        }

        #[test]
        fn truncation() {
            assert_eq!(
                Packet::command(1024, 0).encode(),
                Packet::command(0, 0).encode()
            );
            assert_eq!(
                Packet::command(0, 4096).encode(),
                Packet::command(0, 0).encode()
            );
        }

        #[test]
        fn known_vector() {
            let packet = Packet::decode(&[0xd4, 0x00, 0x00, 0x02, 0x00]);

            assert_eq!(packet.address, 0);
            assert_eq!(packet.position, 0);
            assert_eq!(packet.kind, PacketKind::Command);
            assert_eq!(packet.status, ModuleStatus::Idle);
            assert!(!packet.valid);

            assert_eq!(checksum(&[0xd4, 0x00, 0x00, 0x02]), 0x9b);
            assert!(Packet::decode(&[0xd4, 0x00, 0x00, 0x02, 0x9b]).valid);
        }
    }

    mod integrity {
        use super::*;

        #[test]
        fn check_string() {
            assert_eq!(checksum(b"123456789"), 0xf4);
        }

        #[test]
        fn single_bit_flips() {
            let raw = Packet::response(0x2a5, 0x5bc, ModuleStatus::Moving).encode();

            for byte in 0..4 {
                for bit in 0..8 {
                    let mut bad = raw;
                    bad[byte] ^= 1 << bit;

                    assert!(!Packet::decode(&bad).valid);
                }
            }
        }

        #[test]
        fn sync_gate() {
            let mut raw = Packet::command(3, 9).encode();

            // wrong sync byte, checksum recomputed to match
            raw[0] = 0xd5;
            raw[4] = checksum(&raw[..4]);

            assert!(!Packet::decode(&raw).valid);
        }
    }
}
