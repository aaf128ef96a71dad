//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

// OSPF protocol version.
//
// Both versions share the same engine. Everything that differs on the wire
// is captured by the layout tables below, so the codec never hard-codes a
// version-specific offset at the call site.
#[derive(Clone, Copy, Debug, Default, Eq, FromPrimitive, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Version {
    #[default]
    Ospfv2 = 2,
    Ospfv3 = 3,
}

// Location of a fixed-width field inside a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Field {
    pub offset: usize,
    pub width: usize,
}

// Hello packet field offsets.
#[derive(Debug)]
pub struct HelloLayout {
    // OSPFv2 only.
    pub network_mask: Option<Field>,
    // OSPFv3 only.
    pub iface_id: Option<Field>,
    pub hello_interval: Field,
    pub options: Field,
    pub priority: Field,
    pub dead_interval: Field,
    pub dr: Field,
    pub bdr: Field,
    pub neighbors: usize,
}

// Database Description packet field offsets.
#[derive(Debug)]
pub struct DbDescLayout {
    pub mtu: Field,
    pub options: Field,
    pub dd_flags: Field,
    pub dd_seq_no: Field,
    pub lsa_hdrs: usize,
}

pub static OSPFV2_HELLO: HelloLayout = HelloLayout {
    network_mask: Some(Field::new(24, 4)),
    iface_id: None,
    hello_interval: Field::new(28, 2),
    options: Field::new(30, 1),
    priority: Field::new(31, 1),
    dead_interval: Field::new(32, 4),
    dr: Field::new(36, 4),
    bdr: Field::new(40, 4),
    neighbors: 44,
};

pub static OSPFV3_HELLO: HelloLayout = HelloLayout {
    network_mask: None,
    iface_id: Some(Field::new(16, 4)),
    priority: Field::new(20, 1),
    options: Field::new(21, 3),
    hello_interval: Field::new(24, 2),
    dead_interval: Field::new(26, 2),
    dr: Field::new(28, 4),
    bdr: Field::new(32, 4),
    neighbors: 36,
};

pub static OSPFV2_DBDESC: DbDescLayout = DbDescLayout {
    mtu: Field::new(24, 2),
    options: Field::new(26, 1),
    dd_flags: Field::new(27, 1),
    dd_seq_no: Field::new(28, 4),
    lsa_hdrs: 32,
};

pub static OSPFV3_DBDESC: DbDescLayout = DbDescLayout {
    options: Field::new(17, 3),
    mtu: Field::new(20, 2),
    dd_flags: Field::new(23, 1),
    dd_seq_no: Field::new(24, 4),
    lsa_hdrs: 28,
};

// ===== impl Version =====

impl Version {
    // Length of the common packet header.
    pub const fn hdr_length(&self) -> usize {
        match self {
            Version::Ospfv2 => 24,
            Version::Ospfv3 => 16,
        }
    }

    pub const fn hello_layout(&self) -> &'static HelloLayout {
        match self {
            Version::Ospfv2 => &OSPFV2_HELLO,
            Version::Ospfv3 => &OSPFV3_HELLO,
        }
    }

    pub const fn dbdesc_layout(&self) -> &'static DbDescLayout {
        match self {
            Version::Ospfv2 => &OSPFV2_DBDESC,
            Version::Ospfv3 => &OSPFV3_DBDESC,
        }
    }

    // Size of a Link State Request entry.
    pub const fn lsr_entry_length(&self) -> usize {
        12
    }
}

impl From<Version> for u8 {
    fn from(version: Version) -> u8 {
        version as u8
    }
}

impl TryFrom<u8> for Version {
    type Error = String;

    fn try_from(value: u8) -> Result<Version, String> {
        num_traits::FromPrimitive::from_u8(value)
            .ok_or_else(|| format!("unsupported OSPF version: {}", value))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Ospfv2 => write!(f, "OSPFv2"),
            Version::Ospfv3 => write!(f, "OSPFv3"),
        }
    }
}

// ===== impl Field =====

impl Field {
    pub const fn new(offset: usize, width: usize) -> Field {
        Field { offset, width }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    // Reads the field as a big-endian unsigned integer.
    pub fn read(&self, data: &[u8]) -> u32 {
        data[self.offset..self.end()]
            .iter()
            .fold(0, |acc, byte| (acc << 8) | *byte as u32)
    }

    // Writes the lowest `width` bytes of `value` in big-endian byte order.
    pub fn write(&self, data: &mut [u8], value: u32) {
        let bytes = value.to_be_bytes();
        data[self.offset..self.end()].copy_from_slice(&bytes[4 - self.width..]);
    }
}

// ===== unit tests =====
