//! Well-known payload object types.
//!
//! Only the handful of types the client itself produces or that are
//! commonly exchanged are listed here. The dotted mask strings use the
//! router's `a.b.c.d/bits` notation.

use crate::po_type::PayloadType;

/// A registered payload object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoAllocation {
    pub name: &'static str,
    pub octet: [u8; 4],
    pub mask: &'static str,
    pub mask_bits: u8,
}

impl PoAllocation {
    /// The octet-only descriptor for this allocation.
    pub const fn po_type(&self) -> PayloadType {
        PayloadType::Octet(self.octet)
    }

    /// The 32-bit number formed by the octet bytes.
    pub const fn number(&self) -> u32 {
        u32::from_be_bytes(self.octet)
    }
}

/// Entity secret key material, sent with `sete`.
pub const ENTITY_SECRET: PoAllocation = PoAllocation {
    name: "EntitySecret",
    octet: [1, 0, 1, 2],
    mask: "1.0.1.2/32",
    mask_bits: 32,
};

/// A complete signed and encoded bosswave message.
pub const BW_MESSAGE: PoAllocation = PoAllocation {
    name: "BWMessage",
    octet: [1, 0, 1, 1],
    mask: "1.0.1.1/32",
    mask_bits: 32,
};

/// 8-byte little-endian IEEE 754 double.
pub const DOUBLE: PoAllocation = PoAllocation {
    name: "Double",
    octet: [1, 0, 2, 0],
    mask: "1.0.2.0/32",
    mask_bits: 32,
};

/// Plain UTF-8 text.
pub const TEXT: PoAllocation = PoAllocation {
    name: "Text",
    octet: [64, 0, 0, 0],
    mask: "64.0.0.0/4",
    mask_bits: 4,
};

/// MsgPack-encoded object.
pub const MSGPACK: PoAllocation = PoAllocation {
    name: "MsgPack",
    octet: [2, 0, 0, 0],
    mask: "2.0.0.0/8",
    mask_bits: 8,
};

/// Every allocation in this module.
pub const ALL: [PoAllocation; 5] = [ENTITY_SECRET, BW_MESSAGE, DOUBLE, TEXT, MSGPACK];

/// Looks up an allocation by name, ignoring case.
pub fn by_name(name: &str) -> Option<PoAllocation> {
    ALL.iter().copied().find(|a| a.name.eq_ignore_ascii_case(name))
}
