//! Address decomposition into tag / index / offset fields

use std::fmt;

use crate::geometry::CacheGeometry;

/// to unify displaying trace addresses
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(u32);

impl Addr {
    pub fn new(v: u32) -> Self {
        Self(v)
    }
    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl From<u32> for Addr {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// the three disjoint bit-fields of one decomposed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrFields {
    pub tag: u32,
    pub index: u32,
    pub offset: u32,
}

#[inline]
const fn mask_lower(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

impl CacheGeometry {
    /// splits `addr` into its tag, index, and offset fields. pure; the
    /// field widths were validated when the geometry was constructed.
    ///
    /// with a single set there are no index bits and the index is
    /// identically zero.
    pub fn split(&self, addr: Addr) -> AddrFields {
        let a = addr.into_inner();
        let offset = a & mask_lower(self.offset_bits);
        let index = (a >> self.offset_bits) & mask_lower(self.index_bits);
        let tag = (a >> (self.offset_bits + self.index_bits)) & mask_lower(self.tag_bits);
        AddrFields { tag, index, offset }
    }

    /// inverse of [`split`](Self::split): reassembles an address from its fields.
    pub fn join(&self, fields: AddrFields) -> Addr {
        let AddrFields { tag, index, offset } = fields;
        Addr::new((tag << (self.offset_bits + self.index_bits)) | (index << self.offset_bits) | offset)
    }
}
