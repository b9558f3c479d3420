//! Cache geometry derivation and validation

use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// width of a memory address in bits. all traces use 32-bit addresses.
pub const ADDRESS_BITS: u32 = 32;

/// associativity as written in a configuration, before resolution
/// against the block count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    /// one block per set
    Direct,
    /// one set holding every block
    Fully,
    /// explicit number of blocks per set
    Ways(u32),
}

impl FromStr for Associativity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("direct") {
            return Ok(Self::Direct);
        }
        if s.eq_ignore_ascii_case("fully") {
            return Ok(Self::Fully);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self::Ways(n)),
            _ => Err(ConfigError::UnknownAssociativity {
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Fully => write!(f, "fully"),
            Self::Ways(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Associativity {
    /// serialized as its configuration token (`"direct"`, `"fully"`, `"4"`)
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive power of two, got {value}")]
    NotPowerOfTwo { name: &'static str, value: u32 },
    #[error("cache size {cache_size} is not a multiple of block size {block_size}")]
    IndivisibleBlocks { cache_size: u32, block_size: u32 },
    #[error("{ways} ways do not evenly divide {n_blocks} blocks")]
    IndivisibleWays { ways: u32, n_blocks: u32 },
    #[error("unrecognized associativity `{token}` (expected `direct`, `fully`, or a positive integer)")]
    UnknownAssociativity { token: String },
    #[error(
        "offset bits ({offset_bits}) and index bits ({index_bits}) leave no room \
         for a tag in a {ADDRESS_BITS}-bit address"
    )]
    NoTagBits { offset_bits: u32, index_bits: u32 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// sizes, counts, and bit-field widths of one cache configuration.
/// computed once, immutable afterwards; a fresh [`Cache`](crate::cache::Cache)
/// is sized from it per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub cache_size: u32,
    pub block_size: u32,
    pub associativity: Associativity,
    /// resolved blocks per set
    pub ways: u32,
    pub n_blocks: u32,
    pub n_sets: u32,
    pub offset_bits: u32,
    /// 0 when `n_sets == 1`
    pub index_bits: u32,
    pub tag_bits: u32,
}

impl CacheGeometry {
    pub fn new(cache_size: u32, block_size: u32, associativity: Associativity) -> Result<Self> {
        require_power_of_two("cache size", cache_size)?;
        require_power_of_two("block size", block_size)?;
        if block_size > cache_size || cache_size % block_size != 0 {
            return Err(ConfigError::IndivisibleBlocks {
                cache_size,
                block_size,
            });
        }
        let n_blocks = cache_size / block_size;
        let (ways, n_sets) = match associativity {
            Associativity::Direct => (1, n_blocks),
            Associativity::Fully => (n_blocks, 1),
            Associativity::Ways(n) => {
                if n == 0 || n > n_blocks || n_blocks % n != 0 {
                    return Err(ConfigError::IndivisibleWays { ways: n, n_blocks });
                }
                (n, n_blocks / n)
            }
        };
        // every divisor of a power of two is itself a power of two
        debug_assert!(n_sets.is_power_of_two());

        let offset_bits = block_size.trailing_zeros();
        let index_bits = n_sets.trailing_zeros();
        if offset_bits + index_bits > ADDRESS_BITS {
            return Err(ConfigError::NoTagBits {
                offset_bits,
                index_bits,
            });
        }
        let tag_bits = ADDRESS_BITS - index_bits - offset_bits;
        Ok(Self {
            cache_size,
            block_size,
            associativity,
            ways,
            n_blocks,
            n_sets,
            offset_bits,
            index_bits,
            tag_bits,
        })
    }
}

fn require_power_of_two(name: &'static str, value: u32) -> Result<()> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_mapped() {
        let g = CacheGeometry::new(1024, 32, Associativity::Direct).unwrap();
        assert_eq!(g.n_blocks, 32);
        assert_eq!(g.n_sets, 32);
        assert_eq!(g.ways, 1);
        assert_eq!(g.offset_bits, 5);
        assert_eq!(g.index_bits, 5);
        assert_eq!(g.tag_bits, 22);
    }

    #[test]
    fn test_fully_associative() {
        let g = CacheGeometry::new(128, 32, Associativity::Fully).unwrap();
        assert_eq!(g.n_sets, 1);
        assert_eq!(g.ways, 4);
        assert_eq!(g.index_bits, 0);
        assert_eq!(g.tag_bits, ADDRESS_BITS - g.offset_bits);
    }

    #[test]
    fn test_n_way() {
        let g = CacheGeometry::new(1024, 32, Associativity::Ways(4)).unwrap();
        assert_eq!(g.n_sets, 8);
        assert_eq!(g.index_bits, 3);
    }

    #[test]
    fn test_invariants_hold() {
        for assoc in [
            Associativity::Direct,
            Associativity::Ways(2),
            Associativity::Ways(8),
            Associativity::Fully,
        ] {
            for cache_size in [1 << 10, 1 << 13, 1 << 16, 1 << 20] {
                let g = CacheGeometry::new(cache_size, 32, assoc).unwrap();
                assert_eq!(g.n_sets * g.ways, g.n_blocks);
                assert_eq!(g.n_blocks, cache_size / 32);
                assert_eq!(g.tag_bits + g.index_bits + g.offset_bits, ADDRESS_BITS);
            }
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            CacheGeometry::new(1000, 32, Associativity::Direct),
            Err(ConfigError::NotPowerOfTwo { .. })
        ));
        assert!(matches!(
            CacheGeometry::new(1024, 48, Associativity::Direct),
            Err(ConfigError::NotPowerOfTwo { .. })
        ));
        assert!(matches!(
            CacheGeometry::new(32, 64, Associativity::Direct),
            Err(ConfigError::IndivisibleBlocks { .. })
        ));
        assert!(matches!(
            CacheGeometry::new(1024, 32, Associativity::Ways(3)),
            Err(ConfigError::IndivisibleWays { .. })
        ));
        assert!(matches!(
            CacheGeometry::new(1024, 32, Associativity::Ways(64)),
            Err(ConfigError::IndivisibleWays { .. })
        ));
    }

    #[test]
    fn test_associativity_tokens() {
        assert_eq!("direct".parse::<Associativity>(), Ok(Associativity::Direct));
        assert_eq!("Fully".parse::<Associativity>(), Ok(Associativity::Fully));
        assert_eq!("8".parse::<Associativity>(), Ok(Associativity::Ways(8)));
        assert!(matches!(
            "0".parse::<Associativity>(),
            Err(ConfigError::UnknownAssociativity { .. })
        ));
        assert!(matches!(
            "some".parse::<Associativity>(),
            Err(ConfigError::UnknownAssociativity { .. })
        ));
    }
}
