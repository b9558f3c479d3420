//! Block / set storage and LRU replacement
//!
//! Recency is a logical counter incremented once per access, not wall-clock
//! time, so replaying the same trace twice picks the same victims.

use crate::geometry::CacheGeometry;

/// one block of cache storage. created invalid; the tag is only
/// meaningful while `valid` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct Block {
    valid: bool,
    tag: u32,
    last_used: u64,
}

impl Block {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    pub fn tag(&self) -> Option<u32> {
        self.valid.then_some(self.tag)
    }
}

/// outcome of one access to a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// the tag was resident
    Hit,
    /// miss placed into an invalid slot
    Fill,
    /// miss replacing the least recently used block
    Evict,
}

impl AccessKind {
    /// Returns `true` if the access kind is [`Hit`].
    ///
    /// [`Hit`]: AccessKind::Hit
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

/// mutable cache state for exactly one simulation run.
pub struct Cache {
    /// set-major: block `slot` of set `index` lives at `index * ways + slot`
    blocks: Vec<Block>,
    n_sets: u32,
    ways: u32,
    tick: u64,
}

impl Cache {
    pub fn new(geometry: &CacheGeometry) -> Self {
        Self {
            blocks: vec![Block::default(); (geometry.n_sets * geometry.ways) as usize],
            n_sets: geometry.n_sets,
            ways: geometry.ways,
            tick: 0,
        }
    }

    /// looks up `tag` in set `index`, in strict priority order:
    /// hit, then fill of the first invalid slot, then LRU eviction
    /// (lowest slot wins recency ties). recency of the touched block
    /// is bumped to the current access count; no other block changes.
    pub fn access(&mut self, index: u32, tag: u32) -> AccessKind {
        self.tick += 1;
        let tick = self.tick;
        let set = self.set_mut(index);

        if let Some(block) = set.iter_mut().find(|b| b.valid && b.tag == tag) {
            block.last_used = tick;
            return AccessKind::Hit;
        }

        if let Some(block) = set.iter_mut().find(|b| !b.valid) {
            *block = Block {
                valid: true,
                tag,
                last_used: tick,
            };
            return AccessKind::Fill;
        }

        let mut victim = 0;
        let mut oldest = u64::MAX;
        for (slot, block) in set.iter().enumerate() {
            if block.last_used < oldest {
                oldest = block.last_used;
                victim = slot;
            }
        }
        set[victim] = Block {
            valid: true,
            tag,
            last_used: tick,
        };
        AccessKind::Evict
    }

    pub fn set(&self, index: u32) -> &[Block] {
        debug_assert!(index < self.n_sets);
        let base = (index * self.ways) as usize;
        &self.blocks[base..base + self.ways as usize]
    }

    fn set_mut(&mut self, index: u32) -> &mut [Block] {
        debug_assert!(index < self.n_sets);
        let base = (index * self.ways) as usize;
        &mut self.blocks[base..base + self.ways as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Associativity;

    fn four_way_single_set() -> Cache {
        // 128B / 32B blocks, fully associative: one set of 4 ways
        Cache::new(&CacheGeometry::new(128, 32, Associativity::Fully).unwrap())
    }

    #[test]
    fn test_fill_then_hit() {
        let mut c = four_way_single_set();
        assert_eq!(c.access(0, 7), AccessKind::Fill);
        assert_eq!(c.access(0, 7), AccessKind::Hit);
    }

    #[test]
    fn test_fills_use_slot_order() {
        let mut c = four_way_single_set();
        for tag in 0..4 {
            assert_eq!(c.access(0, tag), AccessKind::Fill);
        }
        assert!(c.set(0).iter().all(Block::is_valid));
        let tags: Vec<_> = c.set(0).iter().map(|b| b.tag().unwrap()).collect();
        assert_eq!(tags, [0, 1, 2, 3]);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut c = four_way_single_set();
        for tag in 0..4 {
            let _ = c.access(0, tag);
        }
        // touch tag 0 so tag 1 becomes the oldest
        assert_eq!(c.access(0, 0), AccessKind::Hit);
        assert_eq!(c.access(0, 9), AccessKind::Evict);
        assert_eq!(c.set(0)[1].tag(), Some(9));
        // tag 1 was replaced; tag 0 survived
        assert_eq!(c.access(0, 1), AccessKind::Evict);
        assert_eq!(c.access(0, 0), AccessKind::Hit);
    }

    #[test]
    fn test_hit_leaves_other_blocks_alone() {
        let mut c = four_way_single_set();
        let _ = c.access(0, 1);
        let _ = c.access(0, 2);
        let before: Vec<_> = c.set(0).iter().map(|b| b.last_used).collect();
        let _ = c.access(0, 1);
        let after: Vec<_> = c.set(0).iter().map(|b| b.last_used).collect();
        assert_ne!(before[0], after[0]);
        assert_eq!(before[1..], after[1..]);
    }

    #[test]
    fn test_direct_mapped_sets_are_independent() {
        let g = CacheGeometry::new(1024, 32, Associativity::Direct).unwrap();
        let mut c = Cache::new(&g);
        assert_eq!(c.access(3, 42), AccessKind::Fill);
        assert_eq!(c.access(4, 42), AccessKind::Fill);
        assert_eq!(c.access(3, 42), AccessKind::Hit);
        // a different tag in a 1-way set replaces the resident block
        assert_eq!(c.access(3, 43), AccessKind::Evict);
        assert_eq!(c.access(3, 42), AccessKind::Evict);
    }
}
