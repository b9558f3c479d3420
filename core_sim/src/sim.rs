//! Trace replay and the per-run summary

use serde::Serialize;

use crate::{
    addr::{Addr, AddrFields},
    cache::Cache,
    geometry::{Associativity, CacheGeometry},
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// one decoded access from the replayed trace, with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub addr: Addr,
    pub tag: u32,
    pub index: u32,
    pub offset: u32,
    pub hit: bool,
}

/// everything the reporting layer needs about one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cache_size: u32,
    pub block_size: u32,
    pub associativity: Associativity,
    pub ways: u32,
    pub n_blocks: u32,
    pub n_sets: u32,
    pub tag_bits: u32,
    pub index_bits: u32,
    pub offset_bits: u32,
    pub n_accesses: u64,
    pub n_hits: u64,
    pub n_misses: u64,
    /// percentage of accesses that hit. an empty trace reports 0.0 by
    /// convention rather than an undefined rate.
    pub hit_rate: f64,
}

/// replays an ordered address trace against a fresh [`Cache`].
///
/// the geometry is immutable; all mutable state (the cache and the
/// hit/miss counters) belongs to this value and dies with it, so no
/// state leaks between runs.
pub struct Simulator {
    geometry: CacheGeometry,
    cache: Cache,
    n_accesses: u64,
    n_hits: u64,
}

impl Simulator {
    pub fn new(geometry: CacheGeometry) -> Self {
        log::info!(
            "cache: {} B, {} B blocks, {} ({} sets x {} ways), tag/index/offset bits {}/{}/{}",
            geometry.cache_size,
            geometry.block_size,
            geometry.associativity,
            geometry.n_sets,
            geometry.ways,
            geometry.tag_bits,
            geometry.index_bits,
            geometry.offset_bits,
        );
        Self {
            cache: Cache::new(&geometry),
            geometry,
            n_accesses: 0,
            n_hits: 0,
        }
    }

    /// replays one access: decode, then hit/fill/evict in the cache.
    pub fn step(&mut self, addr: Addr) -> TraceEntry {
        let AddrFields { tag, index, offset } = self.geometry.split(addr);
        let hit = self.cache.access(index, tag).is_hit();
        self.n_accesses += 1;
        if hit {
            self.n_hits += 1;
        }
        TraceEntry {
            addr,
            tag,
            index,
            offset,
            hit,
        }
    }

    /// replays the whole trace in order. order is the sole driver of
    /// which block is LRU at any point.
    pub fn run(&mut self, trace: &[Addr]) -> RunSummary {
        for &addr in trace {
            let _ = self.step(addr);
        }
        self.summary()
    }

    /// like [`run`](Self::run), but keeps every decoded access for display.
    pub fn record_run(&mut self, trace: &[Addr]) -> (Vec<TraceEntry>, RunSummary) {
        let entries = trace.iter().map(|&addr| self.step(addr)).collect();
        (entries, self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        let g = &self.geometry;
        let hit_rate = if self.n_accesses == 0 {
            0.0
        } else {
            100.0 * self.n_hits as f64 / self.n_accesses as f64
        };
        RunSummary {
            cache_size: g.cache_size,
            block_size: g.block_size,
            associativity: g.associativity,
            ways: g.ways,
            n_blocks: g.n_blocks,
            n_sets: g.n_sets,
            tag_bits: g.tag_bits,
            index_bits: g.index_bits,
            offset_bits: g.offset_bits,
            n_accesses: self.n_accesses,
            n_hits: self.n_hits,
            n_misses: self.n_accesses - self.n_hits,
            hit_rate,
        }
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }
}

#[cfg(feature = "stat")]
impl Simulator {
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        let summary = self.summary();
        buf.push(Box::new(stat::GeometryStat::from(&summary)));
        buf.push(Box::new(stat::AccessStat::from(&summary)));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use super::RunSummary;
    use crate::stat::{Stat, StatView};

    pub struct GeometryStat {
        cache_size: u32,
        block_size: u32,
        associativity: String,
        n_blocks: u32,
        n_sets: u32,
        tag_bits: u32,
        index_bits: u32,
        offset_bits: u32,
    }

    impl From<&RunSummary> for GeometryStat {
        fn from(s: &RunSummary) -> Self {
            Self {
                cache_size: s.cache_size,
                block_size: s.block_size,
                associativity: format!("{} ({} ways)", s.associativity, s.ways),
                n_blocks: s.n_blocks,
                n_sets: s.n_sets,
                tag_bits: s.tag_bits,
                index_bits: s.index_bits,
                offset_bits: s.offset_bits,
            }
        }
    }

    impl Stat for GeometryStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ GeometryStat {
        fn header(&self) -> &'static str {
            "cache geometry"
        }
        fn width(&self) -> usize {
            34
        }
    }

    impl fmt::Display for &'_ GeometryStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  cache size: {:>19} B", self.cache_size)?;
            writeln!(f, "  block size: {:>19} B", self.block_size)?;
            writeln!(f, "  associativity: {:>18}", self.associativity)?;
            writeln!(f, "  blocks / sets: {:>11} / {:>4}", self.n_blocks, self.n_sets)?;
            writeln!(
                f,
                "  tag/index/offset bits: {:>3}/{:>2}/{:>2}",
                self.tag_bits, self.index_bits, self.offset_bits
            )
        }
    }

    pub struct AccessStat {
        n_accesses: u64,
        n_hits: u64,
        n_misses: u64,
        hit_rate: f64,
    }

    impl From<&RunSummary> for AccessStat {
        fn from(s: &RunSummary) -> Self {
            Self {
                n_accesses: s.n_accesses,
                n_hits: s.n_hits,
                n_misses: s.n_misses,
                hit_rate: s.hit_rate,
            }
        }
    }

    impl Stat for AccessStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ AccessStat {
        fn header(&self) -> &'static str {
            "trace replay"
        }
        fn width(&self) -> usize {
            34
        }
    }

    impl fmt::Display for &'_ AccessStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  accesses total: {:>12}", self.n_accesses)?;
            writeln!(f, "  hits total: {:>16}", self.n_hits)?;
            writeln!(f, "  misses total: {:>14}", self.n_misses)?;
            let rate = format!("{:.2} %", self.hit_rate);
            writeln!(f, "  hit rate: {rate:>20}")
        }
    }
}
