//! Sharded transposition table.
//!
//! Entries are keyed by the position's canonical key and remember the depth
//! they were searched to, the score and what kind of bound that score is.
//!
//! The table is split into [`SHARDS`] independently locked maps so parallel
//! root workers rarely contend on the same lock. Each shard holds at most
//! `capacity / SHARDS` entries. When a shard is full, entries from earlier
//! generations go first, then arbitrary ones.
//!
//! ## Replacement
//!
//! [`TranspositionTable::update`] decides whether a fresh result supersedes
//! an existing entry for the same key:
//!
//! - deeper results always replace shallower ones
//! - shallower results never replace deeper ones
//! - at equal depth an exact score beats a bound, and between two exact
//!   scores the one preferred by the caller's [`Orientation`] wins

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::search::negamax::MATE_THRESHOLD;

// ── Compile-time assertion: TT must be Send + Sync for root fan-out ─────────
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<TranspositionTable>();
    }
    let _ = check;
};

/// Number of independently locked shards.
pub const SHARDS: usize = 16;

/// What the stored score says about the true value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The score is the exact value.
    Exact,
    /// The true value is at least the score (beta cutoff).
    Lower,
    /// The true value is at most the score (failed low).
    Upper,
}

/// Which side's preference decides between two exact scores of equal depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Higher scores are better.
    Maximizing,
    /// Lower scores are better.
    Minimizing,
}

impl Orientation {
    /// Whether `candidate` is strictly better than `incumbent`.
    #[inline]
    pub fn prefers(self, candidate: i32, incumbent: i32) -> bool {
        match self {
            Orientation::Maximizing => candidate > incumbent,
            Orientation::Minimizing => candidate < incumbent,
        }
    }
}

/// A stored search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    /// Canonical key of the position.
    pub key: u64,
    /// Remaining depth the score was computed with.
    pub depth: u8,
    /// Score in node-relative mate form (see [`score_to_tt`]).
    pub evaluation: i32,
    /// Bound kind of `evaluation`.
    pub bound: Bound,
    /// Generation the entry was last written in.
    pub generation: u32,
}

impl TtEntry {
    /// An exact entry. The generation is stamped on store.
    pub fn new(key: u64, depth: u8, evaluation: i32) -> Self {
        Self::with_bound(key, depth, evaluation, Bound::Exact)
    }

    /// An entry with an explicit bound kind.
    pub fn with_bound(key: u64, depth: u8, evaluation: i32, bound: Bound) -> Self {
        Self {
            key,
            depth,
            evaluation,
            bound,
            generation: 0,
        }
    }
}

/// Outcome of a depth-aware probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtProbe {
    /// An entry searched at least as deep as requested.
    Hit(TtEntry),
    /// An entry exists but was searched shallower than requested.
    Stale(TtEntry),
    /// Nothing stored for this key.
    Miss,
}

/// Convert a search score to TT-storable form.
///
/// Mate scores are path-dependent: `MATE_SCORE - ply` changes with the
/// path taken. They are stored as distance-from-node so any path can reuse them.
pub fn score_to_tt(score: i32, ply: u8) -> i32 {
    if score > MATE_THRESHOLD {
        score + ply as i32
    } else if score < -MATE_THRESHOLD {
        score - ply as i32
    } else {
        score
    }
}

/// Convert a TT-stored score back to search-usable form.
///
/// Reverses the adjustment applied by [`score_to_tt`].
pub fn score_from_tt(score: i32, ply: u8) -> i32 {
    if score > MATE_THRESHOLD {
        score - ply as i32
    } else if score < -MATE_THRESHOLD {
        score + ply as i32
    } else {
        score
    }
}

type Shard = Mutex<HashMap<u64, TtEntry>>;

/// Shared, thread-safe store of search results.
///
/// All method receivers are `&self`.
pub struct TranspositionTable {
    shards: Box<[Shard]>,
    shard_capacity: usize,
    generation: AtomicU32,
    retain: u32,
}

impl TranspositionTable {
    /// A table holding at most `capacity` entries, where an entry survives
    /// `retain_generations` calls to [`new_generation`](Self::new_generation)
    /// after its last write.
    pub fn new(capacity: usize, retain_generations: u32) -> Self {
        let shards = (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards,
            shard_capacity: (capacity / SHARDS).max(1),
            generation: AtomicU32::new(0),
            retain: retain_generations,
        }
    }

    #[inline]
    fn shard(&self, key: u64) -> &Shard {
        // Fibonacci hashing spreads weak keys over the shards.
        let index = (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 60) as usize;
        &self.shards[index % SHARDS]
    }

    /// The entry for `key`, regardless of depth.
    pub fn lookup(&self, key: u64) -> Option<TtEntry> {
        self.shard(key).lock().get(&key).copied()
    }

    /// Depth-aware probe.
    pub fn probe(&self, depth: u8, key: u64) -> TtProbe {
        match self.lookup(key) {
            Some(entry) if entry.depth >= depth => TtProbe::Hit(entry),
            Some(entry) => TtProbe::Stale(entry),
            None => TtProbe::Miss,
        }
    }

    /// The entry for `key` if it was searched at least `depth` deep.
    pub fn get_entry(&self, depth: u8, key: u64) -> Option<TtEntry> {
        match self.probe(depth, key) {
            TtProbe::Hit(entry) => Some(entry),
            TtProbe::Stale(_) | TtProbe::Miss => None,
        }
    }

    /// Unconditionally write `entry`, stamped with the current generation.
    pub fn store(&self, entry: TtEntry) {
        let generation = self.generation.load(Ordering::Relaxed);
        let mut shard = self.shard(entry.key).lock();

        if shard.len() >= self.shard_capacity && !shard.contains_key(&entry.key) {
            shard.retain(|_, e| e.generation == generation);
            if shard.len() >= self.shard_capacity {
                let victim = shard.keys().next().copied();
                if let Some(victim) = victim {
                    shard.remove(&victim);
                }
            }
            trace!(len = shard.len(), "tt shard full, evicted");
        }

        shard.insert(
            entry.key,
            TtEntry {
                generation,
                ..entry
            },
        );
    }

    /// Replace `existing` with a fresh result if the fresh one is better.
    ///
    /// Returns whether the table changed. See the module docs for the rules.
    pub fn update(
        &self,
        key: u64,
        depth: u8,
        value: i32,
        bound: Bound,
        existing: &TtEntry,
        orientation: Orientation,
    ) -> bool {
        let replace = match depth.cmp(&existing.depth) {
            CmpOrdering::Greater => true,
            CmpOrdering::Less => false,
            CmpOrdering::Equal => match (existing.bound, bound) {
                (Bound::Exact, Bound::Exact) => orientation.prefers(value, existing.evaluation),
                (Bound::Exact, _) => false,
                (_, Bound::Exact) => true,
                (Bound::Lower, Bound::Lower) => value > existing.evaluation,
                (Bound::Upper, Bound::Upper) => value < existing.evaluation,
                _ => true,
            },
        };

        if replace {
            self.store(TtEntry::with_bound(key, depth, value, bound));
        }
        replace
    }

    /// Store a freshly searched result, going through [`update`](Self::update)
    /// when an entry already exists.
    pub fn record(&self, key: u64, depth: u8, value: i32, bound: Bound) {
        match self.lookup(key) {
            Some(existing) => {
                self.update(key, depth, value, bound, &existing, Orientation::Maximizing);
            }
            None => self.store(TtEntry::with_bound(key, depth, value, bound)),
        }
    }

    /// Start a new generation and drop entries that fell out of retention.
    ///
    /// Returns the new generation number.
    pub fn new_generation(&self) -> u32 {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let retain = self.retain;
        let mut evicted = 0usize;
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let before = shard.len();
            shard.retain(|_, e| generation.saturating_sub(e.generation) <= retain);
            evicted += before - shard.len();
        }
        trace!(generation, evicted, "tt generation advanced");
        generation
    }

    /// Current generation number.
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry and reset the generation counter.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
        self.generation.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("entries", &self.len())
            .field("shard_capacity", &self.shard_capacity)
            .field("generation", &self.generation())
            .finish()
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(1 << 20, 2)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
