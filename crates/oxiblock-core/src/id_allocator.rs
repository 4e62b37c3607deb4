//! Dense id allocation with fixed and automatic assignments.
//!
//! Allocation runs in two phases. Fixed ids are reserved as registrations
//! arrive, so ids that persisted world data depends on stay stable. Keys
//! without a fixed id are queued, and a single sweep over the queue (in
//! request order) hands each one the lowest free id at or after a cursor
//! that only moves forward.
//!
//! Once a key resolves it keeps its id until [`IdAllocator::reset`].

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use bit_vec::BitVec;

use crate::error::AllocError;

/// Ids within this distance of the range start are tracked in the bit
/// vector; farther ids are looked up in the holder map only.
const DENSE_LIMIT: usize = 1 << 20;

/// Allocator for one id space starting at a fixed offset.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    start: u32,
    next: u32,
    /// Bit `i` marks id `start + i` as taken, for `i < DENSE_LIMIT`.
    occupied: BitVec,
    /// Holder of every taken id.
    owners: HashMap<u32, String>,
    fixed: HashMap<String, u32>,
    resolved: HashMap<String, u32>,
    pending: Vec<String>,
    queued: HashSet<String>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl IdAllocator {
    /// Create an allocator whose ids start at `start`.
    pub fn new(start: u32) -> Self {
        Self {
            start,
            next: start,
            occupied: BitVec::new(),
            owners: HashMap::new(),
            fixed: HashMap::new(),
            resolved: HashMap::new(),
            pending: Vec::new(),
            queued: HashSet::new(),
        }
    }

    /// First id of this allocator's range.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Check whether `key` could take the fixed id `id`, without reserving it.
    pub fn check_fixed(&self, key: &str, id: u32) -> Result<(), AllocError> {
        if let Some(&existing) = self.resolved.get(key) {
            if existing == id {
                return Ok(());
            }
            return Err(AllocError::KeyConflict {
                key: key.to_string(),
                existing,
                requested: id,
            });
        }
        if id < self.start {
            return Err(AllocError::BelowRange {
                id,
                key: key.to_string(),
                start: self.start,
            });
        }
        if let Some(holder) = self.owners.get(&id) {
            return Err(AllocError::IdOccupied {
                id,
                key: key.to_string(),
                holder: holder.clone(),
            });
        }
        Ok(())
    }

    /// Reserve `id` for `key`. Repeating an identical assignment is a no-op.
    pub fn assign_fixed(&mut self, key: &str, id: u32) -> Result<u32, AllocError> {
        self.check_fixed(key, id)?;
        if self.resolved.contains_key(key) {
            return Ok(id);
        }
        self.mark(id, key);
        self.fixed.insert(key.to_string(), id);
        self.resolved.insert(key.to_string(), id);
        Ok(id)
    }

    /// Request an automatic id for `key`.
    ///
    /// Returns the id when the key is already resolved. Otherwise the key is
    /// queued for the next [`process_pending`](Self::process_pending) and
    /// `None` is returned.
    pub fn request_auto(&mut self, key: &str) -> Option<u32> {
        if let Some(&id) = self.resolved.get(key) {
            return Some(id);
        }
        if self.queued.insert(key.to_string()) {
            self.pending.push(key.to_string());
        }
        None
    }

    /// Resolve every queued key, in request order. Returns how many keys
    /// received a new id.
    ///
    /// If the id space runs out, the key that failed and every key after it
    /// stay queued; keys resolved before it keep their ids.
    pub fn process_pending(&mut self) -> Result<usize, AllocError> {
        let mut pending = std::mem::take(&mut self.pending).into_iter();
        self.queued.clear();

        let mut allocated = 0;
        while let Some(key) = pending.next() {
            if self.resolved.contains_key(&key) {
                continue;
            }
            let found = next_free(&mut self.next, |id| {
                is_taken(&self.occupied, self.start, id, |id| self.owners.contains_key(&id))
            });
            let id = match found {
                Ok(id) => id,
                Err(e) => {
                    for key in std::iter::once(key).chain(pending) {
                        self.queued.insert(key.clone());
                        self.pending.push(key);
                    }
                    return Err(e);
                }
            };
            self.mark(id, &key);
            self.resolved.insert(key, id);
            allocated += 1;
        }
        Ok(allocated)
    }

    /// Id held by `key`, fixed or automatic.
    pub fn resolved(&self, key: &str) -> Option<u32> {
        self.resolved.get(key).copied()
    }

    /// Fixed id held by `key`.
    pub fn fixed(&self, key: &str) -> Option<u32> {
        self.fixed.get(key).copied()
    }

    pub fn is_occupied(&self, id: u32) -> bool {
        self.owners.contains_key(&id)
    }

    /// Number of keys waiting for the next sweep.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Every resolved key and its id.
    pub fn resolved_ids(&self) -> &HashMap<String, u32> {
        &self.resolved
    }

    /// Forget every assignment and rewind the cursor to the start of the range.
    pub fn reset(&mut self) {
        self.next = self.start;
        self.occupied = BitVec::new();
        self.owners.clear();
        self.fixed.clear();
        self.resolved.clear();
        self.pending.clear();
        self.queued.clear();
    }

    fn mark(&mut self, id: u32, key: &str) {
        set_bit(&mut self.occupied, (id - self.start) as usize);
        self.owners.insert(id, key.to_string());
    }
}

/// One-shot allocation over a fresh id space starting at `start`.
///
/// Fixed assignments are honoured first; then each pending key without a
/// fixed id takes the lowest free id, in slice order. Keys listed twice
/// resolve once.
pub fn allocate<K>(
    start: u32,
    fixed: &HashMap<K, u32>,
    pending: &[K],
) -> Result<HashMap<K, u32>, AllocError>
where
    K: Clone + Eq + Hash + ToString,
{
    let mut occupied = BitVec::new();
    let mut holders: HashMap<u32, &K> = HashMap::with_capacity(fixed.len());
    let mut out = HashMap::with_capacity(fixed.len() + pending.len());

    for (key, &id) in fixed {
        if id < start {
            return Err(AllocError::BelowRange {
                id,
                key: key.to_string(),
                start,
            });
        }
        if let Some(holder) = holders.insert(id, key) {
            return Err(AllocError::IdOccupied {
                id,
                key: key.to_string(),
                holder: holder.to_string(),
            });
        }
        set_bit(&mut occupied, (id - start) as usize);
        out.insert(key.clone(), id);
    }

    let mut far: HashSet<u32> = holders.keys().copied().collect();
    let mut cursor = start;
    for key in pending {
        if out.contains_key(key) {
            continue;
        }
        let id = next_free(&mut cursor, |id| {
            is_taken(&occupied, start, id, |id| far.contains(&id))
        })?;
        if !set_bit(&mut occupied, (id - start) as usize) {
            far.insert(id);
        }
        out.insert(key.clone(), id);
    }
    Ok(out)
}

/// Lowest id at or after `cursor` for which `taken` is false; advances the
/// cursor past it.
fn next_free(cursor: &mut u32, taken: impl Fn(u32) -> bool) -> Result<u32, AllocError> {
    loop {
        let id = *cursor;
        if !taken(id) {
            *cursor = id.saturating_add(1);
            return Ok(id);
        }
        *cursor = id.checked_add(1).ok_or(AllocError::Exhausted)?;
    }
}

/// Occupancy of `id`: the bit vector inside the dense window, `sparse` past it.
fn is_taken(bits: &BitVec, start: u32, id: u32, sparse: impl Fn(u32) -> bool) -> bool {
    let index = (id - start) as usize;
    if index < DENSE_LIMIT {
        bits.get(index).unwrap_or(false)
    } else {
        sparse(id)
    }
}

/// Set bit `index` when it lies in the dense window. Returns `false` for ids
/// that must be tracked elsewhere.
fn set_bit(bits: &mut BitVec, index: usize) -> bool {
    if index >= DENSE_LIMIT {
        return false;
    }
    if index >= bits.len() {
        bits.grow(index + 1 - bits.len(), false);
    }
    bits.set(index, true);
    true
}
