//! Per-bucket one-deletion-variant signature index.
//!
//! Every key slice of length `len` contributes `len` signatures, one per
//! deleted position, and two slices share a signature exactly when they
//! differ in at most the deleted position. That single-deletion overlap
//! is what lets a bucket answer its share of the query from plain table
//! lookups.
//!
//! The built state is three flat arrays: a bit-packed `signatures` array
//! of `M * len` symbols over the `M` distinct signatures, an `ids` array
//! grouped contiguously per signature, and an open-addressed `table` of
//! `(sig_pos, id_beg, id_end)` triples probed linearly at 1.5x load.
//! Vacant slots are marked by a `sig_pos` sentinel, which reserves one
//! signature index and caps `M` accordingly.

use crate::bits::{width_for, IntVec};
use crate::sig::{fnv1a_hash, Signature};
use crate::Symbol;
use hashbrown::HashMap;

const VACANT: u32 = u32::MAX;

#[derive(Clone, Copy)]
struct Slot {
    sig_pos: u32,
    id_beg: u32,
    id_end: u32,
}

pub struct OdvIndex {
    table: Vec<Slot>,
    ids: Vec<u32>,
    signatures: IntVec,
    length: u32,
    del_marker: u32,
}

impl OdvIndex {
    /// Builds the index over `keys`, each a slice of `length` symbols
    /// drawn from `[0, alphabet_size)`.
    pub fn build<S: Symbol>(keys: &[&[S]], length: u32, alphabet_size: u32) -> Self {
        if alphabet_size == u32::MAX {
            panic!(
                "hmsearch::OdvIndex::build(): alphabet size {} reserves the deletion sentinel",
                alphabet_size
            );
        }

        let mut signature_map: HashMap<Vec<u32>, Vec<u32>> = HashMap::new();
        let mut sig = Signature::new();
        for (i, key) in keys.iter().enumerate() {
            for j in 0..length as usize {
                if key[j].to_u32() >= alphabet_size {
                    panic!(
                        "hmsearch::OdvIndex::build(): key {} holds symbol {} outside the alphabet of size {}",
                        i,
                        key[j].to_u32(),
                        alphabet_size
                    );
                }
                sig.fill_from(key, j, alphabet_size);
                signature_map
                    .entry_ref(sig.as_symbols())
                    .or_insert_with(Vec::new)
                    .push(i as u32);
            }
        }

        let distinct = signature_map.len();
        if distinct > VACANT as usize {
            panic!(
                "hmsearch::OdvIndex::build(): {} distinct signatures exceed the signature id space",
                distinct
            );
        }

        // Ceiling of 1.5x keeps at least one slot vacant whenever the
        // table is non-empty, so probe loops always terminate.
        let table_size = (distinct * 3 + 1) / 2;
        let mut table = vec![
            Slot {
                sig_pos: VACANT,
                id_beg: 0,
                id_end: 0,
            };
            table_size
        ];
        let mut ids = Vec::with_capacity(keys.len() * length as usize);
        let mut signatures = IntVec::new(
            distinct * length as usize,
            width_for(u64::from(alphabet_size)),
        );

        let mut placed = 0u32;
        for (symbols, sig_ids) in &signature_map {
            let mut pos = (fnv1a_hash(symbols) % table_size as u64) as usize;
            loop {
                if table[pos].sig_pos == VACANT {
                    table[pos].sig_pos = placed;
                    signatures.fill_from(
                        placed as usize * length as usize,
                        symbols.iter().map(|&s| u64::from(s)),
                    );
                    table[pos].id_beg = ids.len() as u32;
                    ids.extend_from_slice(sig_ids);
                    table[pos].id_end = ids.len() as u32;
                    placed += 1;
                    break;
                }
                pos += 1;
                if pos == table_size {
                    pos = 0;
                }
            }
        }
        debug_assert_eq!(placed as usize, distinct);

        Self {
            table,
            ids,
            signatures,
            length,
            del_marker: alphabet_size,
        }
    }

    /// Looks up every one-deletion variant of `key`, calling `found` with
    /// each id recorded under a matching signature.
    ///
    /// `sig` is caller-provided scratch so a query spanning many buckets
    /// reuses one allocation.
    pub fn search<S, F>(&self, key: &[S], sig: &mut Signature, mut found: F)
    where
        S: Symbol,
        F: FnMut(u32),
    {
        if self.table.is_empty() {
            return;
        }
        for j in 0..self.length as usize {
            sig.fill_from(key, j, self.del_marker);
            let mut pos = (sig.hash() % self.table.len() as u64) as usize;
            loop {
                let slot = self.table[pos];
                if slot.sig_pos == VACANT {
                    break;
                }
                let beg = slot.sig_pos as usize * self.length as usize;
                let stored = self.signatures.iter_range(beg, self.length as usize);
                if stored.eq(sig.as_symbols().iter().map(|&s| u64::from(s))) {
                    for i in slot.id_beg..slot.id_end {
                        found(self.ids[i as usize]);
                    }
                    break;
                }
                pos += 1;
                if pos == self.table.len() {
                    pos = 0;
                }
            }
        }
    }

    /// Slice length this bucket was built over.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Number of distinct signatures stored.
    pub fn distinct_signatures(&self) -> usize {
        if self.length == 0 {
            0
        } else {
            self.signatures.len() / self.length as usize
        }
    }

    /// Approximate heap memory usage in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.table.capacity() * std::mem::size_of::<Slot>()
            + self.ids.capacity() * 4
            + self.signatures.heap_bytes()
    }
}
