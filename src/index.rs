//! The top-level Hamming-range index: bucket partitioning, candidate
//! aggregation, the enhanced filter, and distance verification.

use crate::odv::OdvIndex;
use crate::sig::Signature;
use crate::vertical::{KeyLayout, KeyStore, PackedKeys, VerticalKeys};
use crate::{proper_buckets, Symbol};
use hashbrown::HashMap;

pub struct HmIndex {
    odv_indexes: Vec<OdvIndex>,
    bucket_begs: Vec<u32>,
    length: u32,
    alphabet_size: u32,
    buckets: u32,
    keys: KeyStore,
}

impl HmIndex {
    /// Builds an index over `keys`, each a slice of `length` symbols from
    /// `[0, alphabet_size)`, partitioned into `buckets` buckets.
    ///
    /// The bucket count fixes which radii the index can answer: use
    /// [`proper_buckets`](crate::proper_buckets) of the intended radius.
    ///
    /// ```
    /// # use hmsearch::{proper_buckets, HmIndex};
    /// let keys: [&[u8]; 3] = [
    ///     &[0, 0, 0, 0, 0, 0, 0, 0],
    ///     &[0, 0, 0, 0, 0, 0, 0, 1],
    ///     &[1, 1, 1, 1, 1, 1, 1, 1],
    /// ];
    /// let index = HmIndex::build(&keys, 8, 2, proper_buckets(1));
    /// let mut ids = Vec::new();
    /// index.search(&[0u8; 8], 1, |id| ids.push(id));
    /// ids.sort_unstable();
    /// assert_eq!(&ids, &[0, 1]);
    /// ```
    pub fn build<S: Symbol>(keys: &[&[S]], length: u32, alphabet_size: u32, buckets: u32) -> Self {
        Self::build_with_layout(keys, length, alphabet_size, buckets, KeyLayout::Vertical)
    }

    /// [`build`](HmIndex::build) with an explicit verification layout.
    pub fn build_with_layout<S: Symbol>(
        keys: &[&[S]],
        length: u32,
        alphabet_size: u32,
        buckets: u32,
        layout: KeyLayout,
    ) -> Self {
        if length > 64 {
            panic!(
                "hmsearch::HmIndex::build(): length {} > 64 is not supported",
                length
            );
        }
        assert!(
            buckets >= 1,
            "hmsearch::HmIndex::build(): at least one bucket is required"
        );
        if let Some(i) = keys.iter().position(|k| k.len() != length as usize) {
            panic!(
                "hmsearch::HmIndex::build(): key {} has length {}, expected {}",
                i,
                keys[i].len(),
                length
            );
        }

        let mut bucket_begs = Vec::with_capacity(buckets as usize + 1);
        let mut beg = 0u32;
        for b in 0..buckets {
            bucket_begs.push(beg);
            beg += (length + b) / buckets;
        }
        bucket_begs.push(beg);
        debug_assert_eq!(beg, length);

        let mut odv_indexes = Vec::with_capacity(buckets as usize);
        let mut bucket_keys = Vec::with_capacity(keys.len());
        for b in 0..buckets as usize {
            let beg = bucket_begs[b] as usize;
            let end = bucket_begs[b + 1] as usize;
            bucket_keys.clear();
            bucket_keys.extend(keys.iter().map(|k| &k[beg..end]));
            odv_indexes.push(OdvIndex::build(
                &bucket_keys,
                (end - beg) as u32,
                alphabet_size,
            ));
        }

        let keys = match layout {
            KeyLayout::Vertical => {
                KeyStore::Vertical(VerticalKeys::build(keys, length, alphabet_size))
            }
            KeyLayout::RowMajor => {
                KeyStore::RowMajor(PackedKeys::build(keys, length, alphabet_size))
            }
        };

        Self {
            odv_indexes,
            bucket_begs,
            length,
            alphabet_size,
            buckets,
            keys,
        }
    }

    /// Calls `sink` with the id of every key within Hamming distance
    /// `range` of `query`, in unspecified order, and returns the number
    /// of candidates that reached distance verification.
    ///
    /// The index must have been built with
    /// `buckets == proper_buckets(range)`.
    ///
    /// ```
    /// # use hmsearch::{proper_buckets, HmIndex};
    /// let keys: [&[u8]; 2] = [&[0, 1, 2, 3], &[3, 2, 1, 0]];
    /// let index = HmIndex::build(&keys, 4, 4, proper_buckets(0));
    /// let mut ids = Vec::new();
    /// index.search(&[0u8, 1, 2, 3], 0, |id| ids.push(id));
    /// assert_eq!(&ids, &[0]);
    /// ```
    pub fn search<S, F>(&self, query: &[S], range: u32, mut sink: F) -> usize
    where
        S: Symbol,
        F: FnMut(u32),
    {
        if self.buckets != proper_buckets(range) {
            panic!(
                "hmsearch::HmIndex::search(): range {} needs {} buckets, index was built with {}",
                range,
                proper_buckets(range),
                self.buckets
            );
        }
        assert_eq!(
            query.len(),
            self.length as usize,
            "hmsearch::HmIndex::search(): query length {} does not match key length {}",
            query.len(),
            self.length
        );

        let mut sig = Signature::new();
        let mut match_count: HashMap<u32, u32> = HashMap::new();
        let mut cand_flags: HashMap<u32, Vec<bool>> = HashMap::new();

        for b in 0..self.buckets as usize {
            let beg = self.bucket_begs[b] as usize;
            let end = self.bucket_begs[b + 1] as usize;

            match_count.clear();
            self.odv_indexes[b].search(&query[beg..end], &mut sig, |id| {
                *match_count.entry(id).or_insert(0) += 1;
            });

            // An exact bucket match hits all deletion variants while a
            // distance-1 match shares exactly one, so more than two hits
            // witness distance 0 in this bucket.
            for (&id, &count) in &match_count {
                cand_flags.entry(id).or_insert_with(Vec::new).push(count <= 2);
            }
        }

        let mut num_candidates = 0;
        match &self.keys {
            KeyStore::Vertical(verticals) => {
                let query_planes = verticals.encode_query(query);
                for (&id, weak) in &cand_flags {
                    if filter_rejects(range, weak) {
                        continue;
                    }
                    num_candidates += 1;
                    if verticals.distance_within(id, &query_planes, range) <= range {
                        sink(id);
                    }
                }
            }
            KeyStore::RowMajor(packed) => {
                for (&id, weak) in &cand_flags {
                    if filter_rejects(range, weak) {
                        continue;
                    }
                    num_candidates += 1;
                    if packed.distance_within(id, query, range) <= range {
                        sink(id);
                    }
                }
            }
        }
        num_candidates
    }

    /// Key length the index was built for.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn alphabet_size(&self) -> u32 {
        self.alphabet_size
    }

    pub fn buckets(&self) -> u32 {
        self.buckets
    }

    /// Number of bit planes kept for verification, when the index was
    /// built with the vertical layout.
    pub fn vertical_levels(&self) -> Option<u32> {
        match &self.keys {
            KeyStore::Vertical(v) => Some(v.levels()),
            KeyStore::RowMajor(_) => None,
        }
    }

    /// Number of indexed keys.
    ///
    /// ```
    /// # use hmsearch::{proper_buckets, HmIndex};
    /// let keys: [&[u8]; 2] = [&[0, 1, 2, 3], &[3, 2, 1, 0]];
    /// let index = HmIndex::build(&keys, 4, 4, proper_buckets(0));
    /// assert_eq!(index.len(), 2);
    /// assert!(!index.is_empty());
    /// ```
    pub fn len(&self) -> usize {
        self.keys.num_keys()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate heap memory usage of the built index in bytes.
    pub fn heap_bytes(&self) -> usize {
        self.odv_indexes
            .iter()
            .map(OdvIndex::heap_bytes)
            .sum::<usize>()
            + self.bucket_begs.capacity() * 4
            + self.keys.heap_bytes()
    }
}

/// Rejects a candidate whose per-bucket evidence cannot reach `range`.
///
/// `weak[b]` is true when the `b`-th hit bucket matched without an
/// exact-match witness.
fn filter_rejects(range: u32, weak: &[bool]) -> bool {
    if range % 2 == 0 {
        weak.len() < 2 && weak[0]
    } else {
        weak.len() < 3 && (weak.len() == 1 || (weak[0] && weak[1]))
    }
}
