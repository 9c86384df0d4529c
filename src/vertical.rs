//! Verification layers over the full keys.
//!
//! The default layout is vertical: plane `j` of key `i` packs bit `j` of
//! every position into one word, so a key of up to 64 positions verifies
//! in at most `ceil(log2 A)` XOR/OR/popcount steps. OR-ing the plane
//! differences into an accumulator marks each position where any bit
//! differs, the popcount of the accumulator is the Hamming distance so
//! far, and the loop exits as soon as it exceeds the radius.
//!
//! The row-major layout keeps the keys as packed symbols and compares
//! positionwise with the same early exit. Both layouts answer
//! identically; row-major is kept for comparison runs.

use crate::bits::{width_for, IntVec};
use crate::Symbol;

/// Packs bit `level` of every position of `key` into one word.
pub fn vertical_code<S: Symbol>(key: &[S], level: u32) -> u64 {
    assert!(
        key.len() <= 64,
        "hmsearch::vertical_code(): key length {} > 64",
        key.len()
    );
    let mut code = 0u64;
    for (j, &s) in key.iter().enumerate() {
        code |= u64::from((s.to_u32() >> level) & 1) << j;
    }
    code
}

/// Which key layout `HmIndex::build` materialises for verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyLayout {
    /// Column-major bit planes (default).
    Vertical,
    /// Row-major packed symbols.
    RowMajor,
}

pub(crate) enum KeyStore {
    Vertical(VerticalKeys),
    RowMajor(PackedKeys),
}

impl KeyStore {
    pub(crate) fn num_keys(&self) -> usize {
        match self {
            KeyStore::Vertical(v) => v.num_keys(),
            KeyStore::RowMajor(p) => p.num_keys(),
        }
    }

    pub(crate) fn heap_bytes(&self) -> usize {
        match self {
            KeyStore::Vertical(v) => v.heap_bytes(),
            KeyStore::RowMajor(p) => p.heap_bytes(),
        }
    }
}

/// Column-major bit-plane copy of the keys.
pub struct VerticalKeys {
    planes: IntVec,
    levels: u32,
}

impl VerticalKeys {
    pub fn build<S: Symbol>(keys: &[&[S]], length: u32, alphabet_size: u32) -> Self {
        let levels = width_for(u64::from(alphabet_size.saturating_sub(1)));
        let mut planes = IntVec::new(keys.len() * levels as usize, length);
        for (i, key) in keys.iter().enumerate() {
            let beg = i * levels as usize;
            for j in 0..levels {
                planes.set(beg + j as usize, vertical_code(key, j));
            }
        }
        Self { planes, levels }
    }

    /// Number of bit planes per key.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn num_keys(&self) -> usize {
        self.planes.len() / self.levels as usize
    }

    /// Encodes the query's planes with the same packing rule as the keys.
    pub fn encode_query<S: Symbol>(&self, query: &[S]) -> Vec<u64> {
        (0..self.levels).map(|j| vertical_code(query, j)).collect()
    }

    /// Hamming distance between key `id` and the encoded query, stopping
    /// once it exceeds `range`.
    ///
    /// The result is exact when it is at most `range`; a short-circuited
    /// result is only guaranteed to be greater than `range`.
    pub fn distance_within(&self, id: u32, query_planes: &[u64], range: u32) -> u32 {
        let beg = id as usize * self.levels as usize;
        let mut cumdiff = 0u64;
        let mut dist = 0u32;
        for (j, &q) in query_planes.iter().enumerate() {
            cumdiff |= self.planes.get(beg + j) ^ q;
            dist = cumdiff.count_ones();
            if dist > range {
                break;
            }
        }
        dist
    }

    pub fn heap_bytes(&self) -> usize {
        self.planes.heap_bytes()
    }
}

/// Row-major packed copy of the keys.
pub struct PackedKeys {
    data: IntVec,
    length: u32,
}

impl PackedKeys {
    pub fn build<S: Symbol>(keys: &[&[S]], length: u32, alphabet_size: u32) -> Self {
        let mut data = IntVec::new(
            keys.len() * length as usize,
            width_for(u64::from(alphabet_size.saturating_sub(1))),
        );
        for (i, key) in keys.iter().enumerate() {
            data.fill_from(
                i * length as usize,
                key.iter().map(|&s| u64::from(s.to_u32())),
            );
        }
        Self { data, length }
    }

    pub fn num_keys(&self) -> usize {
        if self.length == 0 {
            0
        } else {
            self.data.len() / self.length as usize
        }
    }

    /// Symbolwise Hamming distance with the same early-exit contract as
    /// [`VerticalKeys::distance_within`].
    pub fn distance_within<S: Symbol>(&self, id: u32, query: &[S], range: u32) -> u32 {
        let beg = id as usize * self.length as usize;
        let mut dist = 0u32;
        for (j, &q) in query.iter().enumerate() {
            if self.data.get(beg + j) != u64::from(q.to_u32()) {
                dist += 1;
                if dist > range {
                    break;
                }
            }
        }
        dist
    }

    pub fn heap_bytes(&self) -> usize {
        self.data.heap_bytes()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hamming_distance;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn codes_pack_one_bit_per_position() {
        let key: &[u8] = &[0b01, 0b10, 0b11, 0b00];
        assert_eq!(vertical_code(key, 0), 0b0101);
        assert_eq!(vertical_code(key, 1), 0b0110);
    }

    #[test]
    fn matches_naive_distance() {
        let mut rng = SmallRng::seed_from_u64(7);
        let keys_buf: Vec<Vec<u8>> = (0..64)
            .map(|_| (0..20).map(|_| rng.gen_range(0..50) as u8).collect())
            .collect();
        let keys: Vec<&[u8]> = keys_buf.iter().map(|k| &k[..]).collect();
        let verticals = VerticalKeys::build(&keys, 20, 50);
        assert_eq!(verticals.levels(), 6);
        assert_eq!(verticals.num_keys(), 64);

        let query: Vec<u8> = (0..20).map(|_| rng.gen_range(0..50) as u8).collect();
        let planes = verticals.encode_query(&query[..]);
        for (i, key) in keys.iter().enumerate() {
            let naive = hamming_distance(*key, &query[..]);
            assert_eq!(verticals.distance_within(i as u32, &planes, 20), naive);
        }
    }

    #[test]
    fn short_circuits_past_the_radius() {
        let keys: [&[u8]; 1] = [&[0xff; 8]];
        let verticals = VerticalKeys::build(&keys, 8, 256);
        let planes = verticals.encode_query(&[0u8; 8]);
        assert!(verticals.distance_within(0, &planes, 3) > 3);
    }

    #[test]
    fn layouts_agree() {
        let mut rng = SmallRng::seed_from_u64(11);
        let keys_buf: Vec<Vec<u8>> = (0..32)
            .map(|_| (0..17).map(|_| rng.gen_range(0..200) as u8).collect())
            .collect();
        let keys: Vec<&[u8]> = keys_buf.iter().map(|k| &k[..]).collect();
        let verticals = VerticalKeys::build(&keys, 17, 200);
        let packed = PackedKeys::build(&keys, 17, 200);
        assert_eq!(verticals.num_keys(), packed.num_keys());

        let query: Vec<u8> = (0..17).map(|_| rng.gen_range(0..200) as u8).collect();
        let planes = verticals.encode_query(&query[..]);
        for i in 0..keys.len() as u32 {
            assert_eq!(
                verticals.distance_within(i, &planes, 17),
                packed.distance_within(i, &query[..], 17),
            );
        }
    }
}
