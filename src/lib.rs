//! Hamming-range search over a static dictionary of fixed-length symbol
//! strings.
//!
//! Given a dictionary of `N` strings of length `L` over the alphabet
//! `{0, …, A−1}` and a query `q` with radius `R`, the index reports the
//! id of every dictionary string within Hamming distance `R` of `q`.
//!
//! The string positions `[0, L)` are split into `B = ⌈(R+2)/2⌉`
//! contiguous buckets whose lengths differ by at most one:
//!
//! ```text
//! positions   0 1 2 3 4 | 5 6 7 8 9 | …
//! bucket           0    |     1     | …
//! ```
//!
//! If a key is within distance `R` of the query, the differing positions
//! cannot put two or more into every bucket: `2B ≥ R + 2` leaves at
//! least one bucket holding at most one difference. Within a bucket,
//! distance ≤ 1 is detectable from single deletions. Replacing one
//! position of a slice by a sentinel yields its *one-deletion variants*,
//! and two slices share a variant exactly when they differ in at most
//! the deleted position. Each bucket therefore indexes every variant of
//! every key slice in an open-addressed table ([`OdvIndex`]), and a
//! query probes its own variants per bucket — a true match is guaranteed
//! to surface in at least one bucket.
//!
//! Per-bucket hits are aggregated per candidate id. An exact bucket
//! match hits all of the slice's variants while a distance-1 match
//! shares exactly one, so the hit count classifies each hit bucket as
//! strong (exact) or weak evidence, and candidates whose evidence
//! pattern cannot reach distance `R` are dropped before any distance is
//! computed. Survivors are verified against a column-major bit-plane
//! copy of the keys ([`VerticalKeys`]): plane `j` of key `i` packs bit
//! `j` of every symbol into one `L`-bit word, so verification is at most
//! `⌈log₂ A⌉` XOR/OR/popcount steps with an early exit once the radius
//! is exceeded.
//!
//! The index is immutable after [`HmIndex::build`]; [`HmIndex::search`]
//! keeps all per-query scratch on its own stack, so a built index can be
//! shared freely across threads.

pub mod bits;
pub mod index;
pub mod odv;
pub mod sig;
pub mod vertical;

pub use crate::index::HmIndex;
pub use crate::odv::OdvIndex;
pub use crate::sig::Signature;
pub use crate::vertical::{KeyLayout, PackedKeys, VerticalKeys};

/// A dictionary symbol. Implemented for the unsigned integer types that
/// fit the 32-bit symbol space.
pub trait Symbol: Copy {
    fn to_u32(self) -> u32;
}

impl Symbol for u8 {
    fn to_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Symbol for u16 {
    fn to_u32(self) -> u32 {
        u32::from(self)
    }
}

impl Symbol for u32 {
    fn to_u32(self) -> u32 {
        self
    }
}

/// Returns the bucket count an index must be built with to answer
/// radius-`range` queries: `⌈(range + 2) / 2⌉`.
///
/// ```
/// # use hmsearch::proper_buckets;
/// assert_eq!(proper_buckets(0), 1);
/// assert_eq!(proper_buckets(1), 2);
/// assert_eq!(proper_buckets(2), 2);
/// assert_eq!(proper_buckets(10), 6);
/// ```
pub fn proper_buckets(range: u32) -> u32 {
    (range + 3) / 2
}

/// Naive symbolwise Hamming distance between two equal-length strings.
///
/// ```
/// # use hmsearch::hamming_distance;
/// assert_eq!(hamming_distance(&[0u8, 1, 2, 3], &[0u8, 1, 3, 3]), 1);
/// ```
pub fn hamming_distance<S: Symbol>(x: &[S], y: &[S]) -> u32 {
    assert_eq!(
        x.len(),
        y.len(),
        "hmsearch::hamming_distance(): length mismatch"
    );
    x.iter()
        .zip(y.iter())
        .filter(|(a, b)| a.to_u32() != b.to_u32())
        .count() as u32
}
