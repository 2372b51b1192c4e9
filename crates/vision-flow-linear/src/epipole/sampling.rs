//! Reproducible subsampling compatible with NumPy's legacy `RandomState`.
//!
//! `RandomState(seed).permutation(a)` seeds MT19937 with `init_genrand(seed)`
//! and runs a Fisher-Yates shuffle from the back, drawing each swap index by
//! masked rejection sampling on 32-bit outputs. Reproducing those three
//! pieces exactly gives the same permutation on every platform.

use rand_mt::Mt;

/// Uniform integer in `[0, max]` by masked rejection sampling.
fn bounded(rng: &mut Mt, max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let mut mask = max;
    mask |= mask >> 1;
    mask |= mask >> 2;
    mask |= mask >> 4;
    mask |= mask >> 8;
    mask |= mask >> 16;
    mask |= mask >> 32;

    if max <= u64::from(u32::MAX) {
        loop {
            let value = u64::from(rng.next_u32()) & mask;
            if value <= max {
                return value;
            }
        }
    } else {
        loop {
            let hi = u64::from(rng.next_u32());
            let lo = u64::from(rng.next_u32());
            let value = ((hi << 32) | lo) & mask;
            if value <= max {
                return value;
            }
        }
    }
}

/// Shuffled copy of `items`, identical to `RandomState(seed).permutation(items)`.
pub fn legacy_permutation<T: Copy>(items: &[T], seed: u32) -> Vec<T> {
    let mut rng = Mt::new(seed);
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = bounded(&mut rng, i as u64) as usize;
        out.swap(i, j);
    }
    out
}

/// First `limit` entries of the seeded permutation of `items`.
pub fn subsample<T: Copy>(items: &[T], seed: u32, limit: usize) -> Vec<T> {
    let mut out = legacy_permutation(items, seed);
    out.truncate(limit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_matches_reference_seeding() {
        assert_eq!(Mt::new(5489).next_u32(), 3_499_211_612);
        assert_eq!(Mt::new(10).next_u32(), 3_312_796_937);
    }

    #[test]
    fn permutation_matches_numpy_reference() {
        let idx: Vec<usize> = (0..10).collect();
        assert_eq!(legacy_permutation(&idx, 10), vec![8, 2, 5, 6, 3, 1, 0, 7, 4, 9]);

        let sparse = [3usize, 7, 11, 19, 23, 42, 57];
        assert_eq!(legacy_permutation(&sparse, 10), vec![11, 57, 3, 19, 23, 42, 7]);

        let big: Vec<usize> = (0..5000).collect();
        assert_eq!(
            subsample(&big, 10, 8),
            vec![245, 4493, 4583, 2242, 3407, 807, 693, 515]
        );
    }

    #[test]
    fn small_inputs_are_untouched() {
        let empty: [usize; 0] = [];
        assert!(legacy_permutation(&empty, 10).is_empty());
        assert_eq!(legacy_permutation(&[5usize], 10), vec![5]);
        assert_eq!(subsample(&[1usize, 2, 3], 10, 10).len(), 3);
    }
}
