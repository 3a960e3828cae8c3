use rand::Rng;
use rand::seq::index;

/// `count` distinct indices drawn uniformly from `0..pool_size`, in random order.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
    count: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(count <= pool_size);
    index::sample(rng, pool_size, count).into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_indices_are_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut idx = distinct_indices(8, 20, &mut rng);
        assert_eq!(idx.len(), 8);
        assert!(idx.iter().all(|&i| i < 20));
        idx.sort_unstable();
        idx.dedup();
        assert_eq!(idx.len(), 8);
    }
}
