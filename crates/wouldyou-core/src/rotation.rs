use std::collections::HashSet;

use rand::Rng;

use crate::pool::PoolEntry;

/// Picks a candidate whose option pair is not in `used`, uniformly at random.
///
/// Once every candidate has been used inside the window the whole pool is
/// eligible again. Returns `None` only for an empty pool.
pub fn pick_candidate<'a, R>(pool: &'a [PoolEntry], used: &HashSet<String>, rng: &mut R) -> Option<&'a PoolEntry>
where
    R: Rng,
{
    let fresh: Vec<&PoolEntry> = pool.iter().filter(|c| !used.contains(&c.pair_key())).collect();

    if fresh.is_empty() {
        return pick(pool.iter().collect(), rng);
    }
    pick(fresh, rng)
}

/// Uniform pick from an already filtered candidate list.
pub fn pick<T, R>(mut candidates: Vec<T>, rng: &mut R) -> Option<T>
where
    R: Rng,
{
    if candidates.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..candidates.len());
    Some(candidates.swap_remove(idx))
}
