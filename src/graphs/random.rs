//! A sequential Erdos-Renyi random graph generator, mainly useful for
//! exercising the compressor and decoders in tests without needing a real
//! graph on disk.

use rand::{Rng, SeedableRng, rngs::SmallRng};

/// An Erdos-Renyi random graph: `n` nodes, an independent probability `p` of
/// an arc between any ordered pair of distinct nodes, generated
/// deterministically from `seed`. Time to iterate the whole graph is
/// `O(n^2)`; this is meant for tests and small examples, not for building
/// graphs worth compressing.
#[derive(Debug, Clone)]
pub struct ErdosRenyi {
    n: usize,
    p: f64,
    seed: u64,
}

impl ErdosRenyi {
    pub fn new(n: usize, p: f64, seed: u64) -> Self {
        assert!((0.0..=1.0).contains(&p), "p must be in [0, 1]");
        ErdosRenyi { n, p, seed }
    }

    pub fn num_nodes(&self) -> usize {
        self.n
    }

    /// Iterates `(node, successors)` pairs for `node` in `0..n`, in order.
    pub fn iter(&self) -> Iter {
        Iter {
            n: self.n,
            p: self.p,
            x: 0,
            rng: SmallRng::seed_from_u64(self.seed),
        }
    }
}

/// See [`ErdosRenyi::iter`].
pub struct Iter {
    n: usize,
    p: f64,
    x: usize,
    rng: SmallRng,
}

impl Iterator for Iter {
    type Item = (usize, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.x >= self.n {
            return None;
        }
        let x = self.x;
        let successors = (0..self.n)
            .filter(|&y| y != x && self.rng.random_bool(self.p))
            .collect();
        self.x += 1;
        Some((x, successors))
    }
}
