//! Weighted random engine.
//!
//! One [`Generator`] is live per build. It is seeded from a string through
//! SHA3 so that any host-supplied label ("test-1", "R7-weekly") maps to the
//! same numeric stream on every platform. Every combinator here is a pure
//! function of the generator state and returns a documented default on empty
//! input instead of panicking.

pub mod pool;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use sha3::{Digest, Sha3_256};

pub use pool::{FrequencyEntry, FrequencyPool};

/// Derive the numeric seed for a seed string (first 8 bytes of SHA3-256, LE)
pub fn seed_from_str(value: &str) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

/// Seeded generator threaded through every generation call
#[derive(Debug, Clone)]
pub struct Generator {
    seed: String,
    rng: Xoshiro256StarStar,
    draws: u64,
}

impl Generator {
    pub fn seeded(value: &str) -> Self {
        Self {
            seed: value.to_string(),
            rng: Xoshiro256StarStar::seed_from_u64(seed_from_str(value)),
            draws: 0,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of primitive draws taken so far. Two runs that diverge in this
    /// count have diverged in their call sequence.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform float in `[0, 1)`
    pub fn unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    /// Uniform float in `[lo, hi)`; returns `lo` when the range is empty
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + self.unit() * (hi - lo)
    }

    /// Uniform integer in `lo..=hi`; returns `lo` when `hi < lo`
    pub fn range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        self.draws += 1;
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform index in `0..len`; `None` for `len == 0`
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.draws += 1;
        Some(self.rng.gen_range(0..len))
    }

    /// Bernoulli trial. `flip(0.0)` is always false, `flip(1.0)` always true.
    pub fn flip(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            // still consume a draw so the stream does not depend on the table value
            self.unit();
            return false;
        }
        self.unit() < probability
    }

    /// Uniformly random element; `None` on an empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        self.index(items.len()).map(|i| &items[i])
    }

    /// Pick and remove (sampling without replacement); `None` when empty
    pub fn draw<T>(&mut self, items: &mut Vec<T>) -> Option<T> {
        self.index(items.len()).map(|i| items.remove(i))
    }

    /// Weighted index over relative weights. Negative weights count as zero.
    /// Falls back to the last index when floating rounding leaves the roll at
    /// the upper boundary (or when every weight is zero).
    pub fn select_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        let roll = self.unit() * total;
        let mut accumulated = 0.0;
        for (i, weight) in weights.iter().enumerate() {
            accumulated += weight.max(0.0);
            if roll < accumulated {
                return Some(i);
            }
        }
        Some(weights.len() - 1)
    }

    /// Weighted pick over `(weight, item)` entries
    pub fn select<'a, T>(&mut self, entries: &'a [(f64, T)]) -> Option<&'a T> {
        let weights: Vec<f64> = entries.iter().map(|(w, _)| *w).collect();
        self.select_index(&weights).map(|i| &entries[i].1)
    }

    /// Weighted pick over `(weight, item)` entries, copying the item out
    pub fn select_copy<T: Copy>(&mut self, entries: &[(f64, T)]) -> Option<T> {
        self.select(entries).copied()
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            self.draws += 1;
            let j = self.rng.gen_range(0..=i);
            items.swap(i, j);
        }
    }

    /// Weighted draw with decrementing stock; see [`FrequencyPool::draw`]
    pub fn draw_select<T: Clone>(&mut self, pool: &mut FrequencyPool<T>) -> Option<T> {
        pool.draw(self)
    }
}

/// Anything that owns the build's generator. Lets [`select_run`] choose a
/// template with the generator and then hand the template `&mut` access to
/// the whole owner.
pub trait RandomSource {
    fn generator(&mut self) -> &mut Generator;
}

impl RandomSource for Generator {
    fn generator(&mut self) -> &mut Generator {
        self
    }
}

/// A weighted effectful template
pub type Template<'a, C, R> = (f64, Box<dyn FnOnce(&mut C) -> R + 'a>);

/// Box a closure into a [`Template`]
pub fn template<'a, C, R>(weight: f64, action: impl FnOnce(&mut C) -> R + 'a) -> Template<'a, C, R> {
    (weight, Box::new(action))
}

/// Pick one weighted closure and run only that one. Returns `None` for an
/// empty template list.
pub fn select_run<'a, C, R>(ctx: &mut C, templates: Vec<Template<'a, C, R>>) -> Option<R>
where
    C: RandomSource,
{
    let weights: Vec<f64> = templates.iter().map(|(w, _)| *w).collect();
    let index = ctx.generator().select_index(&weights)?;
    let (_, action) = templates.into_iter().nth(index)?;
    Some(action(ctx))
}
