//! Deterministic random number generation for synthetic ledgers.
//!
//! RULE: Synthetic data never calls any platform RNG.
//! Each generation stream is seeded from (master_seed, stream index) so the
//! same seed always yields the same ledger.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Seeded generator for one synthetic-ledger stream.
pub struct LedgerRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl LedgerRng {
    /// `stream_index` is part of the seed; changing it changes every draw.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let seed = master_seed ^ stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self { name: "unnamed", inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform in [0, n). Zero when `n` is zero.
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.inner.gen_range(0..n)
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Heavy-tailed draw with minimum `floor`; lower `shape` means a longer tail.
    pub fn pareto(&mut self, floor: f64, shape: f64) -> f64 {
        let u = self.next_f64().max(1e-10);
        floor * u.powf(-1.0 / shape)
    }
}

/// Stream slots. Append new streams; existing indices are fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum LedgerStream {
    Donors = 0,
    Gifts = 1,
    Anonymous = 2,
}

impl LedgerStream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Donors => "donors",
            Self::Gifts => "gifts",
            Self::Anonymous => "anonymous",
        }
    }

    pub fn rng(self, master_seed: u64) -> LedgerRng {
        LedgerRng::new(master_seed, self as u64).with_name(self.name())
    }
}
