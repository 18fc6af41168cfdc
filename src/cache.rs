//! Memoization for the hot translation path.
//!
//! Translation requests keep multiplying into the same handful of base
//! points (the master public key of incoming ciphertexts) and keep reusing
//! the same per-recipient key factors, whose inversion is the expensive
//! scalar operation. Both are cached here under coarse generation counters:
//! advancing a generation invalidates every entry of that kind, and stale
//! entries are dropped lazily on their next access.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rand::{CryptoRng, RngCore};
use serde::Serialize;

use crate::curve::{GroupElement, Scalar, ScalarMultTable, PACKED_BYTES};
use crate::elgamal::Encryption;
use crate::error::CryptoError;

const LOG_TARGET: &str = "transcrypt::cache";

static GLOBAL: Lazy<RskCache> = Lazy::new(RskCache::new);

struct TableEntry {
    generation: u64,
    table: ScalarMultTable,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct FactorKey {
    z: [u8; PACKED_BYTES],
    k: [u8; PACKED_BYTES],
}

#[derive(Clone, Copy)]
struct FactorEntry {
    generation: u64,
    z_over_k: Scalar,
    k_inv: Scalar,
}

/// Point-in-time snapshot of the cache counters.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CacheMetrics {
    pub table_hits: u64,
    pub table_misses: u64,
    pub rsk_uses: u64,
    pub table_generation: u64,
    pub rsk_generation: u64,
}

pub struct RskCache {
    tables: DashMap<[u8; PACKED_BYTES], Arc<TableEntry>>,
    factors: DashMap<FactorKey, FactorEntry>,
    table_generation: AtomicU64,
    rsk_generation: AtomicU64,
    table_hits: AtomicU64,
    table_misses: AtomicU64,
    rsk_uses: AtomicU64,
}

impl RskCache {
    pub fn new() -> Self {
        RskCache {
            tables: DashMap::new(),
            factors: DashMap::new(),
            table_generation: AtomicU64::new(0),
            rsk_generation: AtomicU64::new(0),
            table_hits: AtomicU64::new(0),
            table_misses: AtomicU64::new(0),
            rsk_uses: AtomicU64::new(0),
        }
    }

    /// The process-wide cache shared by all translators.
    pub fn global() -> &'static RskCache {
        &GLOBAL
    }

    pub fn table_generation(&self) -> u64 {
        self.table_generation.load(Ordering::Acquire)
    }

    pub fn rsk_generation(&self) -> u64 {
        self.rsk_generation.load(Ordering::Acquire)
    }

    /// Invalidate all cached scalar-mult tables. Entries are evicted on
    /// their next access.
    pub fn advance_table_generation(&self) {
        let generation = self.table_generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(target: LOG_TARGET, generation, "table generation advanced");
    }

    /// Invalidate all cached per-recipient factor data.
    pub fn advance_rsk_generation(&self) {
        let generation = self.rsk_generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(target: LOG_TARGET, generation, "rsk generation advanced");
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            table_hits: self.table_hits.load(Ordering::Relaxed),
            table_misses: self.table_misses.load(Ordering::Relaxed),
            rsk_uses: self.rsk_uses.load(Ordering::Relaxed),
            table_generation: self.table_generation(),
            rsk_generation: self.rsk_generation(),
        }
    }

    /// Rerandomize-reshuffle-rekey through the cache.
    pub fn rsk(
        &self,
        encryption: &Encryption,
        z: &Scalar,
        k: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Encryption, CryptoError> {
        encryption.checked()?;
        self.rsk_uses.fetch_add(1, Ordering::Relaxed);

        let (z_over_k, _) = self.factors_for(z, k);
        let table = self.table_for(&encryption.y);
        let r = Scalar::random(rng);
        let ry = table.table.mult(&r);
        let rb = GroupElement::base_mult(&r);

        Ok(Encryption {
            b: (encryption.b + rb).mult(&z_over_k),
            c: (encryption.c + ry).mult(z),
            y: encryption.y.mult(k),
        })
    }

    /// Rerandomize-rekey through the cache (no reshuffle).
    pub fn rerandomize_rekey(
        &self,
        encryption: &Encryption,
        k: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Encryption, CryptoError> {
        encryption.checked()?;
        self.rsk_uses.fetch_add(1, Ordering::Relaxed);

        // z/k with z = 1 is exactly k⁻¹.
        let (k_inv, _) = self.factors_for(&Scalar::one(), k);
        let table = self.table_for(&encryption.y);
        let r = Scalar::random(rng);
        let ry = table.table.mult(&r);
        let rb = GroupElement::base_mult(&r);

        Ok(Encryption {
            b: (encryption.b + rb).mult(&k_inv),
            c: encryption.c + ry,
            y: encryption.y.mult(k),
        })
    }

    /// Fetch or build the scalar-mult table for `base`, honoring the current
    /// table generation.
    fn table_for(&self, base: &GroupElement) -> Arc<TableEntry> {
        let generation = self.table_generation();
        let key = base.pack();

        if let Some(entry) = self.tables.get(&key) {
            if entry.generation == generation {
                self.table_hits.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(&entry);
            }
        }
        // Either absent or built under an older generation.
        self.table_misses.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(TableEntry {
            generation,
            table: ScalarMultTable::new(base),
        });
        self.tables.insert(key, Arc::clone(&entry));
        tracing::debug!(target: LOG_TARGET, base = %base.to_text(), generation, "table installed");
        entry
    }

    /// Fetch or compute `(z/k, k⁻¹)` for a recipient's key factors, honoring
    /// the current RSK generation.
    fn factors_for(&self, z: &Scalar, k: &Scalar) -> (Scalar, Scalar) {
        let generation = self.rsk_generation();
        let key = FactorKey {
            z: z.pack(),
            k: k.pack(),
        };

        if let Some(entry) = self.factors.get(&key) {
            if entry.generation == generation {
                return (entry.z_over_k, entry.k_inv);
            }
        }
        let k_inv = k.invert();
        let z_over_k = *z * k_inv;
        self.factors.insert(
            key,
            FactorEntry {
                generation,
                z_over_k,
                k_inv,
            },
        );
        (z_over_k, k_inv)
    }
}

impl Default for RskCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_rng;

    #[test]
    fn cached_rsk_matches_plain_rsk_semantics() {
        let mut rng = test_rng();
        let cache = RskCache::new();
        let sk = Scalar::random(&mut rng);
        let pk = GroupElement::base_mult(&sk);
        let msg = GroupElement::random(&mut rng);
        let z = Scalar::random(&mut rng);
        let k = Scalar::random(&mut rng);

        let enc = Encryption::encrypt(&pk, &msg, &mut rng).unwrap();
        let translated = cache.rsk(&enc, &z, &k, &mut rng).unwrap();
        assert_eq!(translated.decrypt(&(sk * k)).unwrap(), msg.mult(&z));
        assert_eq!(translated.y, pk.mult(&k));
    }

    #[test]
    fn cached_rerandomize_rekey_preserves_plaintext() {
        let mut rng = test_rng();
        let cache = RskCache::new();
        let sk = Scalar::random(&mut rng);
        let pk = GroupElement::base_mult(&sk);
        let msg = GroupElement::random(&mut rng);
        let k = Scalar::random(&mut rng);

        let enc = Encryption::encrypt(&pk, &msg, &mut rng).unwrap();
        let rekeyed = cache.rerandomize_rekey(&enc, &k, &mut rng).unwrap();
        assert_ne!(rekeyed, enc);
        assert_eq!(rekeyed.decrypt(&(sk * k)).unwrap(), msg);
    }

    #[test]
    fn table_reuse_counts_hits() {
        let mut rng = test_rng();
        let cache = RskCache::new();
        let sk = Scalar::random(&mut rng);
        let pk = GroupElement::base_mult(&sk);
        let msg = GroupElement::random(&mut rng);
        let z = Scalar::random(&mut rng);
        let k = Scalar::random(&mut rng);
        let enc = Encryption::encrypt(&pk, &msg, &mut rng).unwrap();

        cache.rsk(&enc, &z, &k, &mut rng).unwrap();
        cache.rsk(&enc, &z, &k, &mut rng).unwrap();
        cache.rsk(&enc, &z, &k, &mut rng).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.rsk_uses, 3);
        assert_eq!(metrics.table_misses, 1);
        assert_eq!(metrics.table_hits, 2);
    }

    #[test]
    fn generation_advance_evicts_lazily() {
        let mut rng = test_rng();
        let cache = RskCache::new();
        let sk = Scalar::random(&mut rng);
        let pk = GroupElement::base_mult(&sk);
        let msg = GroupElement::random(&mut rng);
        let z = Scalar::random(&mut rng);
        let k = Scalar::random(&mut rng);
        let enc = Encryption::encrypt(&pk, &msg, &mut rng).unwrap();

        cache.rsk(&enc, &z, &k, &mut rng).unwrap();
        cache.advance_table_generation();
        cache.advance_rsk_generation();

        // Entry from the old generation is rebuilt, and the result is still
        // correct.
        let translated = cache.rsk(&enc, &z, &k, &mut rng).unwrap();
        assert_eq!(translated.decrypt(&(sk * k)).unwrap(), msg.mult(&z));

        let metrics = cache.metrics();
        assert_eq!(metrics.table_misses, 2);
        assert_eq!(metrics.table_generation, 1);
        assert_eq!(metrics.rsk_generation, 1);
    }

    #[test]
    fn rejects_zero_public_key() {
        let mut rng = test_rng();
        let cache = RskCache::new();
        let msg = GroupElement::random(&mut rng);
        let bogus = Encryption::new(msg, msg, GroupElement::identity());
        let z = Scalar::random(&mut rng);
        assert_eq!(
            cache.rsk(&bogus, &z, &z, &mut rng),
            Err(CryptoError::ZeroPublicKey)
        );
    }
}
