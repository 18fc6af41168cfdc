//! The two translator flavors and their shared key-factor derivation.
//!
//! A translator owns a party's long-lived key material and performs single
//! translation steps on ciphertexts passing through it. Key factors are
//! derived deterministically per recipient; the translation itself draws
//! fresh randomness on every call.

pub mod data;
pub mod pseudonym;

pub use data::DataTranslator;
pub use pseudonym::PseudonymTranslator;

use std::sync::Arc;

use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256, Sha512};

use crate::curve::Scalar;
use crate::keys::{KeyDomain, KeyFactorSecret};

/// Key material a translator is constructed with.
///
/// The reshuffle slot is optional: a translator without it cannot
/// pseudonymize (pseudonym domain) or blind (data domain) and is what a
/// transcryptor-class server runs with.
#[derive(Clone)]
pub struct TranslatorKeys {
    pub domain: KeyDomain,
    pub reshuffle: Option<KeyFactorSecret>,
    pub rekey: KeyFactorSecret,
    pub master_private_key_share: Scalar,
}

/// The pair of factors for one recipient.
#[derive(Clone, Copy, Debug)]
pub struct KeyFactors {
    /// Pseudonymization / blinding factor.
    pub reshuffle: Scalar,
    /// Encryption factor.
    pub rekey: Scalar,
}

/// Derive a key factor for one recipient.
///
/// Deterministic: the same `(secret, domain, kind, payload)` yields a
/// bit-identical scalar across process restarts and threads. The secret
/// goes through HMAC so factors for different domains or recipients are
/// unlinkable.
pub(crate) fn derive_key_factor(
    secret: &KeyFactorSecret,
    domain: KeyDomain,
    kind_tag: u32,
    payload: &[u8],
) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(domain.tag().to_be_bytes());
    hasher.update(kind_tag.to_be_bytes());
    hasher.update(payload);
    let digest = hasher.finalize();

    let mut mac =
        Hmac::<Sha512>::new_from_slice(secret.hmac_key()).expect("HMAC accepts any key length");
    mac.update(&digest);
    let bytes: [u8; 64] = mac.finalize().into_bytes().into();
    Scalar::from_64_bytes(&bytes)
}

/// Internally synchronized CPRNG shared by a translator's randomized
/// operations. Cloning shares the underlying generator.
#[derive(Clone)]
pub struct SharedRng(Arc<Mutex<StdRng>>);

impl SharedRng {
    pub fn from_entropy() -> Self {
        SharedRng(Arc::new(Mutex::new(StdRng::from_entropy())))
    }

    /// Deterministic generator for test seeding.
    pub fn seeded(seed: u64) -> Self {
        SharedRng(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
    }

    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.0.lock();
        f(&mut rng)
    }
}
