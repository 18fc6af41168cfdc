//! ElGamal encryption over the Ristretto group, with the translation
//! primitives the rest of the crate is built on: rerandomize, reshuffle,
//! rekey, and the combined RSK step.

use rand::{CryptoRng, RngCore};

use crate::curve::{GroupElement, Scalar, PACKED_BYTES};
use crate::error::CryptoError;

/// Packed size of an `Encryption`: `B ∥ C ∥ Y`.
pub const ENCRYPTION_PACKED_BYTES: usize = 3 * PACKED_BYTES;

/// An ElGamal ciphertext `(B, C, Y)` with `B = rG` and `C = M + rY`, kept
/// together with the public key `Y` it was produced under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Encryption {
    pub b: GroupElement,
    pub c: GroupElement,
    pub y: GroupElement,
}

impl Encryption {
    pub fn new(b: GroupElement, c: GroupElement, y: GroupElement) -> Self {
        Encryption { b, c, y }
    }

    /// Encrypt a group element under `pk` with fresh randomness.
    pub fn encrypt(
        pk: &GroupElement,
        msg: &GroupElement,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        if pk.is_identity() {
            return Err(CryptoError::ZeroPublicKey);
        }
        let r = Scalar::random(rng);
        Ok(Encryption {
            b: GroupElement::base_mult(&r),
            c: *msg + pk.mult(&r),
            y: *pk,
        })
    }

    /// Recover the message: `C - sk·B`. Constant-time in `sk`.
    pub fn decrypt(&self, sk: &Scalar) -> Result<GroupElement, CryptoError> {
        self.checked()?;
        Ok(self.c - self.b.mult(sk))
    }

    /// Fresh randomness, same plaintext and key: `(B + r'G, C + r'Y, Y)`.
    pub fn rerandomize(&self, rng: &mut (impl RngCore + CryptoRng)) -> Result<Self, CryptoError> {
        self.checked()?;
        let r = Scalar::random(rng);
        Ok(Encryption {
            b: self.b + GroupElement::base_mult(&r),
            c: self.c + self.y.mult(&r),
            y: self.y,
        })
    }

    /// Multiply the underlying message by `z`: `(zB, zC, Y)`.
    pub fn reshuffle(&self, z: &Scalar) -> Result<Self, CryptoError> {
        self.checked()?;
        Ok(Encryption {
            b: self.b.mult(z),
            c: self.c.mult(z),
            y: self.y,
        })
    }

    /// Change the recipient key to `kY` while preserving the plaintext:
    /// `(B/k, C, kY)`.
    pub fn rekey(&self, k: &Scalar) -> Result<Self, CryptoError> {
        self.checked()?;
        Ok(Encryption {
            b: self.b.mult(&k.invert()),
            c: self.c,
            y: self.y.mult(k),
        })
    }

    /// The elementary translation step: rerandomize, reshuffle by `z`, and
    /// rekey by `k` in one pass.
    ///
    /// Maps `(B, C, Y)` to `((z/k)(B + rG), z(C + rY), kY)` for fresh `r`.
    pub fn rsk(
        &self,
        z: &Scalar,
        k: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        self.checked()?;
        let r = Scalar::random(rng);
        let z_over_k = *z * k.invert();
        Ok(Encryption {
            b: (self.b + GroupElement::base_mult(&r)).mult(&z_over_k),
            c: (self.c + self.y.mult(&r)).mult(z),
            y: self.y.mult(k),
        })
    }

    /// Rerandomize-and-reshuffle, used for pseudonym-only steps that leave
    /// the recipient key unchanged.
    pub fn rerandomize_reshuffle(
        &self,
        z: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        self.rerandomize(rng)?.reshuffle(z)
    }

    /// Rerandomize-and-rekey, used for data steps that do not touch the
    /// message.
    pub fn rerandomize_rekey(
        &self,
        k: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, CryptoError> {
        self.rerandomize(rng)?.rekey(k)
    }

    /// Reject ciphertexts carrying the identity as public key.
    pub(crate) fn checked(&self) -> Result<&Self, CryptoError> {
        if self.y.is_identity() {
            return Err(CryptoError::ZeroPublicKey);
        }
        Ok(self)
    }

    pub fn pack(&self) -> [u8; ENCRYPTION_PACKED_BYTES] {
        let mut out = [0u8; ENCRYPTION_PACKED_BYTES];
        out[..PACKED_BYTES].copy_from_slice(&self.b.pack());
        out[PACKED_BYTES..2 * PACKED_BYTES].copy_from_slice(&self.c.pack());
        out[2 * PACKED_BYTES..].copy_from_slice(&self.y.pack());
        out
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        if packed.len() != ENCRYPTION_PACKED_BYTES {
            return Err(CryptoError::BadEncoding("encryption"));
        }
        let part = |i: usize| -> Result<GroupElement, CryptoError> {
            let mut bytes = [0u8; PACKED_BYTES];
            bytes.copy_from_slice(&packed[i * PACKED_BYTES..(i + 1) * PACKED_BYTES]);
            GroupElement::from_packed(&bytes)
        };
        Ok(Encryption {
            b: part(0)?,
            c: part(1)?,
            y: part(2)?,
        })
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.pack())
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text).map_err(|_| CryptoError::BadEncoding("encryption"))?;
        Self::from_packed(&bytes)
    }
}
