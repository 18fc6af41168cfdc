//! Prime-order group arithmetic over Ristretto255.
//!
//! `Scalar` and `GroupElement` are the only types the rest of the crate
//! computes with. A `GroupElement` stores both its unpacked point and its
//! 32-byte canonical packing, computed eagerly at construction; the type is
//! immutable afterwards, so sharing across threads needs no coordination and
//! equality, ordering and hashing are always over the canonical form.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_TABLE;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoBasepointTable, RistrettoPoint};
use curve25519_dalek::scalar::Scalar as RawScalar;
use curve25519_dalek::traits::{Identity, IsIdentity, VartimeMultiscalarMul};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Packed size of a `Scalar` and of a `GroupElement`.
pub const PACKED_BYTES: usize = 32;

/// A scalar in the Ristretto255 scalar field, always reduced mod the group
/// order.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Scalar(pub(crate) RawScalar);

impl Scalar {
    pub fn zero() -> Self {
        Scalar(RawScalar::ZERO)
    }

    pub fn one() -> Self {
        Scalar(RawScalar::ONE)
    }

    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        let scalar = Scalar(RawScalar::from_bytes_mod_order_wide(&bytes));
        bytes.zeroize();
        scalar
    }

    /// Decode a canonical 32-byte packing. Rejects unreduced encodings.
    pub fn from_packed(packed: &[u8; PACKED_BYTES]) -> Result<Self, CryptoError> {
        Option::<RawScalar>::from(RawScalar::from_canonical_bytes(*packed))
            .map(Scalar)
            .ok_or(CryptoError::BadEncoding("scalar"))
    }

    pub fn pack(&self) -> [u8; PACKED_BYTES] {
        self.0.to_bytes()
    }

    /// Reduce 64 bytes of key material into the scalar field.
    pub fn from_64_bytes(bytes: &[u8; 64]) -> Self {
        Scalar(RawScalar::from_bytes_mod_order_wide(bytes))
    }

    /// Full-width hash-to-scalar (SHA-512, wide reduction).
    pub fn hash_from_bytes(input: &[u8]) -> Self {
        Scalar(RawScalar::hash_from_bytes::<Sha512>(input))
    }

    /// Short hash-to-scalar used for Fiat-Shamir challenges: the low 128 bits
    /// of SHA-256 lifted into the field. Keeps proof responses compact while
    /// leaving the challenge space large enough for soundness.
    pub fn short_hash_from_bytes(input: &[u8]) -> Self {
        let digest = Sha256::digest(input);
        let mut low = [0u8; 16];
        low.copy_from_slice(&digest[..16]);
        Scalar(RawScalar::from(u128::from_le_bytes(low)))
    }

    pub fn square(&self) -> Self {
        Scalar(self.0 * self.0)
    }

    /// Multiplicative inverse. The zero scalar has no inverse; callers only
    /// invert key factors, which are nonzero by construction.
    pub fn invert(&self) -> Self {
        Scalar(self.0.invert())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == RawScalar::ZERO
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.pack())
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text).map_err(|_| CryptoError::BadEncoding("scalar"))?;
        let packed: [u8; PACKED_BYTES] = bytes
            .try_into()
            .map_err(|_| CryptoError::BadEncoding("scalar"))?;
        Self::from_packed(&packed)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", self.to_text())
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Add for Scalar {
    type Output = Scalar;
    fn add(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 + rhs.0)
    }
}

impl Sub for Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 - rhs.0)
    }
}

impl Mul for Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 * rhs.0)
    }
}

impl Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

/// An element of the Ristretto255 group.
///
/// Both representations are populated at construction; see the module doc.
#[derive(Clone, Copy)]
pub struct GroupElement {
    point: RistrettoPoint,
    packed: CompressedRistretto,
}

impl GroupElement {
    pub(crate) fn from_point(point: RistrettoPoint) -> Self {
        GroupElement {
            point,
            packed: point.compress(),
        }
    }

    pub fn identity() -> Self {
        Self::from_point(RistrettoPoint::identity())
    }

    pub fn generator() -> Self {
        Self::base_mult(&Scalar::one())
    }

    pub fn is_identity(&self) -> bool {
        self.point.is_identity()
    }

    /// Decode a canonical 32-byte packing.
    pub fn from_packed(packed: &[u8; PACKED_BYTES]) -> Result<Self, CryptoError> {
        let compressed = CompressedRistretto(*packed);
        let point = compressed
            .decompress()
            .ok_or(CryptoError::BadEncoding("group element"))?;
        Ok(GroupElement {
            point,
            packed: compressed,
        })
    }

    pub fn pack(&self) -> [u8; PACKED_BYTES] {
        self.packed.to_bytes()
    }

    pub fn as_packed_bytes(&self) -> &[u8; PACKED_BYTES] {
        self.packed.as_bytes()
    }

    /// Constant-time variable-base scalar multiplication. Safe for secret
    /// scalars.
    pub fn mult(&self, s: &Scalar) -> GroupElement {
        Self::from_point(self.point * s.0)
    }

    /// Variable-time scalar multiplication for verifier-side arithmetic.
    /// Must not be used with secret scalars.
    pub fn public_mult(&self, s: &Scalar) -> GroupElement {
        Self::from_point(RistrettoPoint::vartime_multiscalar_mul(
            std::iter::once(s.0),
            std::iter::once(self.point),
        ))
    }

    /// Constant-time fixed-base multiplication `s * G`.
    pub fn base_mult(s: &Scalar) -> GroupElement {
        Self::from_point(RISTRETTO_BASEPOINT_TABLE * &s.0)
    }

    /// Variable-time fixed-base multiplication for verifier-side arithmetic.
    pub fn public_base_mult(s: &Scalar) -> GroupElement {
        Self::from_point(RistrettoPoint::vartime_double_scalar_mul_basepoint(
            &RawScalar::ZERO,
            &RistrettoPoint::identity(),
            &s.0,
        ))
    }

    /// Deterministic hash-to-point (Elligator map over SHA-512). Never
    /// returns the identity.
    pub fn hash_to_point(input: &[u8]) -> GroupElement {
        let mut point = RistrettoPoint::hash_from_bytes::<Sha512>(input);
        let mut counter = 0u8;
        while point.is_identity() {
            // Unreachable for practical inputs; retried for completeness.
            let mut hasher = Sha512::new();
            hasher.update(input);
            hasher.update([counter]);
            point = RistrettoPoint::from_uniform_bytes(&hasher.finalize().into());
            counter = counter.wrapping_add(1);
        }
        Self::from_point(point)
    }

    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        Self::from_point(RistrettoPoint::from_uniform_bytes(&bytes))
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.pack())
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text).map_err(|_| CryptoError::BadEncoding("group element"))?;
        let packed: [u8; PACKED_BYTES] = bytes
            .try_into()
            .map_err(|_| CryptoError::BadEncoding("group element"))?;
        Self::from_packed(&packed)
    }
}

impl fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupElement({})", self.to_text())
    }
}

impl PartialEq for GroupElement {
    fn eq(&self, other: &Self) -> bool {
        self.packed == other.packed
    }
}

impl Eq for GroupElement {}

impl PartialOrd for GroupElement {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupElement {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.packed.as_bytes().cmp(other.packed.as_bytes())
    }
}

impl Hash for GroupElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed.as_bytes().hash(state);
    }
}

impl Add for GroupElement {
    type Output = GroupElement;
    fn add(self, rhs: GroupElement) -> GroupElement {
        Self::from_point(self.point + rhs.point)
    }
}

impl Sub for GroupElement {
    type Output = GroupElement;
    fn sub(self, rhs: GroupElement) -> GroupElement {
        Self::from_point(self.point - rhs.point)
    }
}

impl Neg for GroupElement {
    type Output = GroupElement;
    fn neg(self) -> GroupElement {
        Self::from_point(-self.point)
    }
}

/// Precomputed multiplication table for a fixed base point, amortizing
/// repeated `s * P` for the same `P`.
pub struct ScalarMultTable {
    base: GroupElement,
    table: RistrettoBasepointTable,
}

impl ScalarMultTable {
    pub fn new(base: &GroupElement) -> Self {
        ScalarMultTable {
            base: *base,
            table: RistrettoBasepointTable::create(&base.point),
        }
    }

    pub fn base(&self) -> &GroupElement {
        &self.base
    }

    /// Constant-time table-backed multiplication.
    pub fn mult(&self, s: &Scalar) -> GroupElement {
        GroupElement::from_point(&self.table * &s.0)
    }

    /// Variable-time multiplication for verifier-side arithmetic. The
    /// precomputed table is constant-time only, so this goes through the
    /// stored base instead.
    pub fn public_mult(&self, s: &Scalar) -> GroupElement {
        self.base.public_mult(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_rng;

    #[test]
    fn scalar_pack_round_trip() {
        let mut rng = test_rng();
        for _ in 0..8 {
            let s = Scalar::random(&mut rng);
            let unpacked = Scalar::from_packed(&s.pack()).unwrap();
            assert_eq!(s, unpacked);
        }
    }

    #[test]
    fn scalar_rejects_unreduced_packing() {
        // The group order is well below 2^255, so all-ones is never canonical.
        let packed = [0xFFu8; 32];
        assert_eq!(
            Scalar::from_packed(&packed),
            Err(CryptoError::BadEncoding("scalar"))
        );
    }

    #[test]
    fn scalar_text_round_trip() {
        let mut rng = test_rng();
        let s = Scalar::random(&mut rng);
        assert_eq!(Scalar::from_text(&s.to_text()).unwrap(), s);
        assert!(Scalar::from_text("").is_err());
        assert!(Scalar::from_text("zz").is_err());
    }

    #[test]
    fn scalar_invert_is_inverse() {
        let mut rng = test_rng();
        let s = Scalar::random(&mut rng);
        assert_eq!(s * s.invert(), Scalar::one());
    }

    #[test]
    fn group_element_pack_round_trip() {
        let mut rng = test_rng();
        for _ in 0..8 {
            let p = GroupElement::random(&mut rng);
            let unpacked = GroupElement::from_packed(&p.pack()).unwrap();
            assert_eq!(p, unpacked);
        }
    }

    #[test]
    fn group_element_rejects_bad_packing() {
        let packed = [0xFFu8; 32];
        assert_eq!(
            GroupElement::from_packed(&packed),
            Err(CryptoError::BadEncoding("group element"))
        );
        assert!(GroupElement::from_text("").is_err());
    }

    #[test]
    fn add_sub_cancel() {
        let mut rng = test_rng();
        let a = GroupElement::random(&mut rng);
        let b = GroupElement::random(&mut rng);
        assert_ne!(a, b, "random points should differ");
        assert_eq!((a + b) - b, a);
        assert_eq!(a + (-a), GroupElement::identity());
    }

    #[test]
    fn base_mult_matches_generator_mult() {
        let mut rng = test_rng();
        let g = GroupElement::generator();
        for _ in 0..8 {
            let s = Scalar::random(&mut rng);
            assert_eq!(GroupElement::base_mult(&s), g.mult(&s));
            assert_eq!(GroupElement::public_base_mult(&s), g.mult(&s));
        }
    }

    #[test]
    fn public_mult_matches_mult() {
        let mut rng = test_rng();
        for _ in 0..8 {
            let p = GroupElement::random(&mut rng);
            let s = Scalar::random(&mut rng);
            assert_eq!(p.public_mult(&s), p.mult(&s));
        }
    }

    #[test]
    fn scalar_mult_table_matches_mult() {
        let mut rng = test_rng();
        for _ in 0..4 {
            let p = GroupElement::random(&mut rng);
            let s = Scalar::random(&mut rng);
            let table = ScalarMultTable::new(&p);
            assert_eq!(table.mult(&s), p.mult(&s));
            assert_eq!(table.public_mult(&s), p.mult(&s));
        }
    }

    #[test]
    fn hash_to_point_is_deterministic_and_nonzero() {
        let a = GroupElement::hash_to_point(b"participant-1");
        let b = GroupElement::hash_to_point(b"participant-1");
        let c = GroupElement::hash_to_point(b"participant-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_identity());
    }

    #[test]
    fn short_hash_is_deterministic_and_distinct() {
        let a = Scalar::short_hash_from_bytes(b"input");
        let b = Scalar::short_hash_from_bytes(b"input");
        let c = Scalar::short_hash_from_bytes(b"inpux");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Scalar::zero());
    }

    #[test]
    fn full_hash_differs_from_short_hash() {
        let short = Scalar::short_hash_from_bytes(b"input");
        let full = Scalar::hash_from_bytes(b"input");
        assert_ne!(short, full);
    }
}
