//! Non-interactive zero-knowledge proofs for certified translation.
//!
//! `ScalarMultProof` is a Fiat-Shamir sigma proof of knowledge of `x` with
//! `A = xG` and `N = xM`; `RSKProof` composes three of them, plus two
//! randomizer commitments, into a proof that one ciphertext is an honest
//! `(z,k)`-RSK of another. Verifier-side arithmetic is variable-time: every
//! input to `verify` is public.

use rand::{CryptoRng, RngCore};

use crate::curve::{GroupElement, Scalar, PACKED_BYTES};
use crate::elgamal::Encryption;
use crate::error::CryptoError;

pub const SCALAR_MULT_PROOF_PACKED_BYTES: usize = 3 * PACKED_BYTES;
pub const RSK_VERIFIERS_PACKED_BYTES: usize = 3 * PACKED_BYTES;
pub const RSK_PROOF_PACKED_BYTES: usize = 2 * PACKED_BYTES + 3 * SCALAR_MULT_PROOF_PACKED_BYTES;

/// Proof of knowledge of `x` such that `A = xG` and `N = xM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarMultProof {
    pub cb: GroupElement,
    pub cm: GroupElement,
    pub s: Scalar,
}

impl ScalarMultProof {
    /// Construct a proof. Assumes `a = x·G` and `n = x·m`.
    pub fn create(
        a: &GroupElement,
        m: &GroupElement,
        n: &GroupElement,
        x: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Self {
        let nonce = Scalar::random(rng);
        let cb = GroupElement::base_mult(&nonce);
        let cm = m.mult(&nonce);
        let challenge = Self::compute_challenge(a, m, n, &cb, &cm);
        ScalarMultProof {
            cb,
            cm,
            s: nonce + challenge * *x,
        }
    }

    /// Check the proof against the public statement `(A, M, N)`.
    pub fn verify(
        &self,
        a: &GroupElement,
        m: &GroupElement,
        n: &GroupElement,
    ) -> Result<(), CryptoError> {
        let challenge = Self::compute_challenge(a, m, n, &self.cb, &self.cm);
        if GroupElement::public_base_mult(&self.s) != a.public_mult(&challenge) + self.cb
            || m.public_mult(&self.s) != n.public_mult(&challenge) + self.cm
        {
            return Err(CryptoError::InvalidProof);
        }
        Ok(())
    }

    /// Fiat-Shamir challenge over the packed inputs, in this exact order.
    fn compute_challenge(
        a: &GroupElement,
        m: &GroupElement,
        n: &GroupElement,
        cb: &GroupElement,
        cm: &GroupElement,
    ) -> Scalar {
        let mut packed = Vec::with_capacity(5 * PACKED_BYTES);
        packed.extend_from_slice(&a.pack());
        packed.extend_from_slice(&m.pack());
        packed.extend_from_slice(&n.pack());
        packed.extend_from_slice(&cb.pack());
        packed.extend_from_slice(&cm.pack());
        Scalar::short_hash_from_bytes(&packed)
    }

    pub fn pack(&self) -> [u8; SCALAR_MULT_PROOF_PACKED_BYTES] {
        let mut out = [0u8; SCALAR_MULT_PROOF_PACKED_BYTES];
        out[..PACKED_BYTES].copy_from_slice(&self.cb.pack());
        out[PACKED_BYTES..2 * PACKED_BYTES].copy_from_slice(&self.cm.pack());
        out[2 * PACKED_BYTES..].copy_from_slice(&self.s.pack());
        out
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        if packed.len() != SCALAR_MULT_PROOF_PACKED_BYTES {
            return Err(CryptoError::BadEncoding("scalar-mult proof"));
        }
        let element = |i: usize| -> Result<GroupElement, CryptoError> {
            let mut bytes = [0u8; PACKED_BYTES];
            bytes.copy_from_slice(&packed[i * PACKED_BYTES..(i + 1) * PACKED_BYTES]);
            GroupElement::from_packed(&bytes)
        };
        let mut scalar_bytes = [0u8; PACKED_BYTES];
        scalar_bytes.copy_from_slice(&packed[2 * PACKED_BYTES..]);
        Ok(ScalarMultProof {
            cb: element(0)?,
            cm: element(1)?,
            s: Scalar::from_packed(&scalar_bytes)?,
        })
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.pack())
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(text).map_err(|_| CryptoError::BadEncoding("scalar-mult proof"))?;
        Self::from_packed(&bytes)
    }
}

/// Static public data for verifying RSK proofs for one recipient:
/// `(z/k)·G`, `z·G`, and `k·Y` under the master public key `Y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RSKVerifiers {
    pub z_over_k_b: GroupElement,
    pub z_b: GroupElement,
    pub k_y: GroupElement,
}

impl RSKVerifiers {
    pub fn compute(z: &Scalar, k: &Scalar, y: &GroupElement) -> Self {
        RSKVerifiers {
            z_over_k_b: GroupElement::base_mult(&(*z * k.invert())),
            z_b: GroupElement::base_mult(z),
            k_y: y.mult(k),
        }
    }

    pub fn pack(&self) -> [u8; RSK_VERIFIERS_PACKED_BYTES] {
        let mut out = [0u8; RSK_VERIFIERS_PACKED_BYTES];
        out[..PACKED_BYTES].copy_from_slice(&self.z_over_k_b.pack());
        out[PACKED_BYTES..2 * PACKED_BYTES].copy_from_slice(&self.z_b.pack());
        out[2 * PACKED_BYTES..].copy_from_slice(&self.k_y.pack());
        out
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        if packed.len() != RSK_VERIFIERS_PACKED_BYTES {
            return Err(CryptoError::BadEncoding("rsk verifiers"));
        }
        let element = |i: usize| -> Result<GroupElement, CryptoError> {
            let mut bytes = [0u8; PACKED_BYTES];
            bytes.copy_from_slice(&packed[i * PACKED_BYTES..(i + 1) * PACKED_BYTES]);
            GroupElement::from_packed(&bytes)
        };
        Ok(RSKVerifiers {
            z_over_k_b: element(0)?,
            z_b: element(1)?,
            k_y: element(2)?,
        })
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.pack())
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text).map_err(|_| CryptoError::BadEncoding("rsk verifiers"))?;
        Self::from_packed(&bytes)
    }
}

/// Proof that `post` is the `(z,k)`-RSK of `pre`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RSKProof {
    /// `r·Y_pre`
    pub ry: GroupElement,
    /// `r·G`
    pub rb: GroupElement,
    /// Knowledge of `r`: `(rb, y_pre, ry)`
    pub rp: ScalarMultProof,
    /// Knowledge of `z/k`: `((z/k)·G, b_pre + rb, b_post)`
    pub bp: ScalarMultProof,
    /// Knowledge of `z`: `(z·G, c_pre + ry, c_post)`
    pub cp: ScalarMultProof,
}

impl RSKProof {
    /// Assemble the proof from the RSK intermediates. Assumes `post` is the
    /// `(z,k)`-RSK of `pre` with randomizer `r`, `ry = r·Y_pre`, `rb = r·G`,
    /// `z_b = z·G`, `z_over_k_b = (z/k)·G`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        pre: &Encryption,
        post: &Encryption,
        z: &Scalar,
        z_b: &GroupElement,
        z_over_k: &Scalar,
        z_over_k_b: &GroupElement,
        r: &Scalar,
        ry: &GroupElement,
        rb: &GroupElement,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Self {
        RSKProof {
            ry: *ry,
            rb: *rb,
            rp: ScalarMultProof::create(rb, &pre.y, ry, r, rng),
            bp: ScalarMultProof::create(z_over_k_b, &(pre.b + *rb), &post.b, z_over_k, rng),
            cp: ScalarMultProof::create(z_b, &(pre.c + *ry), &post.c, z, rng),
        }
    }

    /// Apply the `(z,k)`-RSK to `input` and return the result together with
    /// a proof of correctness.
    pub fn certified_rsk(
        input: &Encryption,
        z: &Scalar,
        k: &Scalar,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Encryption, RSKProof), CryptoError> {
        input.checked()?;
        let z_over_k = *z * k.invert();
        let r = Scalar::random(rng);
        let ry = input.y.mult(&r);
        let rb = GroupElement::base_mult(&r);

        let output = Encryption {
            b: (input.b + rb).mult(&z_over_k),
            c: (input.c + ry).mult(z),
            y: input.y.mult(k),
        };

        let proof = RSKProof::create(
            input,
            &output,
            z,
            &GroupElement::base_mult(z),
            &z_over_k,
            &GroupElement::base_mult(&z_over_k),
            &r,
            &ry,
            &rb,
            rng,
        );
        Ok((output, proof))
    }

    /// Check the proof against the precomputed per-recipient verifiers.
    pub fn verify(
        &self,
        pre: &Encryption,
        post: &Encryption,
        verifiers: &RSKVerifiers,
    ) -> Result<(), CryptoError> {
        self.rp.verify(&self.rb, &pre.y, &self.ry)?;
        self.bp
            .verify(&verifiers.z_over_k_b, &(pre.b + self.rb), &post.b)?;
        self.cp
            .verify(&verifiers.z_b, &(pre.c + self.ry), &post.c)?;
        if post.y != verifiers.k_y {
            return Err(CryptoError::InvalidProof);
        }
        Ok(())
    }

    pub fn pack(&self) -> [u8; RSK_PROOF_PACKED_BYTES] {
        let mut out = [0u8; RSK_PROOF_PACKED_BYTES];
        out[..PACKED_BYTES].copy_from_slice(&self.ry.pack());
        out[PACKED_BYTES..2 * PACKED_BYTES].copy_from_slice(&self.rb.pack());
        let proofs = 2 * PACKED_BYTES;
        out[proofs..proofs + SCALAR_MULT_PROOF_PACKED_BYTES].copy_from_slice(&self.rp.pack());
        out[proofs + SCALAR_MULT_PROOF_PACKED_BYTES..proofs + 2 * SCALAR_MULT_PROOF_PACKED_BYTES]
            .copy_from_slice(&self.bp.pack());
        out[proofs + 2 * SCALAR_MULT_PROOF_PACKED_BYTES..].copy_from_slice(&self.cp.pack());
        out
    }

    pub fn from_packed(packed: &[u8]) -> Result<Self, CryptoError> {
        if packed.len() != RSK_PROOF_PACKED_BYTES {
            return Err(CryptoError::BadEncoding("rsk proof"));
        }
        let element = |offset: usize| -> Result<GroupElement, CryptoError> {
            let mut bytes = [0u8; PACKED_BYTES];
            bytes.copy_from_slice(&packed[offset..offset + PACKED_BYTES]);
            GroupElement::from_packed(&bytes)
        };
        let proofs = 2 * PACKED_BYTES;
        Ok(RSKProof {
            ry: element(0)?,
            rb: element(PACKED_BYTES)?,
            rp: ScalarMultProof::from_packed(
                &packed[proofs..proofs + SCALAR_MULT_PROOF_PACKED_BYTES],
            )?,
            bp: ScalarMultProof::from_packed(
                &packed[proofs + SCALAR_MULT_PROOF_PACKED_BYTES
                    ..proofs + 2 * SCALAR_MULT_PROOF_PACKED_BYTES],
            )?,
            cp: ScalarMultProof::from_packed(&packed[proofs + 2 * SCALAR_MULT_PROOF_PACKED_BYTES..])?,
        })
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.pack())
    }

    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text).map_err(|_| CryptoError::BadEncoding("rsk proof"))?;
        Self::from_packed(&bytes)
    }
}
