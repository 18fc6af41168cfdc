//! Long-lived key material: the HMAC secrets key factors are derived from,
//! and the `SystemKeys` configuration document the servers load them from.

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::Scalar;
use crate::error::CryptoError;
use crate::translator::{DataTranslator, PseudonymTranslator, TranslatorKeys};

pub const KEY_FACTOR_SECRET_BYTES: usize = 64;

/// Key-factor derivation domain, hashed into every derived factor so that
/// pseudonym and data factors can never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyDomain {
    Pseudonym,
    Data,
}

impl KeyDomain {
    pub fn tag(&self) -> u32 {
        match self {
            KeyDomain::Pseudonym => 1,
            KeyDomain::Data => 2,
        }
    }
}

/// 64 bytes of HMAC key material, loaded once at translator construction and
/// wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyFactorSecret([u8; KEY_FACTOR_SECRET_BYTES]);

impl KeyFactorSecret {
    pub fn from_bytes(bytes: [u8; KEY_FACTOR_SECRET_BYTES]) -> Self {
        KeyFactorSecret(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(text).map_err(|_| CryptoError::BadEncoding("key factor secret"))?;
        let bytes: [u8; KEY_FACTOR_SECRET_BYTES] = bytes
            .try_into()
            .map_err(|_| CryptoError::BadEncoding("key factor secret"))?;
        Ok(KeyFactorSecret(bytes))
    }

    pub fn random(rng: &mut (impl rand::RngCore + rand::CryptoRng)) -> Self {
        let mut bytes = [0u8; KEY_FACTOR_SECRET_BYTES];
        rng.fill_bytes(&mut bytes);
        KeyFactorSecret(bytes)
    }

    pub(crate) fn hmac_key(&self) -> &[u8; KEY_FACTOR_SECRET_BYTES] {
        &self.0
    }
}

impl std::fmt::Debug for KeyFactorSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyFactorSecret(..)")
    }
}

/// The key material document a key-component server loads at startup.
///
/// Secrets are hex strings as stored on disk; the whole document is wiped on
/// drop. Absent blinding secrets mark the corresponding translator as
/// transcryptor-class (rekey-only; no blinding, no reshuffling).
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
pub struct SystemKeys {
    pub pseudonym_key_factor_secret: String,
    #[serde(default)]
    pub pseudonym_blinding_secret: Option<String>,
    pub pseudonym_master_private_key_share: String,
    pub data_key_factor_secret: String,
    #[serde(default)]
    pub data_blinding_secret: Option<String>,
    pub data_master_private_key_share: String,
}

impl SystemKeys {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the pseudonym-domain translator from this document.
    pub fn pseudonym_translator(&self) -> Result<PseudonymTranslator, CryptoError> {
        Ok(PseudonymTranslator::new(TranslatorKeys {
            domain: KeyDomain::Pseudonym,
            reshuffle: self
                .pseudonym_blinding_secret
                .as_deref()
                .map(KeyFactorSecret::from_hex)
                .transpose()?,
            rekey: KeyFactorSecret::from_hex(&self.pseudonym_key_factor_secret)?,
            master_private_key_share: parse_share(&self.pseudonym_master_private_key_share)?,
        }))
    }

    /// Build the data-domain translator from this document.
    pub fn data_translator(&self) -> Result<DataTranslator, CryptoError> {
        Ok(DataTranslator::new(TranslatorKeys {
            domain: KeyDomain::Data,
            reshuffle: self
                .data_blinding_secret
                .as_deref()
                .map(KeyFactorSecret::from_hex)
                .transpose()?,
            rekey: KeyFactorSecret::from_hex(&self.data_key_factor_secret)?,
            master_private_key_share: parse_share(&self.data_master_private_key_share)?,
        }))
    }
}

fn parse_share(text: &str) -> Result<Scalar, CryptoError> {
    Scalar::from_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_rng;

    fn sample_json(with_blinding: bool) -> String {
        let mut rng = test_rng();
        let secret = || hex::encode(KeyFactorSecret::random(&mut test_rng()).0);
        let share = hex::encode(Scalar::random(&mut rng).pack());
        let blinding = if with_blinding {
            format!(r#""pseudonym_blinding_secret": "{}", "data_blinding_secret": "{}","#, secret(), secret())
        } else {
            String::new()
        };
        format!(
            r#"{{
                "pseudonym_key_factor_secret": "{key}",
                {blinding}
                "pseudonym_master_private_key_share": "{share}",
                "data_key_factor_secret": "{key}",
                "data_master_private_key_share": "{share}"
            }}"#,
            key = secret(),
            blinding = blinding,
            share = share,
        )
    }

    #[test]
    fn parses_full_document() {
        let keys = SystemKeys::from_json(&sample_json(true)).unwrap();
        assert!(keys.pseudonym_blinding_secret.is_some());
        keys.pseudonym_translator().unwrap();
        keys.data_translator().unwrap();
    }

    #[test]
    fn parses_transcryptor_class_document() {
        let keys = SystemKeys::from_json(&sample_json(false)).unwrap();
        assert!(keys.pseudonym_blinding_secret.is_none());
        assert!(keys.data_blinding_secret.is_none());
        // Still constructs; blinding operations fail later with MissingSecret.
        keys.data_translator().unwrap();
    }

    #[test]
    fn rejects_malformed_secret() {
        let keys = SystemKeys {
            pseudonym_key_factor_secret: "abcd".into(),
            pseudonym_blinding_secret: None,
            pseudonym_master_private_key_share: hex::encode(Scalar::one().pack()),
            data_key_factor_secret: "abcd".into(),
            data_blinding_secret: None,
            data_master_private_key_share: hex::encode(Scalar::one().pack()),
        };
        assert_eq!(
            keys.pseudonym_translator().unwrap_err(),
            CryptoError::BadEncoding("key factor secret")
        );
    }

    #[test]
    fn key_factor_secret_hex_round_trip() {
        let secret = KeyFactorSecret::random(&mut test_rng());
        let parsed = KeyFactorSecret::from_hex(&hex::encode(secret.0)).unwrap();
        assert_eq!(secret.0, parsed.0);
        assert!(KeyFactorSecret::from_hex("00ff").is_err());
    }
}
