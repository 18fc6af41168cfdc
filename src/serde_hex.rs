//! Serde support for the crypto types: every packed type serializes as the
//! lowercase hex of its canonical packing, which is also the text form used
//! in configuration and logs.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::curve::{GroupElement, Scalar};
use crate::elgamal::Encryption;
use crate::proofs::{RSKProof, RSKVerifiers, ScalarMultProof};
use crate::pseudonym::{EncryptedKey, EncryptedLocalPseudonym, LocalPseudonym, PolymorphicPseudonym};

macro_rules! impl_hex_serde {
    ($($type:ty),+ $(,)?) => {
        $(
            impl Serialize for $type {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(&self.to_text())
                }
            }

            impl<'de> Deserialize<'de> for $type {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let text = String::deserialize(deserializer)?;
                    <$type>::from_text(&text).map_err(DeError::custom)
                }
            }
        )+
    };
}

impl_hex_serde!(
    Scalar,
    GroupElement,
    Encryption,
    ScalarMultProof,
    RSKVerifiers,
    RSKProof,
    LocalPseudonym,
    PolymorphicPseudonym,
    EncryptedLocalPseudonym,
    EncryptedKey,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_rng;

    fn round_trip<T>(value: &T)
    where
        T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug,
    {
        let json = serde_json::to_string(value).unwrap();
        let back: T = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, value);
    }

    #[test]
    fn crypto_types_round_trip_as_hex() {
        let mut rng = test_rng();
        let scalar = Scalar::random(&mut rng);
        let point = GroupElement::random(&mut rng);
        let pk = GroupElement::base_mult(&scalar);
        let encryption = Encryption::encrypt(&pk, &point, &mut rng).unwrap();

        round_trip(&scalar);
        round_trip(&point);
        round_trip(&encryption);
        round_trip(&LocalPseudonym::random(&mut rng));
        round_trip(&PolymorphicPseudonym::from_identifier(&pk, b"id", &mut rng).unwrap());
        round_trip(&EncryptedKey::encrypt_key(&pk, &point, &mut rng).unwrap());
    }

    #[test]
    fn serialized_form_is_lowercase_hex() {
        let mut rng = test_rng();
        let scalar = Scalar::random(&mut rng);
        let json = serde_json::to_string(&scalar).unwrap();
        let inner = json.trim_matches('"');
        assert_eq!(inner.len(), 64);
        assert!(inner
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn deserialization_rejects_bad_hex() {
        assert!(serde_json::from_str::<Scalar>("\"zz\"").is_err());
        assert!(serde_json::from_str::<GroupElement>("\"00\"").is_err());
    }
}
