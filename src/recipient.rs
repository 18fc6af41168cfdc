//! Typed descriptors for the destination of a translation step.
//!
//! A recipient is a party kind plus the payload bytes that individualize the
//! derived key factors. Reshuffling is per user group, so the reshuffle
//! payload of a user is their group name; rekeying is per user, so the rekey
//! payload is the user's identity bytes. Servers use their canonical name
//! for both.

use serde::{Deserialize, Serialize};

/// The closed set of party kinds that can receive a translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyKind {
    User,
    AccessManager,
    Transcryptor,
    StorageFacility,
    RegistrationServer,
    KeyServer,
}

impl PartyKind {
    /// Stable tag hashed into key-factor derivation.
    pub fn tag(&self) -> u32 {
        match self {
            PartyKind::User => 1,
            PartyKind::AccessManager => 2,
            PartyKind::Transcryptor => 3,
            PartyKind::StorageFacility => 4,
            PartyKind::RegistrationServer => 5,
            PartyKind::KeyServer => 6,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(PartyKind::User),
            2 => Some(PartyKind::AccessManager),
            3 => Some(PartyKind::Transcryptor),
            4 => Some(PartyKind::StorageFacility),
            5 => Some(PartyKind::RegistrationServer),
            6 => Some(PartyKind::KeyServer),
            _ => None,
        }
    }

    /// Canonical name of a server party; `None` for users.
    pub fn server_name(&self) -> Option<&'static str> {
        match self {
            PartyKind::User => None,
            PartyKind::AccessManager => Some("accessmanager"),
            PartyKind::Transcryptor => Some("transcryptor"),
            PartyKind::StorageFacility => Some("storagefacility"),
            PartyKind::RegistrationServer => Some("registrationserver"),
            PartyKind::KeyServer => Some("keyserver"),
        }
    }
}

/// Recipient view used when deriving a reshuffle (pseudonymization or
/// blinding) key factor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReshuffleRecipient {
    pub kind: PartyKind,
    pub payload: Vec<u8>,
}

/// Recipient view used when deriving a rekey (encryption) key factor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RekeyRecipient {
    pub kind: PartyKind,
    pub payload: Vec<u8>,
}

impl RekeyRecipient {
    pub fn for_user(identity: impl Into<Vec<u8>>) -> Self {
        RekeyRecipient {
            kind: PartyKind::User,
            payload: identity.into(),
        }
    }

    pub fn for_server(kind: PartyKind) -> Option<Self> {
        kind.server_name().map(|name| RekeyRecipient {
            kind,
            payload: name.as_bytes().to_vec(),
        })
    }
}

/// Full recipient descriptor carrying both payloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub kind: PartyKind,
    pub reshuffle_payload: Vec<u8>,
    pub rekey_payload: Vec<u8>,
}

impl Recipient {
    /// Recipient for an end user: pseudonymization is per user group,
    /// rekeying is per user identity.
    pub fn for_user(group: impl Into<Vec<u8>>, identity: impl Into<Vec<u8>>) -> Self {
        Recipient {
            kind: PartyKind::User,
            reshuffle_payload: group.into(),
            rekey_payload: identity.into(),
        }
    }

    /// Recipient for an infrastructure server; both payloads are the
    /// server's canonical name. Returns `None` for `PartyKind::User`.
    pub fn for_server(kind: PartyKind) -> Option<Self> {
        kind.server_name().map(|name| Recipient {
            kind,
            reshuffle_payload: name.as_bytes().to_vec(),
            rekey_payload: name.as_bytes().to_vec(),
        })
    }

    pub fn reshuffle(&self) -> ReshuffleRecipient {
        ReshuffleRecipient {
            kind: self.kind,
            payload: self.reshuffle_payload.clone(),
        }
    }

    pub fn rekey(&self) -> RekeyRecipient {
        RekeyRecipient {
            kind: self.kind,
            payload: self.rekey_payload.clone(),
        }
    }
}
