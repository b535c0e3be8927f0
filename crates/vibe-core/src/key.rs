//! Cache key derivation.
//!
//! The [`KeyPolicy`] decides which identity fields invalidate a cached
//! artifact. Fields outside the policy still reach the prompt; they just do
//! not cause a regeneration when they change.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::identity::IdentityDescriptor;

const DOMAIN: &[u8] = b"vibe.cache-key.v1";

/// Which identity fields feed the cache key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Signature and docstring only.
    SignatureDocstring,
    /// Name, docstring and signature. Custom types and context affect the
    /// prompt but not the key.
    #[default]
    NameSignatureDocstring,
    /// Everything: name, docstring, signature, custom types and context.
    FullIdentity,
}

impl KeyPolicy {
    fn tag(self) -> &'static [u8] {
        match self {
            Self::SignatureDocstring => b"signature+docstring",
            Self::NameSignatureDocstring => b"name+signature+docstring",
            Self::FullIdentity => b"full-identity",
        }
    }
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignatureDocstring => write!(f, "signature_docstring"),
            Self::NameSignatureDocstring => write!(f, "name_signature_docstring"),
            Self::FullIdentity => write!(f, "full_identity"),
        }
    }
}

/// SHA-256 digest of an identity, as 64 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Length of the hex rendering.
    pub const HEX_LEN: usize = 64;

    /// Accept an existing hex digest (e.g. parsed from a cache file name).
    pub fn parse(hex: &str) -> Option<Self> {
        if hex.len() == Self::HEX_LEN && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Some(Self(hex.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes identities into [`CacheKey`]s under one policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheKeyDeriver {
    policy: KeyPolicy,
}

impl CacheKeyDeriver {
    pub fn new(policy: KeyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    pub fn derive(&self, identity: &IdentityDescriptor) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN);
        update_field(&mut hasher, self.policy.tag());

        match self.policy {
            KeyPolicy::SignatureDocstring => {
                update_field(&mut hasher, identity.signature.as_bytes());
                update_field(&mut hasher, identity.docstring.as_bytes());
            }
            KeyPolicy::NameSignatureDocstring => {
                update_field(&mut hasher, identity.name.as_bytes());
                update_field(&mut hasher, identity.docstring.as_bytes());
                update_field(&mut hasher, identity.signature.as_bytes());
            }
            KeyPolicy::FullIdentity => {
                update_field(&mut hasher, identity.name.as_bytes());
                update_field(&mut hasher, identity.docstring.as_bytes());
                update_field(&mut hasher, identity.signature.as_bytes());
                hasher.update((identity.custom_types.len() as u64).to_le_bytes());
                // BTreeSet iteration is sorted, so declaration order never matters.
                for source in &identity.custom_types {
                    update_field(&mut hasher, source.as_bytes());
                }
                update_field(&mut hasher, identity.context.as_bytes());
            }
        }

        CacheKey(hex::encode(hasher.finalize()))
    }
}

/// Length-prefixed so adjacent fields cannot run into each other.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
