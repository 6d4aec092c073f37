//! One-way key digests.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

/// Length of a SHA-256 digest in bytes.
pub const HASH_LENGTH: usize = 32;

/// SHA-256 digest of a raw access token.
///
/// Serialized as 64 hex characters, which is the form key stores persist.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHash([u8; HASH_LENGTH]);

impl KeyHash {
    /// Hashes a presented token string.
    ///
    /// Any string is accepted; a token that was never issued simply yields
    /// a digest that matches nothing.
    pub fn of_token(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Constant-time comparison against a presented token.
    pub fn matches_token(&self, token: &str) -> bool {
        let candidate = Self::of_token(token);
        self.0.ct_eq(&candidate.0).into()
    }
}

impl Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 4 bytes only
        write!(
            f,
            "KeyHash({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for KeyHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_LENGTH * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidHashEncoding(format!(
                "expected {} hex characters, got {:?}",
                HASH_LENGTH * 2,
                s
            )));
        }

        let mut bytes = [0u8; HASH_LENGTH];
        for (slot, pair) in bytes.iter_mut().zip(s.as_bytes().chunks_exact(2)) {
            let digits = std::str::from_utf8(pair)
                .map_err(|e| CryptoError::InvalidHashEncoding(e.to_string()))?;
            *slot = u8::from_str_radix(digits, 16)
                .map_err(|e| CryptoError::InvalidHashEncoding(format!("{digits:?}: {e}")))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for KeyHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
