//! Raw access tokens.
//!
//! # FCIS Pattern
//!
//! - `from_random_bytes()`: pure construction from bytes (`pub(crate)`)
//! - `generate()`: impure shell that invokes the OS CSPRNG

use std::fmt::{self, Debug};

use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, Result};
use crate::hash::KeyHash;

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// Length of the hex-encoded token string.
pub const TOKEN_HEX_LENGTH: usize = TOKEN_BYTES * 2;

/// A raw access token.
///
/// The hex string is zeroized on drop and never printed by `Debug`.
/// It is not `Clone`: the issuer hands exactly one value to the caller.
pub struct AccessToken {
    hex: Zeroizing<String>,
}

impl AccessToken {
    // ========================================================================
    // Functional Core (pure, testable)
    // ========================================================================

    pub(crate) fn from_random_bytes(mut bytes: [u8; TOKEN_BYTES]) -> Self {
        debug_assert!(bytes.iter().any(|&b| b != 0), "token bytes are all zeros");

        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        bytes.zeroize();

        Self {
            hex: Zeroizing::new(hex),
        }
    }

    /// Returns true if `candidate` has the shape of an issued token
    /// (64 lowercase hex characters).
    ///
    /// Presented tokens that fail this check can be rejected without a
    /// store round-trip.
    pub fn is_well_formed(candidate: &str) -> bool {
        candidate.len() == TOKEN_HEX_LENGTH
            && candidate
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// The raw token string. Only the issuer and the notification path
    /// should ever call this.
    pub fn expose(&self) -> &str {
        &self.hex
    }

    /// Digest used to store and look up this token.
    pub fn hash(&self) -> KeyHash {
        KeyHash::of_token(&self.hex)
    }

    // ========================================================================
    // Imperative Shell (IO boundary)
    // ========================================================================

    /// Generates a new token from the OS CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        getrandom::fill(&mut bytes).map_err(|e| CryptoError::Entropy(e.to_string()))?;
        Ok(Self::from_random_bytes(bytes))
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_is_64_lowercase_hex() {
        let token = AccessToken::generate().unwrap();
        assert_eq!(token.expose().len(), TOKEN_HEX_LENGTH);
        assert!(AccessToken::is_well_formed(token.expose()));
    }

    #[test]
    fn generated_tokens_differ() {
        let a = AccessToken::generate().unwrap();
        let b = AccessToken::generate().unwrap();
        assert_ne!(a.expose(), b.expose());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn from_bytes_encodes_each_byte() {
        let mut bytes = [0u8; TOKEN_BYTES];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let token = AccessToken::from_random_bytes(bytes);

        assert!(token.expose().starts_with("ab00"));
        assert!(token.expose().ends_with("0001"));
    }

    #[test]
    fn debug_never_shows_the_secret() {
        let token = AccessToken::generate().unwrap();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(token.expose()));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn well_formed_rejects_wrong_shapes() {
        assert!(!AccessToken::is_well_formed(""));
        assert!(!AccessToken::is_well_formed(&"a".repeat(63)));
        assert!(!AccessToken::is_well_formed(&"A".repeat(64)));
        assert!(!AccessToken::is_well_formed(&"g".repeat(64)));
        assert!(AccessToken::is_well_formed(&"0f".repeat(32)));
    }
}
