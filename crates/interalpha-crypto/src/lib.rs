//! # interalpha-crypto: Access-key primitives
//!
//! - [`AccessToken`]: the raw bearer credential handed to a client once.
//! - [`KeyHash`]: the SHA-256 digest that is the only persisted form of a token.
//!
//! There is deliberately no way back from a [`KeyHash`] to an [`AccessToken`].

mod error;
mod hash;
mod token;

pub use error::CryptoError;
pub use hash::{HASH_LENGTH, KeyHash};
pub use token::{AccessToken, TOKEN_BYTES, TOKEN_HEX_LENGTH};
