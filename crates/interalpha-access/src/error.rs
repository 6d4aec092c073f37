//! Error types for the access-key lifecycle.

use std::time::Duration;

use interalpha_crypto::CryptoError;
use interalpha_types::ClientId;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a collaborator (key store, client directory).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing service could not be reached or refused the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the configured bound.
    #[error("store call '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A record with the same unique key already exists.
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

/// Outcome of a failed key operation.
///
/// Variants are distinguishable so the portal can tell a client to request
/// a new key rather than that the key was revoked. See [`PublicKeyError`]
/// for the collapsed form shown to unauthenticated callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// An employee role string was not recognized.
    #[error("invalid role: {0:?}")]
    InvalidRole(String),

    /// The client id does not resolve in the client directory.
    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    /// The client already holds the maximum number of active keys.
    #[error("client {client_id} already has {limit} active keys")]
    QuotaExceeded { client_id: ClientId, limit: usize },

    /// No record matches the presented key.
    #[error("invalid client key")]
    InvalidKey,

    /// The key is past its expiry.
    #[error("client key expired")]
    KeyExpired,

    /// The key was deactivated.
    #[error("client key revoked")]
    KeyRevoked,

    /// A collaborator failed; key checks fail closed.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// Malformed input or an internal failure with no dedicated variant.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl AccessError {
    /// HTTP status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRole(_) => 403,
            Self::ClientNotFound(_) => 404,
            Self::QuotaExceeded { .. } => 409,
            Self::InvalidKey | Self::KeyExpired | Self::KeyRevoked => 401,
            Self::StoreUnavailable(_) => 503,
            Self::ValidationError(_) => 400,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRole(_) => "INVALID_ROLE",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::QuotaExceeded { .. } => "KEY_LIMIT_EXCEEDED",
            Self::InvalidKey => "INVALID_CLIENT_KEY",
            Self::KeyExpired => "KEY_EXPIRED",
            Self::KeyRevoked => "KEY_REVOKED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// True for the three outcomes of presenting a bad key.
    pub fn is_key_rejection(&self) -> bool {
        matches!(self, Self::InvalidKey | Self::KeyExpired | Self::KeyRevoked)
    }
}

impl From<CryptoError> for AccessError {
    fn from(err: CryptoError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

/// Error body returned to portal callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKeyError {
    #[serde(skip)]
    pub status: u16,
    pub code: &'static str,
    pub error: String,
}

impl PublicKeyError {
    /// Code used when key rejections are collapsed.
    pub const COLLAPSED_CODE: &'static str = "INVALID_OR_EXPIRED_KEY";

    /// Builds the public body for `err`.
    ///
    /// With `collapse` set, `InvalidKey`, `KeyExpired` and `KeyRevoked` all
    /// render the same body, so a caller cannot learn whether a token was
    /// ever issued.
    pub fn from_access_error(err: &AccessError, collapse: bool) -> Self {
        if collapse && err.is_key_rejection() {
            return Self {
                status: 401,
                code: Self::COLLAPSED_CODE,
                error: "Chave de acesso inválida ou expirada".to_string(),
            };
        }

        let error = match err {
            AccessError::InvalidRole(_) => "Acesso negado",
            AccessError::ClientNotFound(_) => "Cliente não encontrado",
            AccessError::QuotaExceeded { .. } => "Limite de chaves ativas excedido",
            AccessError::InvalidKey => "Chave de acesso inválida",
            AccessError::KeyExpired => "Chave de acesso expirada. Solicite uma nova chave",
            AccessError::KeyRevoked => "Chave de acesso revogada",
            AccessError::StoreUnavailable(_) => "Serviço temporariamente indisponível",
            AccessError::ValidationError(_) => "Requisição inválida",
        };
        Self {
            status: err.status_code(),
            code: err.code(),
            error: error.to_string(),
        }
    }
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AccessError::ClientNotFound(ClientId::new("c")) => (404, "CLIENT_NOT_FOUND"))]
    #[test_case(AccessError::QuotaExceeded { client_id: ClientId::new("c"), limit: 3 } => (409, "KEY_LIMIT_EXCEEDED"))]
    #[test_case(AccessError::InvalidKey => (401, "INVALID_CLIENT_KEY"))]
    #[test_case(AccessError::KeyExpired => (401, "KEY_EXPIRED"))]
    #[test_case(AccessError::KeyRevoked => (401, "KEY_REVOKED"))]
    #[test_case(AccessError::StoreUnavailable(StoreError::Unavailable("down".into())) => (503, "STORE_UNAVAILABLE"))]
    #[test_case(AccessError::ValidationError("bad".into()) => (400, "VALIDATION_ERROR"))]
    #[test_case(AccessError::InvalidRole("x".into()) => (403, "INVALID_ROLE"))]
    fn test_status_and_code(err: AccessError) -> (u16, &'static str) {
        (err.status_code(), err.code())
    }

    #[test]
    fn test_key_rejections_collapse() {
        let bodies: Vec<_> = [
            AccessError::InvalidKey,
            AccessError::KeyExpired,
            AccessError::KeyRevoked,
        ]
        .iter()
        .map(|e| PublicKeyError::from_access_error(e, true))
        .collect();

        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(bodies[0].code, PublicKeyError::COLLAPSED_CODE);
        assert_eq!(bodies[0].status, 401);
    }

    #[test]
    fn test_uncollapsed_keeps_codes() {
        let body = PublicKeyError::from_access_error(&AccessError::KeyRevoked, false);
        assert_eq!(body.code, "KEY_REVOKED");

        let quota = AccessError::QuotaExceeded {
            client_id: ClientId::new("c"),
            limit: 3,
        };
        let body = PublicKeyError::from_access_error(&quota, true);
        assert_eq!(body.code, "KEY_LIMIT_EXCEEDED");
        assert_eq!(body.status, 409);
    }

    #[test]
    fn test_public_body_serializes_without_status() {
        let body = PublicKeyError::from_access_error(&AccessError::InvalidKey, true);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "INVALID_OR_EXPIRED_KEY");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_store_error_converts() {
        let err: AccessError = StoreError::Timeout {
            operation: "find_by_hash",
            after: Duration::from_millis(5),
        }
        .into();
        assert_eq!(err.status_code(), 503);
    }
}
