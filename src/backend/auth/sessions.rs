/**
 * Session Tokens and the Split Credential
 *
 * This module issues and verifies the signed identity token behind every
 * session. A token is an HS256 JWT carrying the user ID, the configured
 * issuer and an expiry exactly five minutes after issuance. Nothing is
 * stored server-side: validity is recomputed from the signed payload on each
 * request.
 *
 * # Split Credential
 *
 * The serialized token `header.payload.signature` is split on its two dots:
 *
 * - `client_part` = `header.payload`, readable by client scripts
 * - `opaque_part` = `signature`, kept out of reach of scripts
 *
 * `parse` rejoins the two parts with a single `.` before verification.
 */

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::server::config::ServerConfig;

/// Lifetime of every issued token
pub const TOKEN_TTL_SECS: i64 = 5 * 60;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Why a credential was rejected
///
/// Every variant reaches the client as 401; the distinction is for logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token issuer does not match")]
    WrongIssuer,
    #[error("unexpected signing algorithm")]
    WrongAlgorithm,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// A signed token divided across the two credential cookies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitToken {
    /// `header.payload`
    pub client_part: String,
    /// `signature`
    pub opaque_part: String,
}

/// Issues and verifies split session tokens
///
/// Built once from `ServerConfig` and shared through `AppState`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for a signing key and issuer
    pub fn new(key: &[u8], issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            issuer,
            validation,
        }
    }

    /// Create a codec from the server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(&config.jwt_key, config.jwt_issuer.clone())
    }

    /// Issue a token for `subject`, valid for five minutes from now
    pub fn issue(&self, subject: Uuid) -> Result<SplitToken, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if it had been created at `issued_at`
    pub fn issue_at(&self, subject: Uuid, issued_at: DateTime<Utc>) -> Result<SplitToken, TokenError> {
        let claims = Claims {
            sub: subject,
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        };

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        split_token(&token)
    }

    /// Verify a split credential and return its subject
    pub fn parse(&self, client_part: &str, opaque_part: &str) -> Result<Uuid, TokenError> {
        self.parse_claims(client_part, opaque_part)
            .map(|claims| claims.sub)
    }

    /// Verify a split credential and return all of its claims
    pub fn parse_claims(&self, client_part: &str, opaque_part: &str) -> Result<Claims, TokenError> {
        let token = join_parts(client_part, opaque_part)?;
        let data = decode::<Claims>(&token, &self.decoding, &self.validation).map_err(classify)?;

        if data.claims.iss != self.issuer {
            return Err(TokenError::WrongIssuer);
        }

        Ok(data.claims)
    }
}

/// Split a serialized token into its client and opaque parts
pub fn split_token(token: &str) -> Result<SplitToken, TokenError> {
    let mut segments = token.split('.');

    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok(SplitToken {
                client_part: format!("{header}.{payload}"),
                opaque_part: signature.to_string(),
            })
        }
        _ => Err(TokenError::Malformed("expected three segments".to_string())),
    }
}

/// Rejoin client and opaque parts into a serialized token
pub fn join_parts(client_part: &str, opaque_part: &str) -> Result<String, TokenError> {
    let client_ok = match client_part.split_once('.') {
        Some((header, payload)) => {
            !header.is_empty() && !payload.is_empty() && !payload.contains('.')
        }
        None => false,
    };

    if !client_ok {
        return Err(TokenError::Malformed("client part is not header.payload".to_string()));
    }

    if opaque_part.is_empty() || opaque_part.contains('.') {
        return Err(TokenError::Malformed("opaque part is not a signature".to_string()));
    }

    Ok(format!("{client_part}.{opaque_part}"))
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => TokenError::WrongAlgorithm,
        _ => TokenError::Malformed(err.to_string()),
    }
}
