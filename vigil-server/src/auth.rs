//! Credential handling: Argon2 password hashes and role-scoped JWT bearer
//! tokens
//!
//! Elder and caregiver tokens share a signing key but carry distinct roles;
//! verification for one role rejects tokens minted for the other, so the two
//! principal namespaces cannot be crossed with a stolen token.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime in days
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Principal kind carried inside a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Elder,
    Caregiver,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal guid
    pub sub: String,
    pub role: Role,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Signing and verification keys derived from one shared secret
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a bearer token for one principal
    pub fn issue(&self, guid: &str, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp();
        let claims = Claims { sub: guid.to_string(), role, exp };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Verify a token and require the given role
    pub fn verify(&self, token: &str, role: Role) -> Option<Claims> {
        let claims = self.verify_any(token)?;
        (claims.role == role).then_some(claims)
    }

    /// Verify a token of either role
    pub fn verify_any(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }
}

/// Hash a password with a fresh per-hash salt
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored hash; malformed hashes verify false
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
