use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// JWT payload: subject (user id), issued-at, expiry. Nothing else goes in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Verification failures. Callers must treat every variant as a plain
/// "unauthenticated" and never tell the client which one occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Signing and verification keys plus token policy, built once from config.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let token = &state.config.token;
        Self::new(&token.secret, token.algorithm, token.ttl_minutes)
    }
}

impl JwtKeys {
    pub fn new(secret: &str, algorithm: Algorithm, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Sign a token for `user_id` as of `issued_at`; expiry is issued-at
    /// plus the configured TTL.
    pub fn sign_at(&self, user_id: Uuid, issued_at: OffsetDateTime) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id,
            iat: issued_at.unix_timestamp() as usize,
            exp: (issued_at + self.ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    /// Check structure, signature and expiry; return the subject on success.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::new("unit-test-secret-0123456789abcdef", Algorithm::HS256, 60)
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        assert_eq!(keys.verify(&token).expect("verify"), user_id);
    }

    #[tokio::test]
    async fn keys_built_from_app_state_config() {
        let state = crate::state::AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        assert_eq!(keys.verify(&token).expect("verify"), user_id);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let other = JwtKeys::new("another-secret-that-is-long-enough!", Algorithm::HS256, 60);
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys();
        assert_eq!(keys.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(keys.verify("a.b.c"), Err(TokenError::Malformed));
        assert_eq!(keys.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keys = make_keys();
        let token = keys.sign(Uuid::new_v4()).expect("sign");
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = format!("x{}", &parts[1][1..]);
        let tampered = parts.join(".");
        assert!(keys.verify(&tampered).is_err());
    }

    #[test]
    fn token_valid_just_before_expiry_and_dead_after() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let fresh = keys
            .sign_at(user_id, now - Duration::minutes(59))
            .expect("sign");
        assert_eq!(keys.verify(&fresh).expect("still valid"), user_id);

        let stale = keys
            .sign_at(user_id, now - Duration::minutes(61))
            .expect("sign");
        assert_eq!(keys.verify(&stale), Err(TokenError::Expired));
    }

    #[test]
    fn ttl_is_configurable() {
        let short = JwtKeys::new("unit-test-secret-0123456789abcdef", Algorithm::HS256, 1);
        let user_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let token = short
            .sign_at(user_id, now - Duration::minutes(2))
            .expect("sign");
        assert_eq!(short.verify(&token), Err(TokenError::Expired));
    }
}
