use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{ApiError, ApiResult};
use crate::users::repo::User;

/// Self-contained session claims; possession of a validly signed,
/// unexpired token is the only authorization proof the service holds.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDuration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}


impl TokenKeys {
    pub fn from_config(cfg: &JwtConfig) -> ApiResult<Self> {
        let secret = cfg
            .secret
            .as_deref()
            .ok_or(ApiError::Config("JWT_SECRET is not set"))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDuration::days(cfg.ttl_days),
        })
    }

    pub fn sign(&self, user: &User) -> ApiResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| ApiError::Config("token signing failed"))?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    /// Pure verification: no store access, no side effects. Expiry and
    /// signature failures are distinct error kinds.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::default();
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::TokenInvalid,
            }
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn make_keys(ttl_days: i64) -> TokenKeys {
        TokenKeys::from_config(&JwtConfig {
            secret: Some("test-secret".into()),
            ttl_days,
        })
        .expect("keys from config")
    }

    fn make_user() -> User {
        User::fake("lucas_feliciano", "lucas@example.com")
    }

    #[test]
    fn missing_secret_is_a_config_error() {
        let err = TokenKeys::from_config(&JwtConfig {
            secret: None,
            ttl_days: 7,
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys(7);
        let user = make_user();
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "lucas_feliciano");
        assert_eq!(claims.email, "lucas@example.com");
        assert!(claims.exp > claims.iat);
    }

    // Encodes claims as if the token had been issued `age` ago with a
    // 7-day lifetime, so verification happens mid-life or past expiry.
    fn sign_issued_ago(keys: &TokenKeys, age: TimeDuration) -> String {
        let user = make_user();
        let iat = OffsetDateTime::now_utc() - age;
        let claims = Claims {
            sub: user.id,
            username: user.username,
            email: user.email,
            iat: iat.unix_timestamp() as usize,
            exp: (iat + TimeDuration::days(7)).unix_timestamp() as usize,
        };
        encode(&Header::default(), &claims, &keys.encoding).expect("encode")
    }

    #[test]
    fn seven_day_token_still_verifies_six_days_in() {
        let keys = make_keys(7);
        let token = sign_issued_ago(&keys, TimeDuration::days(6));
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn seven_day_token_is_expired_eight_days_in() {
        let keys = make_keys(7);
        let token = sign_issued_ago(&keys, TimeDuration::days(8));
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }

    #[test]
    fn expired_token_fails_with_token_expired() {
        // A negative lifetime puts exp in the past, past the decoder leeway.
        let keys = make_keys(-1);
        let token = keys.sign(&make_user()).expect("sign");
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::TokenExpired));
    }

    #[test]
    fn tampered_token_fails_with_token_invalid() {
        let keys = make_keys(7);
        let other = TokenKeys::from_config(&JwtConfig {
            secret: Some("different-secret".into()),
            ttl_days: 7,
        })
        .expect("keys");
        let token = other.sign(&make_user()).expect("sign");
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }

    #[test]
    fn garbage_token_fails_with_token_invalid() {
        let keys = make_keys(7);
        let err = keys.verify("not.a.jwt").unwrap_err();
        assert!(matches!(err, ApiError::TokenInvalid));
    }
}
