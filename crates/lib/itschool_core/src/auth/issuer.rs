//! Token issuance: signed access tokens, opaque refresh and reset tokens.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::AccessClaims;

type HmacSha256 = Hmac<Sha256>;

/// Access token lifetime: 1 hour.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 60 * 60;

/// Random bytes behind each refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Random bytes behind each reset token (hex-encoded: 32 chars).
const RESET_TOKEN_BYTES: usize = 16;

/// Separator between the encoded user id and the MAC in a refresh token.
const REFRESH_TOKEN_DELIMITER: char = '.';

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies tokens with the process-wide signing secret.
///
/// The secret is read once at startup and never mutated. If none was
/// configured, every signing attempt fails with [`AuthError::Signing`].
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Option<Arc<[u8]>>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TokenIssuer {
    /// Build an issuer. Empty secrets are treated as absent.
    pub fn new(secret: Option<&str>) -> Self {
        let secret = secret
            .filter(|s| !s.is_empty())
            .map(|s| Arc::from(s.as_bytes()));
        Self { secret }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    fn secret(&self) -> Result<&[u8], AuthError> {
        self.secret
            .as_deref()
            .ok_or_else(|| AuthError::Signing("signing secret is not configured".into()))
    }

    /// Sign an HS256 access token for `user_id`, valid for one hour from `now`.
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        role_id: Uuid,
        role_name: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError> {
        let expires_at = now + Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS);
        let claims = AccessClaims {
            sub: user_id.to_string(),
            role: role_name.to_string(),
            role_id,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret()?),
        )
        .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))?;
        debug!(%user_id, role = role_name, "access token issued");
        Ok(AccessToken { token, expires_at })
    }

    /// Verify signature and expiry of an access token against `now`.
    ///
    /// Expiry is checked here rather than by `jsonwebtoken` so it follows the
    /// injected clock.
    pub fn verify_access_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessClaims, AuthError> {
        let secret = self
            .secret()
            .map_err(|_| AuthError::InvalidToken("signing secret is not configured".into()))?;
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let claims = decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;
        if now.timestamp() >= claims.exp {
            return Err(AuthError::InvalidToken("token expired".into()));
        }
        Ok(claims)
    }

    /// Mint an opaque refresh token: `base64url(user_id) "." base64url(HMAC(secret, random))`.
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let mut nonce = [0u8; REFRESH_TOKEN_BYTES];
        fill_random(&mut nonce)?;

        let mut mac = HmacSha256::new_from_slice(self.secret()?)
            .map_err(|e| AuthError::Signing(format!("hmac key: {e}")))?;
        mac.update(&nonce);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}{}{}",
            URL_SAFE.encode(user_id.to_string()),
            REFRESH_TOKEN_DELIMITER,
            URL_SAFE.encode(signature)
        ))
    }

    /// Mint a reset token: 16 random bytes, lowercase hex.
    pub fn issue_reset_token(&self) -> Result<String, AuthError> {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        fill_random(&mut bytes)?;
        Ok(hex::encode(bytes))
    }
}

fn fill_random(buf: &mut [u8]) -> Result<(), AuthError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| AuthError::RandomSource(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(Some("test-secret"))
    }

    #[test]
    fn access_token_round_trips_subject_and_role() {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let token = issuer()
            .issue_access_token(user_id, role_id, "admin", now)
            .unwrap();

        assert_eq!(token.expires_at, now + Duration::hours(1));

        let claims = issuer().verify_access_token(&token.token, now).unwrap();
        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.role_id, role_id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn access_token_rejected_after_one_hour() {
        let now = Utc::now();
        let token = issuer()
            .issue_access_token(Uuid::new_v4(), Uuid::new_v4(), "curator", now)
            .unwrap();

        let just_before = now + Duration::minutes(59);
        assert!(issuer().verify_access_token(&token.token, just_before).is_ok());

        let after = now + Duration::hours(1);
        assert!(matches!(
            issuer().verify_access_token(&token.token, after),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn access_token_rejected_under_other_secret() {
        let now = Utc::now();
        let token = issuer()
            .issue_access_token(Uuid::new_v4(), Uuid::new_v4(), "admin", now)
            .unwrap();
        let other = TokenIssuer::new(Some("another-secret"));
        assert!(matches!(
            other.verify_access_token(&token.token, now),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(issuer().verify_access_token("not-a-jwt", now).is_err());
    }

    #[test]
    fn missing_secret_is_a_signing_error() {
        let issuer = TokenIssuer::new(None);
        assert!(!issuer.has_secret());
        assert!(matches!(
            issuer.issue_access_token(Uuid::new_v4(), Uuid::new_v4(), "admin", Utc::now()),
            Err(AuthError::Signing(_))
        ));
        assert!(matches!(
            issuer.issue_refresh_token(Uuid::new_v4()),
            Err(AuthError::Signing(_))
        ));
        assert!(!TokenIssuer::new(Some("")).has_secret());
    }

    #[test]
    fn refresh_token_embeds_user_id_and_is_unique() {
        let user_id = Uuid::new_v4();
        let a = issuer().issue_refresh_token(user_id).unwrap();
        let b = issuer().issue_refresh_token(user_id).unwrap();
        assert_ne!(a, b);

        let (encoded_id, mac) = a.split_once('.').unwrap();
        let decoded = URL_SAFE.decode(encoded_id).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), user_id.to_string());
        assert_eq!(URL_SAFE.decode(mac).unwrap().len(), 32);
    }

    #[test]
    fn reset_token_is_32_hex_chars() {
        let token = issuer().issue_reset_token().unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, issuer().issue_reset_token().unwrap());
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", issuer());
        assert!(!rendered.contains("test-secret"));
    }
}
