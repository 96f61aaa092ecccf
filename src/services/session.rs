//! Session tokens
//!
//! Sessions are held by the client. A token carries the user id and an
//! expiry, signed with HMAC-SHA256:
//!
//! ```text
//! base64url(user_id:expires_unix) "." hex(hmac_sha256(payload))
//! ```
//!
//! The server keeps no session state. Whoever resolves a token must still
//! re-fetch the user, since the account may have been deleted since.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use data_encoding::{BASE64URL_NOPAD, HEXLOWER};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::{AuthConfig, MAX_SESSION_DAYS};

type HmacSha256 = Hmac<Sha256>;

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks signed session tokens
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl SessionSigner {
    pub fn new(secret: &[u8], session_days: i64) -> Result<Self> {
        if !(1..=MAX_SESSION_DAYS).contains(&session_days) {
            bail!(
                "Session length must be between 1 and {} days, got {}",
                MAX_SESSION_DAYS,
                session_days
            );
        }
        let ttl = Duration::try_days(session_days)
            .ok_or_else(|| anyhow!("Session length out of range: {} days", session_days))?;
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow!("Invalid session key: {}", e))?;
        Ok(Self { mac, ttl })
    }

    /// Build a signer from the auth section.
    ///
    /// Without a configured secret a random key is generated, so tokens
    /// don't survive a restart.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = match &config.token_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!("auth.token_secret not set, sessions end on restart");
                format!("{}{}", Uuid::new_v4(), Uuid::new_v4())
            }
        };
        Self::new(secret.as_bytes(), config.session_days)
    }

    pub fn issue(&self, user_id: i64) -> Result<SessionToken> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<SessionToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow!("Session expiry out of range"))?;
        let payload = format!("{}:{}", user_id, expires_at.timestamp());
        let encoded = BASE64URL_NOPAD.encode(payload.as_bytes());
        let signature = HEXLOWER.encode(&self.sign(encoded.as_bytes()));

        Ok(SessionToken {
            token: format!("{}.{}", encoded, signature),
            expires_at,
        })
    }

    /// Returns the user id if the token is authentic and not expired
    pub fn verify(&self, token: &str) -> Option<i64> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<i64> {
        let (encoded, signature) = token.split_once('.')?;
        let signature = HEXLOWER.decode(signature.as_bytes()).ok()?;

        let mut mac = self.mac.clone();
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let payload = BASE64URL_NOPAD.decode(encoded.as_bytes()).ok()?;
        let payload = String::from_utf8(payload).ok()?;
        let (user_id, expires) = payload.split_once(':')?;
        let user_id: i64 = user_id.parse().ok()?;
        let expires = Utc.timestamp_opt(expires.parse().ok()?, 0).single()?;

        if expires <= now {
            return None;
        }
        Some(user_id)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signer() -> SessionSigner {
        SessionSigner::new(b"test-secret", 7).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer();
        let issued = signer.issue(42).unwrap();
        assert_eq!(signer.verify(&issued.token), Some(42));
        assert!(issued.expires_at > Utc::now() + Duration::days(6));
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let issued = signer.issue_at(42, Utc::now() - Duration::days(8)).unwrap();
        assert_eq!(signer.verify(&issued.token), None);
    }

    #[test]
    fn test_other_key_rejected() {
        let issued = signer().issue(42).unwrap();
        let other = SessionSigner::new(b"another-secret", 7).unwrap();
        assert_eq!(other.verify(&issued.token), None);
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let signer = signer();
        for token in ["", ".", "abc", "abc.def", "NDI6OTk5OTk5OTk5OQ.zz"] {
            assert_eq!(signer.verify(token), None, "{token}");
        }
    }

    #[test]
    fn test_session_length_bounds() {
        assert!(SessionSigner::new(b"k", 0).is_err());
        assert!(SessionSigner::new(b"k", -1).is_err());
        assert!(SessionSigner::new(b"k", MAX_SESSION_DAYS + 1).is_err());
        assert!(SessionSigner::new(b"k", 200_000_000_000_000).is_err());
        assert!(SessionSigner::new(b"k", MAX_SESSION_DAYS).is_ok());

        let config = AuthConfig {
            session_days: i64::MAX,
            ..AuthConfig::default()
        };
        assert!(SessionSigner::from_config(&config).is_err());
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let signer = SessionSigner::new(b"k", MAX_SESSION_DAYS).unwrap();
        let now = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        assert!(signer.issue_at(1, now).is_err());
    }

    #[test]
    fn test_random_key_from_config() {
        let config = AuthConfig {
            token_secret: None,
            ..AuthConfig::default()
        };
        let a = SessionSigner::from_config(&config).unwrap();
        let b = SessionSigner::from_config(&config).unwrap();
        let token = a.issue(1).unwrap().token;
        assert_eq!(a.verify(&token), Some(1));
        assert_eq!(b.verify(&token), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn token_roundtrips_for_any_user(user_id in any::<i64>()) {
            let signer = signer();
            let issued = signer.issue(user_id).unwrap();
            prop_assert_eq!(signer.verify(&issued.token), Some(user_id));
        }

        #[test]
        fn forged_payload_is_rejected(user_id in 1i64..1_000_000, forged in 1i64..1_000_000) {
            prop_assume!(user_id != forged);
            let signer = signer();
            let issued = signer.issue(user_id).unwrap();
            let (_, signature) = issued.token.split_once('.').unwrap();

            let payload = format!("{}:{}", forged, issued.expires_at.timestamp());
            let tampered = format!("{}.{}", BASE64URL_NOPAD.encode(payload.as_bytes()), signature);
            prop_assert_eq!(signer.verify(&tampered), None);
        }
    }
}
