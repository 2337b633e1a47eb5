//! Signed one-shot tokens for email links
//!
//! Verification, password reset and unsubscribe links carry a token of the
//! form `{user_id}.{expires}.{signature}`. The signature is a hex encoded
//! HMAC-SHA256 over `purpose:user_id:expires`, so a token minted for one
//! purpose is rejected for every other one.

use chrono::{Duration, Utc};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Verify,
    Reset,
    Unsubscribe,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Verify => "verify",
            TokenPurpose::Reset => "reset",
            TokenPurpose::Unsubscribe => "unsubscribe",
        }
    }
}

/// Mints and checks signed tokens
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
        }
    }

    /// Sign a token for `user_id` that expires after the configured ttl
    pub fn sign(&self, purpose: TokenPurpose, user_id: i64) -> String {
        let expires = (Utc::now() + self.ttl).timestamp();
        self.sign_until(purpose, user_id, expires)
    }

    fn sign_until(&self, purpose: TokenPurpose, user_id: i64, expires: i64) -> String {
        let mac = self.mac(purpose, user_id, expires).finalize().into_bytes();
        let signature = HEXLOWER.encode(&mac);
        format!("{}.{}.{}", user_id, expires, signature)
    }

    /// Return the user id a valid, unexpired token was minted for
    pub fn verify(&self, purpose: TokenPurpose, token: &str) -> Option<i64> {
        let mut parts = token.splitn(3, '.');
        let user_id: i64 = parts.next()?.parse().ok()?;
        let expires: i64 = parts.next()?.parse().ok()?;
        let signature = HEXLOWER.decode(parts.next()?.as_bytes()).ok()?;

        if expires < Utc::now().timestamp() {
            return None;
        }

        self.mac(purpose, user_id, expires)
            .verify_slice(&signature)
            .ok()
            .map(|_| user_id)
    }

    fn mac(&self, purpose: TokenPurpose, user_id: i64, expires: i64) -> HmacSha256 {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
        mac.update(format!("{}:{}:{}", purpose.as_str(), user_id, expires).as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", Duration::hours(1))
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let token = signer.sign(TokenPurpose::Verify, 42);
        assert_eq!(signer.verify(TokenPurpose::Verify, &token), Some(42));
    }

    #[test]
    fn test_purpose_is_bound() {
        let signer = signer();
        let token = signer.sign(TokenPurpose::Verify, 42);
        assert_eq!(signer.verify(TokenPurpose::Reset, &token), None);
        assert_eq!(signer.verify(TokenPurpose::Unsubscribe, &token), None);
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().sign(TokenPurpose::Reset, 7);
        let other = TokenSigner::new("another-secret", Duration::hours(1));
        assert_eq!(other.verify(TokenPurpose::Reset, &token), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let past = (Utc::now() - Duration::minutes(5)).timestamp();
        let token = signer.sign_until(TokenPurpose::Reset, 7, past);
        assert_eq!(signer.verify(TokenPurpose::Reset, &token), None);
    }

    #[test]
    fn test_tampered_user_id_rejected() {
        let signer = signer();
        let token = signer.sign(TokenPurpose::Verify, 1);
        let forged = token.replacen("1.", "2.", 1);
        assert_eq!(signer.verify(TokenPurpose::Verify, &forged), None);
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = signer();
        for token in ["", "abc", "1.2", "1.99999999999.zz", "x.y.z"] {
            assert_eq!(signer.verify(TokenPurpose::Verify, token), None);
        }
    }

    #[test]
    fn test_signature_must_be_lowercase_hex() {
        let signer = signer();
        let token = signer.sign(TokenPurpose::Verify, 5);
        let (head, signature) = token.rsplit_once('.').unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

        let upper = format!("{}.{}", head, signature.to_uppercase());
        assert_eq!(signer.verify(TokenPurpose::Verify, &upper), None);
        let odd = format!("{}.{}", head, &signature[1..]);
        assert_eq!(signer.verify(TokenPurpose::Verify, &odd), None);
    }
}
