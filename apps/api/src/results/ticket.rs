//! Signed, expiring download tickets.
//!
//! A ticket is `"{result_id}.{issued_at}.{signature}"` where the signature
//! is HMAC-SHA256 over `"{result_id}.{issued_at}"` under the process-wide
//! secret, base64url without padding. Result ids are themselves base64url,
//! so `.` never appears inside a field. Tickets are stateless: validity is a
//! pure function of the token, the key, the max age and the clock.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct DownloadSigner {
    key: Vec<u8>,
    /// Ticket time-to-live in seconds.
    pub expires_in: u64,
}

impl DownloadSigner {
    pub fn new(secret: &str, expires_in: u64) -> Self {
        DownloadSigner {
            key: secret.as_bytes().to_vec(),
            expires_in,
        }
    }

    /// Issues a ticket for one result id, stamped with the current time.
    pub fn issue(&self, result_id: &str) -> String {
        self.issue_at(result_id, Utc::now().timestamp())
    }

    fn issue_at(&self, result_id: &str, issued_at: i64) -> String {
        let payload = format!("{result_id}.{issued_at}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&payload));
        format!("{payload}.{signature}")
    }

    /// Validates a ticket against the current time and returns the result id
    /// it was issued for. The caller must still compare that id against the
    /// one being requested.
    pub fn validate(&self, token: &str) -> Result<String, AppError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Pure validation against an explicit clock. The signature is verified
    /// before the embedded timestamp is trusted; only an authenticated
    /// timestamp can produce `TokenExpired`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<String, AppError> {
        let mut parts = token.split('.');
        let (Some(result_id), Some(issued_raw), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AppError::InvalidToken("malformed token".to_string()));
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AppError::InvalidToken("malformed signature".to_string()))?;
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(format!("{result_id}.{issued_raw}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::InvalidToken("signature mismatch".to_string()))?;

        let issued_at: i64 = issued_raw
            .parse()
            .map_err(|_| AppError::InvalidToken("malformed timestamp".to_string()))?;
        if now.saturating_sub(issued_at) > self.expires_in as i64 {
            return Err(AppError::TokenExpired);
        }

        Ok(result_id.to_string())
    }

    fn mac(&self, payload: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
