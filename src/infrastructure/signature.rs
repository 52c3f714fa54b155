//! Billing webhook signature verification
//!
//! Events arrive signed with a shared secret provisioned out of band. The
//! signature covers the raw body, so verification happens before the payload
//! is parsed or trusted in any way. Failures carry no detail about which
//! part of the check failed.
//!
//! Header scheme: `t=<unix seconds>,v1=<hex hmac-sha256 of "{t}.{body}">`.
//! The timestamp bounds how long a captured event can be replayed.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::config::BillingConfig;
use crate::domain::GateError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook signature headers against the shared billing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            secret: config.webhook_secret.as_bytes().to_vec(),
            tolerance: Duration::from_secs(config.signature_tolerance_seconds),
        }
    }

    /// Verify `header` against the raw request body.
    pub fn verify(
        &self,
        body: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<(), GateError> {
        let (timestamp, signature) =
            parse_header(header).ok_or(GateError::WebhookSignatureInvalid)?;

        let age = (now.timestamp() - timestamp).unsigned_abs();
        if age > self.tolerance.as_secs() {
            return Err(GateError::WebhookSignatureInvalid);
        }

        let expected = hex::decode(signature).map_err(|_| GateError::WebhookSignatureInvalid)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| GateError::WebhookSignatureInvalid)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);

        // verify_slice is constant-time; no oracle for forgery attempts.
        mac.verify_slice(&expected)
            .map_err(|_| GateError::WebhookSignatureInvalid)
    }

    /// Produce a signature header for `body` at `timestamp`. The counterpart
    /// of [`verify`](Self::verify); used by event senders and tests.
    pub fn sign(&self, body: &[u8], timestamp: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }
}

fn parse_header(header: &str) -> Option<(i64, &str)> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    Some((timestamp?, signature?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(&BillingConfig {
            webhook_secret: "whsec_test".to_string(),
            signature_tolerance_seconds: 300,
        })
    }

    #[test]
    fn accepts_valid_signature() {
        let verifier = verifier();
        let body = br#"{"type":"subscription.updated"}"#;
        let now = Utc::now();
        let header = verifier.sign(body, now.timestamp());

        assert!(verifier.verify(body, &header, now).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = verifier();
        let now = Utc::now();
        let header = verifier.sign(br#"{"tier":"free"}"#, now.timestamp());

        let result = verifier.verify(br#"{"tier":"pro"}"#, &header, now);
        assert_eq!(result, Err(GateError::WebhookSignatureInvalid));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = verifier();
        let body = b"{}";
        let now = Utc::now();
        let header = verifier.sign(body, now.timestamp() - 301);

        let result = verifier.verify(body, &header, now);
        assert_eq!(result, Err(GateError::WebhookSignatureInvalid));
    }

    #[test]
    fn rejects_malformed_header() {
        let verifier = verifier();
        let now = Utc::now();

        for header in ["", "t=abc,v1=00", "v1=00", "t=123", "t=123,v1=zz"] {
            assert_eq!(
                verifier.verify(b"{}", header, now),
                Err(GateError::WebhookSignatureInvalid),
                "header {:?} should be rejected",
                header
            );
        }
    }
}
