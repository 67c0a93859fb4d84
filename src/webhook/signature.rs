//! Delivery signature verification for webhook events.
//!
//! Verifies the keyed digest the billing platform attaches to each delivery.
//! Verification always runs against the raw, unparsed body: re-serialization
//! is not guaranteed byte-identical, so parsing before verifying would break
//! the digest.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance for the timestamp embedded in the signature header.
///
/// Matches the platform's recommended few-minute skew allowance.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies webhook delivery signatures against a shared secret.
///
/// The platform signs each delivery with a header of the form
/// `t=<unix_seconds>,v1=<hex_digest>`, where the digest is HMAC-SHA256 over
/// the byte string `"{t}.{raw_body}"` keyed by the shared secret. A header
/// may carry several `v1` entries during secret rotation; verification
/// succeeds if any candidate matches.
///
/// The embedded timestamp must fall within a symmetric tolerance window
/// around the verifier's clock, which rejects replays of captured deliveries
/// even when the digest itself is valid.
///
/// # Unauthenticated mode
///
/// A verifier built without a secret skips signature checks entirely and
/// accepts every body. This exists so the bridge can run against local test
/// deliveries before a webhook secret is provisioned; it is **unsafe for
/// production** and every accepted delivery is logged with a warning.
///
/// # Examples
///
/// ```
/// use billing_bridge::webhook::SignatureVerifier;
///
/// let verifier = SignatureVerifier::new(Some("whsec_test".to_owned()), 300);
///
/// // A body with no signature header is rejected when a secret is set.
/// let result = verifier.verify(b"{}", None);
/// assert!(result.is_err());
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret never appears in logs or debug output.
        f.debug_struct("SignatureVerifier")
            .field("authenticated", &self.secret.is_some())
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl SignatureVerifier {
    /// Creates a verifier.
    ///
    /// `secret` is the shared webhook secret; `None` selects unauthenticated
    /// mode. `tolerance_secs` bounds the allowed clock skew for the embedded
    /// timestamp (see [`DEFAULT_TOLERANCE_SECS`]).
    #[must_use]
    pub fn new(secret: Option<String>, tolerance_secs: i64) -> Self {
        Self { secret, tolerance_secs }
    }

    /// Creates a verifier that accepts every delivery without checks.
    ///
    /// Unsafe for production; see the type-level documentation.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { secret: None, tolerance_secs: DEFAULT_TOLERANCE_SECS }
    }

    /// Returns `true` when a shared secret is configured.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.secret.is_some()
    }

    /// Verifies a delivery against the raw body bytes.
    ///
    /// # Errors
    ///
    /// - [`VerificationError::BadSignature`] if the header is absent,
    ///   unparseable, or no digest candidate matches
    /// - [`VerificationError::StaleTimestamp`] if the digest matches but the
    ///   embedded timestamp is outside the tolerance window
    pub fn verify(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), VerificationError> {
        self.verify_at(raw_body, signature_header, Utc::now().timestamp())
    }

    /// Clock-injected implementation of [`verify`](Self::verify).
    fn verify_at(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> Result<(), VerificationError> {
        let Some(secret) = &self.secret else {
            warn!("webhook secret not configured; accepting delivery without verification");
            return Ok(());
        };

        let header = signature_header.ok_or_else(|| {
            VerificationError::BadSignature("signature header required but absent".to_owned())
        })?;

        let parsed = ParsedHeader::parse(header)?;

        let mut matched = false;
        for candidate in &parsed.digests {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
                VerificationError::BadSignature(format!("invalid secret key material: {e}"))
            })?;
            mac.update(parsed.timestamp_str.as_bytes());
            mac.update(b".");
            mac.update(raw_body);

            // Constant-time comparison.
            if mac.verify_slice(candidate).is_ok() {
                matched = true;
                break;
            }
        }

        if !matched {
            warn!(candidates = parsed.digests.len(), "no signature candidate matched raw body");
            return Err(VerificationError::BadSignature(
                "no signature matched the expected digest for this body".to_owned(),
            ));
        }

        let skew_secs = (now - parsed.timestamp).abs();
        if skew_secs > self.tolerance_secs {
            warn!(skew_secs, tolerance_secs = self.tolerance_secs, "stale delivery timestamp");
            return Err(VerificationError::StaleTimestamp {
                skew_secs,
                tolerance_secs: self.tolerance_secs,
            });
        }

        debug!("delivery signature verified");
        Ok(())
    }
}

/// Timestamp and digest candidates extracted from a signature header.
struct ParsedHeader {
    timestamp: i64,
    /// The exact timestamp substring from the header, reused when
    /// recomputing the digest so no reformatting can alter the signed bytes.
    timestamp_str: String,
    digests: Vec<Vec<u8>>,
}

impl ParsedHeader {
    fn parse(header: &str) -> Result<Self, VerificationError> {
        let mut timestamp_str = None;
        let mut digests = Vec::new();

        for element in header.split(',') {
            let Some((key, value)) = element.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp_str = Some(value.to_owned()),
                "v1" => {
                    let bytes = hex::decode(value).map_err(|e| {
                        VerificationError::BadSignature(format!("signature is not valid hex: {e}"))
                    })?;
                    digests.push(bytes);
                }
                // Older or newer schemes may add elements; ignore them.
                _ => {}
            }
        }

        let timestamp_str = timestamp_str.ok_or_else(|| {
            VerificationError::BadSignature("signature header missing timestamp element".to_owned())
        })?;
        let timestamp = timestamp_str.parse::<i64>().map_err(|_| {
            VerificationError::BadSignature(format!("invalid timestamp element: {timestamp_str}"))
        })?;

        if digests.is_empty() {
            return Err(VerificationError::BadSignature(
                "signature header carries no digest element".to_owned(),
            ));
        }

        Ok(Self { timestamp, timestamp_str, digests })
    }
}
