//! REST implementation of the platform capability.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use url::Url;

use crate::{
    error::{ConfigError, UsageReportError},
    platform::api::{PlatformApi, UsageAck},
    subscription::{IdempotencyKey, ItemId, UsageAction, UsageRecord},
};

/// Platform client over HTTPS.
///
/// Holds a pooled [`reqwest::Client`]; construct once and share. Carries no
/// other state, so concurrent submissions for different items never
/// interfere.
#[derive(Clone)]
pub struct RestPlatform {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for RestPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The API key never appears in logs or debug output.
        f.debug_struct("RestPlatform").field("base_url", &self.base_url.as_str()).finish()
    }
}

impl RestPlatform {
    /// Creates a client for the given API base URL.
    ///
    /// Configuration mirrors the bridge's other outbound calls: 30 second
    /// total timeout, 10 second connect timeout, up to 10 pooled idle
    /// connections per host.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the base URL is not HTTPS, points
    /// at a loopback host, or the HTTP client cannot be constructed.
    pub fn new<S: Into<String>>(base_url: &str, api_key: S) -> Result<Self, ConfigError> {
        let base_url = validate_base_url(base_url)?;

        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url, api_key: api_key.into() })
    }

    fn usage_records_url(&self, item: &ItemId) -> Result<Url, UsageReportError> {
        self.base_url
            .join(&format!("v1/subscription_items/{item}/usage_records"))
            .map_err(|e| UsageReportError::Rejected(format!("malformed item reference: {e}")))
    }
}

/// Validates an API base URL: HTTPS only, no loopback.
pub(crate) fn validate_base_url(base_url: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::Invalid(format!("invalid base URL '{base_url}': {e}")))?;

    if url.scheme() != "https" {
        return Err(ConfigError::Invalid(format!(
            "base URL must use HTTPS, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        if host == "localhost" || host.starts_with("127.") || host == "[::1]" {
            return Err(ConfigError::Invalid(format!(
                "base URL must not point at a loopback host: {host}"
            )));
        }
    }

    Ok(url)
}

/// Wire body of a usage-record submission.
#[derive(Serialize)]
struct WireUsageRecord {
    quantity: u64,
    timestamp: i64,
    action: UsageAction,
}

/// Wire shape of the platform's acknowledgement.
#[derive(Deserialize)]
struct WireAck {
    id: String,
    subscription_item: String,
    quantity: u64,
}

/// Wire shape of the platform's error envelope.
#[derive(Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    message: String,
}

/// Extracts the platform's human-readable message from an error body,
/// falling back to the raw text.
fn platform_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<WireError>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => format!("status {status}: {body}"),
    }
}

impl PlatformApi for RestPlatform {
    #[instrument(skip(self, record, key), fields(item = %record.item))]
    async fn submit_usage_record(
        &self,
        record: &UsageRecord,
        key: &IdempotencyKey,
    ) -> Result<UsageAck, UsageReportError> {
        let url = self.usage_records_url(&record.item)?;
        let body = WireUsageRecord {
            quantity: record.quantity,
            timestamp: record.timestamp.timestamp(),
            action: record.action,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "usage record submission did not complete");
                UsageReportError::TransportFailure(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let ack: WireAck = response.json().await.map_err(|e| {
                UsageReportError::Rejected(format!("unparseable platform acknowledgement: {e}"))
            })?;
            return Ok(UsageAck {
                record_id: ack.id,
                item: ItemId::new(ack.subscription_item),
                quantity: ack.quantity,
            });
        }

        let text = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            // Outcome unknown on the platform side; the same key makes a
            // retry safe.
            return Err(UsageReportError::TransportFailure(platform_message(status, &text)));
        }

        Err(UsageReportError::Rejected(platform_message(status, &text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_new_accepts_https_base() {
        assert!(RestPlatform::new("https://api.billing.example.com", "sk_test").is_ok());
    }

    #[test]
    fn test_new_rejects_http_base() {
        let result = RestPlatform::new("http://api.billing.example.com", "sk_test");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_new_rejects_loopback() {
        for base in ["https://localhost", "https://127.0.0.1", "https://[::1]"] {
            assert!(RestPlatform::new(base, "sk_test").is_err(), "{base} should be rejected");
        }
    }

    #[test]
    fn test_new_rejects_garbage_url() {
        assert!(RestPlatform::new("not a url", "sk_test").is_err());
    }

    #[test]
    fn test_usage_records_url_shape() {
        let platform = RestPlatform::new("https://api.billing.example.com", "sk_test").unwrap();
        let url = platform.usage_records_url(&ItemId::new("si_42")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.billing.example.com/v1/subscription_items/si_42/usage_records"
        );
    }

    // ========================================================================
    // Error Mapping Tests
    // ========================================================================

    #[test]
    fn test_platform_message_extracted_from_envelope() {
        let body = r#"{"error":{"message":"No such subscription item: si_404"}}"#;
        let message = platform_message(reqwest::StatusCode::NOT_FOUND, body);
        assert_eq!(message, "No such subscription item: si_404");
    }

    #[test]
    fn test_platform_message_falls_back_to_raw_body() {
        let message = platform_message(reqwest::StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert!(message.contains("502"));
        assert!(message.contains("upstream unavailable"));
    }
}
