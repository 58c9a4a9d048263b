//! Client for the external IP reputation service.
//!
//! Speaks the db-ip.com v2 API: `GET {endpoint}/{token}/{address}`
//! returns a JSON record with, among many fields, the ISP name, a usage
//! type and a threat level. Only those three are read here.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::NebulaError;

/// Reason code for addresses rated medium or high threat.
pub const REASON_THREAT_LEVEL: &str = "THREAT_LEVEL_ABOVE_MEDIUM";
/// Reason code for addresses in hosting / data-center ranges.
pub const REASON_HOSTING: &str = "HOSTING";

/// Verdict for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IpVerdict {
    /// Address that was looked up.
    pub address: String,
    /// ISP reported by the reputation service.
    pub isp: String,
    /// Whether the address should be treated as suspicious.
    pub is_suspicious: bool,
    /// Reason code when suspicious, empty otherwise.
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReputationRecord {
    ip_address: String,
    isp: String,
    usage_type: String,
    threat_level: String,
}

/// Applies the suspicion rules to a reputation record.
fn classify(address: &str, record: ReputationRecord) -> IpVerdict {
    let reason = if matches!(record.threat_level.as_str(), "medium" | "high") {
        REASON_THREAT_LEVEL
    } else if record.usage_type == "hosting" {
        REASON_HOSTING
    } else {
        ""
    };
    let address = if record.ip_address.is_empty() {
        address.to_string()
    } else {
        record.ip_address
    };
    IpVerdict {
        address,
        isp: record.isp,
        is_suspicious: !reason.is_empty(),
        reason: reason.to_string(),
    }
}

/// HTTP client for the reputation service.
#[derive(Debug, Clone)]
pub struct IpReputationClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl IpReputationClient {
    /// Creates a client for `endpoint` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Internal`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NebulaError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NebulaError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Looks up `address` and classifies it.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::InvalidRequest`] if `address` is not an IP
    /// address and [`NebulaError::Upstream`] if the service cannot be
    /// reached or answers with something unreadable.
    pub async fn lookup(&self, address: &str) -> Result<IpVerdict, NebulaError> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| NebulaError::InvalidRequest(format!("not an IP address: {address}")))?;

        let url = format!("{}/{}/{}", self.endpoint, self.token, ip);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| NebulaError::Upstream(format!("ip lookup request failed: {}", e.without_url())))?
            .error_for_status()
            .map_err(|e| NebulaError::Upstream(format!("ip lookup rejected: {}", e.without_url())))?;

        let record: ReputationRecord = response
            .json()
            .await
            .map_err(|e| NebulaError::Upstream(format!("ip lookup response unreadable: {}", e.without_url())))?;

        let verdict = classify(&ip.to_string(), record);
        tracing::debug!(address = %verdict.address, suspicious = verdict.is_suspicious, reason = %verdict.reason, "ip lookup");
        Ok(verdict)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn record(threat: &str, usage: &str) -> ReputationRecord {
        ReputationRecord {
            ip_address: "203.0.113.7".to_string(),
            isp: "Example Net".to_string(),
            usage_type: usage.to_string(),
            threat_level: threat.to_string(),
        }
    }

    #[test]
    fn high_threat_is_suspicious() {
        let verdict = classify("203.0.113.7", record("high", "consumer"));
        assert!(verdict.is_suspicious);
        assert_eq!(verdict.reason, REASON_THREAT_LEVEL);
        assert_eq!(verdict.isp, "Example Net");
    }

    #[test]
    fn threat_outranks_hosting() {
        let verdict = classify("203.0.113.7", record("medium", "hosting"));
        assert_eq!(verdict.reason, REASON_THREAT_LEVEL);
    }

    #[test]
    fn hosting_is_suspicious() {
        let verdict = classify("203.0.113.7", record("low", "hosting"));
        assert!(verdict.is_suspicious);
        assert_eq!(verdict.reason, REASON_HOSTING);
    }

    #[test]
    fn consumer_low_threat_is_clean() {
        let verdict = classify("203.0.113.7", record("low", "consumer"));
        assert!(!verdict.is_suspicious);
        assert!(verdict.reason.is_empty());
    }

    #[test]
    fn record_parses_camel_case_and_ignores_extra_fields() {
        let json = r#"{"ipAddress":"198.51.100.1","isp":"Hoster","usageType":"hosting",
            "threatLevel":"low","countryCode":"DE","isCrawler":false}"#;
        let Ok(parsed) = serde_json::from_str::<ReputationRecord>(json) else {
            panic!("record must parse");
        };
        let verdict = classify("198.51.100.1", parsed);
        assert_eq!(verdict.reason, REASON_HOSTING);
        assert_eq!(verdict.address, "198.51.100.1");
    }

    #[tokio::test]
    async fn invalid_address_is_rejected_before_any_request() {
        let Ok(client) = IpReputationClient::new("http://127.0.0.1:9", "t", Duration::from_secs(1))
        else {
            panic!("client must build");
        };
        let result = client.lookup("not-an-ip").await;
        assert!(matches!(result, Err(NebulaError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_upstream_error() {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        drop(listener);

        let Ok(client) = IpReputationClient::new(
            format!("http://{addr}/v2/"),
            "t",
            Duration::from_secs(1),
        ) else {
            panic!("client must build");
        };
        let result = client.lookup("203.0.113.7").await;
        assert!(matches!(result, Err(NebulaError::Upstream(_))));
    }
}
