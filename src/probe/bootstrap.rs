//! RDAP bootstrap directory cache.
//!
//! The IANA bootstrap file maps each TLD to the registry servers that answer
//! RDAP queries for it. The directory is largely static, so it is fetched at
//! most once per TTL (a day) and kept stale when a refresh fails. A static
//! registry map covers the common TLDs when no directory is available at all.

use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const IANA_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";
const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Last-resort aggregator that proxies RDAP for any TLD.
pub const RDAP_FALLBACK_BASE: &str = "https://rdap.org";

#[derive(Debug, Deserialize)]
struct BootstrapFile {
    #[serde(default)]
    services: Vec<(Vec<String>, Vec<String>)>,
}

struct Directory {
    servers: HashMap<String, Vec<String>>,
    fetched_at: Instant,
}

/// Cached TLD-to-RDAP-server directory.
pub struct RdapBootstrap {
    client: Client,
    ttl: Duration,
    cache: RwLock<Option<Directory>>,
}

impl RdapBootstrap {
    pub fn new(client: Client) -> Self {
        Self::with_ttl(client, Duration::from_secs(24 * 60 * 60))
    }

    pub fn with_ttl(client: Client, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// RDAP base URL (no trailing slash) to query for `fqdn`.
    ///
    /// Resolution order: cached IANA directory, static registry map,
    /// the rdap.org aggregator.
    pub async fn base_url_for(&self, fqdn: &str) -> String {
        let Some(tld) = fqdn.rsplit('.').next().filter(|t| !t.is_empty()) else {
            return RDAP_FALLBACK_BASE.to_string();
        };
        let tld = tld.to_lowercase();

        self.refresh_if_stale().await;

        {
            let cache = self.cache.read();
            if let Some(directory) = cache.as_ref() {
                if let Some(base) = directory
                    .servers
                    .get(&tld)
                    .and_then(|servers| servers.first())
                {
                    return base.trim_end_matches('/').to_string();
                }
            }
        }

        static_rdap_base(&tld)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| RDAP_FALLBACK_BASE.to_string())
    }

    async fn refresh_if_stale(&self) {
        {
            let cache = self.cache.read();
            if let Some(directory) = cache.as_ref() {
                if directory.fetched_at.elapsed() < self.ttl {
                    return;
                }
            }
        }

        match self.fetch_directory().await {
            Some(servers) => {
                let mut cache = self.cache.write();
                *cache = Some(Directory {
                    servers,
                    fetched_at: Instant::now(),
                });
            }
            None => {
                // Keep whatever we had; a stale directory beats none.
                tracing::debug!("RDAP bootstrap refresh failed, keeping stale directory");
            }
        }
    }

    async fn fetch_directory(&self) -> Option<HashMap<String, Vec<String>>> {
        let request = self
            .client
            .get(IANA_BOOTSTRAP_URL)
            .header("accept", "application/json")
            .send();

        let response = match timeout(FETCH_TIMEOUT, request).await {
            Ok(Ok(response)) if response.status().is_success() => response,
            Ok(Ok(response)) => {
                tracing::debug!(status = %response.status(), "RDAP bootstrap fetch rejected");
                return None;
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "RDAP bootstrap fetch failed");
                return None;
            }
            Err(_) => {
                tracing::debug!("RDAP bootstrap fetch timed out");
                return None;
            }
        };

        let text = match timeout(FETCH_TIMEOUT, response.text()).await {
            Ok(Ok(text)) => text,
            _ => return None,
        };

        parse_directory(&text)
    }
}

/// Parse the IANA bootstrap file into a TLD-to-servers map.
fn parse_directory(text: &str) -> Option<HashMap<String, Vec<String>>> {
    let file: BootstrapFile = serde_json::from_str(text).ok()?;
    if file.services.is_empty() {
        return None;
    }

    let mut map = HashMap::new();
    for (tlds, servers) in file.services {
        for tld in tlds {
            if tld.is_empty() {
                continue;
            }
            map.insert(tld.to_lowercase(), servers.clone());
        }
    }
    Some(map)
}

/// Static RDAP base URLs for high-usage TLDs.
pub fn static_rdap_base(tld: &str) -> Option<&'static str> {
    match tld {
        "com" => Some("https://rdap.verisign.com/com/v1/"),
        "net" => Some("https://rdap.verisign.com/net/v1/"),
        "org" => Some("https://rdap.org.org/"),
        "io" => Some("https://rdap.nic.io/"),
        "ai" => Some("https://rdap.nic.ai/"),
        "app" => Some("https://rdap.nic.google/"),
        "dev" => Some("https://rdap.nic.google/"),
        "xyz" => Some("https://rdap.nic.xyz/"),
        "co" => Some("https://rdap.nic.co/"),
        "me" => Some("https://rdap.nic.me/"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_base_known_tlds() {
        assert!(static_rdap_base("com").is_some());
        assert!(static_rdap_base("ai").is_some());
        assert!(static_rdap_base("unknown").is_none());
    }

    #[test]
    fn test_parse_directory() {
        let sample = r#"{
            "description": "RDAP bootstrap file for Domain Name System registrations",
            "services": [
                [["com", "net"], ["https://rdap.verisign.com/com/v1/"]],
                [["io"], ["https://rdap.identitydigital.services/rdap/"]]
            ]
        }"#;
        let map = parse_directory(sample).unwrap();
        assert_eq!(
            map.get("com").unwrap()[0],
            "https://rdap.verisign.com/com/v1/"
        );
        assert!(map.contains_key("net"));
        assert!(map.contains_key("io"));
        assert!(!map.contains_key("ai"));
    }

    #[test]
    fn test_parse_directory_rejects_garbage() {
        assert!(parse_directory("not json").is_none());
        assert!(parse_directory(r#"{"services": []}"#).is_none());
    }

    #[tokio::test]
    async fn test_base_url_falls_back_without_directory() {
        // TTL of zero would try the network on every call; a long TTL with an
        // empty cache exercises only the static-map path after one failed fetch.
        let bootstrap = RdapBootstrap::with_ttl(
            Client::builder()
                .timeout(Duration::from_millis(1))
                .build()
                .unwrap(),
            Duration::from_secs(24 * 60 * 60),
        );

        let base = bootstrap.base_url_for("example.com").await;
        assert_eq!(base, "https://rdap.verisign.com/com/v1");

        let aggregated = bootstrap.base_url_for("example.quux").await;
        assert_eq!(aggregated, RDAP_FALLBACK_BASE);
    }
}
