//! Domain availability probing.
//!
//! Best-effort enrichment, never a correctness-critical path: every outbound
//! lookup carries its own aggressive timeout, and one TLD's failure degrades
//! that single verdict to unknown without touching the others.
//!
//! Verdict tiering per candidate FQDN: a definitive RDAP answer wins; an
//! inconclusive one falls through to a DNS existence check; a DNS record means
//! taken, anything else stays unknown. Absence of DNS is not proof of an
//! unregistered domain, so a DNS timeout is never upgraded to available.

pub mod bootstrap;

pub use bootstrap::RdapBootstrap;

use async_trait::async_trait;
use futures::future::join_all;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{NamecraftError, Result};
use crate::types::{DomainCheck, DomainReport, DomainStatus};

const RDAP_TIMEOUT: Duration = Duration::from_millis(2500);
const DNS_TIMEOUT: Duration = Duration::from_secs(2);

/// What the registry-metadata lookup said about an FQDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySignal {
    /// A record with an identifying field is present.
    Registered,
    /// Definitive 404-equivalent.
    NotFound,
    /// Unparseable, errored, timed out, or otherwise not definitive.
    Inconclusive,
}

/// What the DNS existence check said about an FQDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsSignal {
    Resolved,
    NoRecords,
    TimedOut,
    Failed,
}

/// DNS existence check, injectable so tests stay off the network.
#[async_trait]
pub trait DnsProbe: Send + Sync {
    /// Does any address record resolve for this name?
    async fn resolve_any(&self, fqdn: &str) -> DnsSignal;
}

/// Production DNS probe backed by hickory-resolver.
pub struct HickoryDnsProbe {
    resolver: TokioAsyncResolver,
}

impl HickoryDnsProbe {
    /// Resolver with default public nameservers.
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }

    /// Resolver using the host's configured nameservers.
    pub fn from_system() -> Result<Self> {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf()
            .map_err(|e| NamecraftError::internal(format!("Failed to read resolver config: {e}")))?;
        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        })
    }
}

impl Default for HickoryDnsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsProbe for HickoryDnsProbe {
    async fn resolve_any(&self, fqdn: &str) -> DnsSignal {
        match timeout(DNS_TIMEOUT, self.resolver.lookup_ip(fqdn)).await {
            Ok(Ok(lookup)) => {
                if lookup.iter().next().is_some() {
                    DnsSignal::Resolved
                } else {
                    DnsSignal::NoRecords
                }
            }
            Ok(Err(e)) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => DnsSignal::NoRecords,
                ResolveErrorKind::Timeout => DnsSignal::TimedOut,
                _ => DnsSignal::Failed,
            },
            Err(_) => DnsSignal::TimedOut,
        }
    }
}

/// Probes a candidate base label across a set of TLDs.
#[async_trait]
pub trait DomainProber: Send + Sync {
    async fn probe(&self, base_label: &str) -> DomainReport;
}

/// RDAP-first availability prober with an optional DNS fallback.
pub struct AvailabilityProber {
    client: Client,
    bootstrap: RdapBootstrap,
    dns: Option<Arc<dyn DnsProbe>>,
    tlds: Vec<String>,
}

impl AvailabilityProber {
    pub fn new(tlds: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("namecraft/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| NamecraftError::network(e.to_string(), None, None))?;

        Ok(Self {
            bootstrap: RdapBootstrap::new(client.clone()),
            client,
            dns: None,
            tlds,
        })
    }

    /// Enable the DNS existence fallback for inconclusive registry answers.
    pub fn with_dns(mut self, dns: Arc<dyn DnsProbe>) -> Self {
        self.dns = Some(dns);
        self
    }

    async fn probe_fqdn(&self, fqdn: &str) -> DomainStatus {
        let registry = self.registry_signal(fqdn).await;

        let dns = match (&registry, &self.dns) {
            (RegistrySignal::Inconclusive, Some(dns)) => Some(dns.resolve_any(fqdn).await),
            _ => None,
        };

        let status = verdict(registry, dns);
        tracing::debug!(fqdn = %fqdn, status = %status, "Domain probe completed");
        status
    }

    async fn registry_signal(&self, fqdn: &str) -> RegistrySignal {
        let base = self.bootstrap.base_url_for(fqdn).await;
        let url = format!("{base}/domain/{fqdn}");

        let request = self
            .client
            .get(&url)
            .header(
                "accept",
                "application/rdap+json, application/json;q=0.9, */*;q=0.8",
            )
            .send();

        let response = match timeout(RDAP_TIMEOUT, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::debug!(fqdn = %fqdn, error = %e, "RDAP request failed");
                return RegistrySignal::Inconclusive;
            }
            Err(_) => {
                tracing::debug!(fqdn = %fqdn, "RDAP request timed out");
                return RegistrySignal::Inconclusive;
            }
        };

        if response.status().as_u16() == 404 {
            return RegistrySignal::NotFound;
        }
        if !response.status().is_success() {
            return RegistrySignal::Inconclusive;
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.contains("json") {
            return RegistrySignal::Inconclusive;
        }

        match timeout(RDAP_TIMEOUT, response.json::<RdapDomain>()).await {
            Ok(Ok(doc)) => classify_rdap(&doc),
            _ => RegistrySignal::Inconclusive,
        }
    }
}

#[async_trait]
impl DomainProber for AvailabilityProber {
    async fn probe(&self, base_label: &str) -> DomainReport {
        if base_label.is_empty() {
            return DomainReport::default();
        }

        let fqdns: Vec<String> = self
            .tlds
            .iter()
            .map(|tld| format!("{base_label}.{tld}"))
            .collect();

        // All TLD lookups run concurrently; there is no ordering guarantee
        // between them and any subset may fail independently.
        let statuses = join_all(fqdns.iter().map(|fqdn| self.probe_fqdn(fqdn))).await;

        let domains: Vec<DomainCheck> = fqdns
            .into_iter()
            .zip(statuses)
            .map(|(fqdn, status)| DomainCheck { fqdn, status })
            .collect();

        let available_domains = domains
            .iter()
            .filter(|check| check.status == DomainStatus::LikelyAvailable)
            .map(|check| check.fqdn.clone())
            .collect();

        DomainReport {
            domains,
            available_domains,
        }
    }
}

/// Fold the tiered signals into one verdict.
pub fn verdict(registry: RegistrySignal, dns: Option<DnsSignal>) -> DomainStatus {
    match registry {
        RegistrySignal::Registered => DomainStatus::Taken,
        RegistrySignal::NotFound => DomainStatus::LikelyAvailable,
        RegistrySignal::Inconclusive => match dns {
            Some(DnsSignal::Resolved) => DomainStatus::Taken,
            // No resolution, timeout, failure, or no fallback configured:
            // absence of DNS is not proof of an unregistered domain.
            _ => DomainStatus::Unknown,
        },
    }
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(rename = "errorCode")]
    error_code: Option<u16>,
    #[serde(rename = "ldhName")]
    ldh_name: Option<String>,
    handle: Option<String>,
    #[serde(rename = "objectClassName")]
    object_class_name: Option<String>,
}

fn classify_rdap(doc: &RdapDomain) -> RegistrySignal {
    if doc.error_code == Some(404) {
        return RegistrySignal::NotFound;
    }

    let has_ldh = doc.ldh_name.as_deref().is_some_and(|s| !s.is_empty());
    let has_handle = doc.handle.as_deref().is_some_and(|s| !s.is_empty());
    let is_domain_object = doc.object_class_name.as_deref() == Some("domain");

    if has_ldh || has_handle || is_domain_object {
        RegistrySignal::Registered
    } else {
        RegistrySignal::Inconclusive
    }
}

/// Slugify a brand name into a domain base label: lowercased, ampersands
/// spelled out, non-alphanumerics stripped, whitespace turned into single
/// hyphens, hyphen runs collapsed.
pub fn to_domain_label(name: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static HYPHENS: OnceLock<Regex> = OnceLock::new();

    let strip = STRIP.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("valid pattern"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("valid pattern"));
    let hyphens = HYPHENS.get_or_init(|| Regex::new(r"-+").expect("valid pattern"));

    let lowered = name.to_lowercase().replace('&', "and");
    let stripped = strip.replace_all(&lowered, "");
    let hyphenated = spaces.replace_all(stripped.trim(), "-");
    let collapsed = hyphens.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_domain_label() {
        assert_eq!(to_domain_label("FinFlow"), "finflow");
        assert_eq!(to_domain_label("Fin Flow"), "fin-flow");
        assert_eq!(to_domain_label("Craft & Co"), "craft-and-co");
        assert_eq!(to_domain_label("  Spaced   Out  "), "spaced-out");
        assert_eq!(to_domain_label("Él Niño!"), "l-nio");
        assert_eq!(to_domain_label("a--b — c"), "a-b-c");
        assert_eq!(to_domain_label("!!!"), "");
    }

    #[test]
    fn test_verdict_registry_is_definitive() {
        assert_eq!(
            verdict(RegistrySignal::Registered, None),
            DomainStatus::Taken
        );
        assert_eq!(
            verdict(RegistrySignal::NotFound, None),
            DomainStatus::LikelyAvailable
        );
        // A definitive registry answer never consults DNS, but even if a
        // signal were present it would not change the verdict.
        assert_eq!(
            verdict(RegistrySignal::Registered, Some(DnsSignal::NoRecords)),
            DomainStatus::Taken
        );
    }

    #[test]
    fn test_verdict_dns_record_means_taken() {
        assert_eq!(
            verdict(RegistrySignal::Inconclusive, Some(DnsSignal::Resolved)),
            DomainStatus::Taken
        );
    }

    #[test]
    fn test_verdict_never_upgrades_absence_to_available() {
        for dns in [
            Some(DnsSignal::NoRecords),
            Some(DnsSignal::TimedOut),
            Some(DnsSignal::Failed),
            None,
        ] {
            assert_eq!(
                verdict(RegistrySignal::Inconclusive, dns),
                DomainStatus::Unknown
            );
        }
    }

    #[test]
    fn test_classify_rdap() {
        let not_found = RdapDomain {
            error_code: Some(404),
            ldh_name: None,
            handle: None,
            object_class_name: None,
        };
        assert_eq!(classify_rdap(&not_found), RegistrySignal::NotFound);

        let registered = RdapDomain {
            error_code: None,
            ldh_name: Some("EXAMPLE.COM".to_string()),
            handle: None,
            object_class_name: None,
        };
        assert_eq!(classify_rdap(&registered), RegistrySignal::Registered);

        let by_object_class = RdapDomain {
            error_code: None,
            ldh_name: None,
            handle: None,
            object_class_name: Some("domain".to_string()),
        };
        assert_eq!(classify_rdap(&by_object_class), RegistrySignal::Registered);

        let inconclusive = RdapDomain {
            error_code: None,
            ldh_name: Some(String::new()),
            handle: None,
            object_class_name: Some("nameserver".to_string()),
        };
        assert_eq!(classify_rdap(&inconclusive), RegistrySignal::Inconclusive);
    }

    #[test]
    fn test_prober_without_dns_is_buildable() {
        let prober = AvailabilityProber::new(vec!["com".to_string(), "ai".to_string()]);
        assert!(prober.is_ok());
    }
}
