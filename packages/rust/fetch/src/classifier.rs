//! URL validation and fetch-strategy classification.
//!
//! Classification is a pure function of the URL, the configured government
//! domains and the capability snapshot; it performs no I/O.

use std::net::IpAddr;

use tracing::debug;
use url::{Host, Url};

use webacquire_shared::{
    AcquireError, AppConfig, DomainPatterns, FetchMethod, Result, is_pdf_url,
};

use crate::capabilities::Capabilities;

/// Maps URLs to the fetch strategy best suited for them.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    government: DomainPatterns,
    primary_engine: FetchMethod,
    block_private_hosts: bool,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self {
            government: DomainPatterns::default(),
            primary_engine: FetchMethod::DynamicA,
            block_private_hosts: true,
        }
    }
}

impl UrlClassifier {
    /// Build a classifier from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            government: config.domains.government_patterns()?,
            primary_engine: config.browser.primary,
            block_private_hosts: config.http.block_private_hosts,
        })
    }

    /// Allow loopback/private targets (mock servers in tests, intranet deployments).
    pub fn allow_private_hosts(mut self) -> Self {
        self.block_private_hosts = false;
        self
    }

    /// Government host patterns in use.
    pub fn government(&self) -> &DomainPatterns {
        &self.government
    }

    /// Whether the URL belongs to a known government source.
    pub fn is_government(&self, url: &Url) -> bool {
        self.government.matches_url(url)
    }

    /// Check that `raw` is an absolute http(s) URL with a host we are allowed to reach.
    pub fn validate(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim())
            .map_err(|e| AcquireError::invalid_url(format!("{raw}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AcquireError::invalid_url(format!(
                    "{raw}: unsupported scheme '{other}'"
                )));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(AcquireError::invalid_url(format!("{raw}: missing host")));
        }

        if self.block_private_hosts && is_private_target(&url) {
            return Err(AcquireError::invalid_url(format!(
                "{raw}: private or loopback hosts are not allowed"
            )));
        }

        Ok(url)
    }

    /// Validate and classify a raw URL.
    pub fn classify(&self, raw: &str, caps: &Capabilities) -> Result<FetchMethod> {
        let url = self.validate(raw)?;
        Ok(self.classify_url(&url, caps))
    }

    /// Classify an already validated URL. First matching rule wins:
    /// PDF pattern, then government host, then static.
    pub fn classify_url(&self, url: &Url, caps: &Capabilities) -> FetchMethod {
        let method = if is_pdf_url(url.as_str()) {
            FetchMethod::Pdf
        } else if self.is_government(url) {
            self.best_dynamic(caps)
        } else {
            FetchMethod::Static
        };
        debug!(%url, %method, "classified");
        method
    }

    /// Preferred headless engine if present, else the other one, else static.
    pub fn best_dynamic(&self, caps: &Capabilities) -> FetchMethod {
        let primary = self.primary_engine;
        let secondary = primary.alternate_engine().unwrap_or(FetchMethod::DynamicB);
        [primary, secondary]
            .into_iter()
            .find(|m| caps.is_available(*m))
            .unwrap_or(FetchMethod::Static)
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets loopback, private or otherwise internal hosts.
fn is_private_target(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(host)) => {
            let host = host.to_ascii_lowercase();
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d reaches the IPv4 host a.b.c.d
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}
