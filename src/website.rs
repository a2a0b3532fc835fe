//! Website reachability probing.
//!
//! Registry website fields are free text: schemes, `www.` prefixes, paths
//! and plain garbage all occur. Probing normalizes the value to a bare
//! domain, issues one GET and classifies the outcome. Results are memoized
//! per normalized domain for the lifetime of the process; entries carry an
//! integrity checksum and fall back to a fresh probe when corrupted.

use crate::cache_validator::SealedCacheEntry;
use crate::errors::AppError;
use crate::models::{WebsiteStatus, WebsiteValidation};
use moka::future::Cache;
use std::time::Duration;

/// Normalizes a registry website value to a bare lowercase domain.
///
/// Strips scheme, `www.` prefix and any path/query, exactly the cleaning the
/// email-discovery API expects for its `domain` parameter. Returns `None`
/// for values that cannot name a host (empty, whitespace, no dot), in which
/// case the company simply has no trusted website source.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        return None;
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(&trimmed);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    let host = without_www.split('/').next().unwrap_or_default();

    if host.is_empty() || !host.contains('.') || host.contains(char::is_whitespace) {
        return None;
    }
    Some(host.to_string())
}

/// Classifies a completed probe response.
///
/// Comparison is host-level: a 2xx answer on the requested host is Active
/// even if the path changed, while landing on another host is Redirected.
fn classify_response(requested_domain: &str, final_url: &reqwest::Url, status: u16) -> WebsiteStatus {
    if !(200..300).contains(&status) {
        return WebsiteStatus::Inactive;
    }

    let requested_host = requested_domain.split(':').next().unwrap_or(requested_domain);
    let final_host = final_url
        .host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h))
        .unwrap_or_default();

    if final_host.eq_ignore_ascii_case(requested_host) {
        WebsiteStatus::Active
    } else {
        WebsiteStatus::Redirected
    }
}

/// Issues website probes.
pub struct WebsiteProber {
    client: reqwest::Client,
}

impl WebsiteProber {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create website probe client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Probes a website and classifies the outcome. Never fails: transport
    /// errors classify as `Error`, non-success responses as `Inactive`.
    pub async fn probe(&self, raw_url: &str, domain: &str) -> WebsiteValidation {
        // Registry entries rarely carry a scheme; default to https and keep
        // an explicit http:// prefix when the registry had one.
        let scheme = if raw_url.trim_start().starts_with("http://") {
            "http"
        } else {
            "https"
        };
        let target = format!("{}://{}/", scheme, domain);

        match self.client.get(&target).send().await {
            Ok(response) => {
                let http_status = response.status().as_u16();
                let final_url = response.url().clone();
                let status = classify_response(domain, &final_url, http_status);
                tracing::debug!("Probed {} -> {:?} ({})", target, status, http_status);
                WebsiteValidation {
                    status,
                    final_url: Some(final_url.to_string()),
                    http_status: Some(http_status),
                }
            }
            Err(e) => {
                tracing::debug!("Probe of {} failed: {}", target, e);
                WebsiteValidation {
                    status: WebsiteStatus::Error,
                    final_url: None,
                    http_status: None,
                }
            }
        }
    }
}

/// Session-scoped website-validation cache, keyed by normalized domain.
///
/// Passed explicitly into the analysis workflow instead of living in global
/// state; entries never expire within a session.
#[derive(Clone)]
pub struct ValidationCache {
    entries: Cache<String, String>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().max_capacity(10_000).build(),
        }
    }

    /// Returns the cached validation for a raw website value, probing on a
    /// miss. `None` means the value cannot name a host and no validation
    /// record exists at all.
    pub async fn get_or_probe(
        &self,
        prober: &WebsiteProber,
        raw_url: &str,
    ) -> Option<WebsiteValidation> {
        let domain = normalize_domain(raw_url)?;

        if let Some(sealed) = self.entries.get(&domain).await {
            if let Some(validation) = SealedCacheEntry::open::<WebsiteValidation>(&sealed) {
                tracing::debug!("Website validation cache HIT for {}", domain);
                return Some(validation);
            }
            tracing::warn!(
                "Website cache entry for {} failed validation, reprobing",
                domain
            );
        }

        let validation = prober.probe(raw_url, &domain).await;
        if let Some(sealed) = SealedCacheEntry::seal(&validation) {
            self.entries.insert(domain, sealed).await;
        }
        Some(validation)
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::new()
    }
}
