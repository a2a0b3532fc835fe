/// Shared analysis logic for the lead endpoints
///
/// This module provides the reusable analysis workflow:
/// 1. Fetch the focal company from the registry (session-cached)
/// 2. Discover candidate leads in the same industry segment
/// 3. Validate websites (focal + candidates) through the session cache
/// 4. Fetch news snippets and email contacts concurrently
/// 5. Generate the sales pitch
/// 6. Score the focal company and every candidate
use crate::cache_validator::SealedCacheEntry;
use crate::errors::{AppError, ResultExt};
use crate::handlers::AppState;
use crate::models::{
    AnalysisMetadata, AnalysisResponse, CompanyRecord, ScoredLead, Sourced, WebsiteValidation,
};
use crate::scoring::{self, LeadSignals};
use crate::services::{EmailFinderService, NewsSearchService, PitchService, RegistryService};
use crate::website::normalize_domain;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::Arc;

/// Organisation numbers are exactly nine ASCII digits.
pub fn is_valid_orgnr(value: &str) -> bool {
    value.len() == 9 && value.chars().all(|c| c.is_ascii_digit())
}

/// Validate email address shape
///
/// Discovery APIs occasionally return scraped garbage; anything that does
/// not look like `local@domain.tld` is dropped before it reaches scoring.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified email regex
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::warn!("Dropping malformed email from discovery result: {}", email);
        return false;
    }

    true
}

/// Hours elapsed since a recorded enrichment, if one exists.
pub fn enrichment_age_hours(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<f64> {
    last.map(|t| (now - t).num_seconds().max(0) as f64 / 3600.0)
}

/// Fetch a company via the session cache, falling back to the registry.
pub async fn cached_company(
    state: &Arc<AppState>,
    registry: &RegistryService,
    orgnr: &str,
) -> Result<CompanyRecord, AppError> {
    if let Some(sealed) = state.company_cache.get(orgnr).await {
        if let Some(company) = SealedCacheEntry::open::<CompanyRecord>(&sealed) {
            tracing::debug!("Registry cache HIT for {}", orgnr);
            return Ok(company);
        }
        tracing::warn!("Registry cache entry for {} failed validation, refetching", orgnr);
    }

    let company = registry.get_company(orgnr).await?;
    if let Some(sealed) = SealedCacheEntry::seal(&company) {
        state.company_cache.insert(orgnr.to_string(), sealed).await;
    }
    Ok(company)
}

/// Fetch news snippets via the session cache.
async fn cached_news(
    state: &Arc<AppState>,
    service: &NewsSearchService,
    company_name: &str,
) -> Result<String, AppError> {
    let key = company_name.to_lowercase();
    if let Some(sealed) = state.search_cache.get(&key).await {
        if let Some(insight) = SealedCacheEntry::open::<String>(&sealed) {
            tracing::debug!("News cache HIT for '{}'", company_name);
            return Ok(insight);
        }
    }

    let insight = service.find_news(company_name).await?;
    if let Some(sealed) = SealedCacheEntry::seal(&insight) {
        state.search_cache.insert(key, sealed).await;
    }
    Ok(insight)
}

/// Fetch email contacts for a domain via the session cache. Discovery
/// results are shape-filtered before caching.
pub async fn cached_emails(
    state: &Arc<AppState>,
    service: &EmailFinderService,
    domain: &str,
) -> Result<Vec<String>, AppError> {
    if let Some(sealed) = state.email_cache.get(domain).await {
        if let Some(emails) = SealedCacheEntry::open::<Vec<String>>(&sealed) {
            tracing::debug!("Email cache HIT for {}", domain);
            return Ok(emails);
        }
    }

    let emails: Vec<String> = service
        .domain_search(domain)
        .await?
        .into_iter()
        .filter(|e| is_valid_email(e))
        .collect();
    if let Some(sealed) = SealedCacheEntry::seal(&emails) {
        state.email_cache.insert(domain.to_string(), sealed).await;
    }
    Ok(emails)
}

fn to_sourced<T>(result: Result<T, AppError>) -> Sourced<T> {
    match result {
        Ok(value) => Sourced::available(value),
        Err(e) => Sourced::unavailable(e.to_string()),
    }
}

/// Complete analysis workflow for a focal company
///
/// Registry data is required; everything else (news, emails, pitch) is
/// best-effort and arrives as an explicit available/unavailable outcome.
/// Scoring itself cannot fail.
pub async fn analyze_company(
    state: &Arc<AppState>,
    orgnr: &str,
) -> Result<AnalysisResponse, AppError> {
    let registry = RegistryService::new(&state.config, state.registry_breaker.clone());

    tracing::info!("Starting analysis for orgnr: {}", orgnr);

    // Step 1: Focal company from the registry
    tracing::info!("Step 1: Fetching focal company");
    let focal = cached_company(state, &registry, orgnr)
        .await
        .context("Failed to fetch focal company")?;

    // Step 2: Candidate discovery in the same industry segment
    tracing::info!("Step 2: Discovering candidate leads");
    let (candidates, widened_search) = registry
        .find_peers(&focal)
        .await
        .context("Candidate discovery failed")?;

    // Step 3: Website validation through the session cache
    tracing::info!(
        "Step 3: Validating websites (focal + {} candidates)",
        candidates.len()
    );
    let focal_site = match focal.website.as_deref() {
        Some(url) => state.website_cache.get_or_probe(&state.website_prober, url).await,
        None => None,
    };
    let mut candidate_sites: Vec<Option<WebsiteValidation>> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let site = match candidate.website.as_deref() {
            Some(url) => state.website_cache.get_or_probe(&state.website_prober, url).await,
            None => None,
        };
        candidate_sites.push(site);
    }

    // Step 4: News snippets and email contacts, fetched concurrently
    tracing::info!("Step 4: Fetching news snippets and email contacts");
    let news_service = NewsSearchService::new(&state.config);
    let email_service = EmailFinderService::new(&state.config);
    let domain = focal.website.as_deref().and_then(normalize_domain);

    let (news, emails) = tokio::join!(
        cached_news(state, &news_service, &focal.name),
        async {
            match domain.as_deref() {
                Some(d) => cached_emails(state, &email_service, d).await,
                None => Err(AppError::ExternalApiError(
                    "No trusted website source for email discovery".to_string(),
                )),
            }
        }
    );
    let news = to_sourced(news);
    let emails = to_sourced(emails);

    // Step 5: Pitch generation
    tracing::info!("Step 5: Generating pitch");
    let pitch_service = PitchService::new(&state.config);
    let industry_description = focal
        .industry
        .as_ref()
        .and_then(|i| i.description.clone())
        .unwrap_or_else(|| "Ukjent".to_string());
    let insight = news.value().cloned().unwrap_or_default();
    let pitch = to_sourced(
        pitch_service
            .generate_pitch(&focal.name, &industry_description, &insight)
            .await,
    );
    if let Sourced::Available { value } = &pitch {
        if let Some(sealed) = SealedCacheEntry::seal(value) {
            state.pitch_cache.insert(orgnr.to_string(), sealed).await;
        }
    }

    // Step 6: Scoring
    tracing::info!("Step 6: Scoring focal company and {} candidate(s)", candidates.len());
    let now = Utc::now();
    let email_list = emails.value_or_default();
    let focal_age = enrichment_age_hours(state.enrichment_times.get(orgnr).await, now);
    let focal_signals = LeadSignals {
        website: focal_site.as_ref(),
        emails: &email_list,
        enrichment_age_hours: focal_age,
    };
    let focal_score = scoring::score_focal(&focal, &candidates, &focal_signals);

    let mut leads: Vec<ScoredLead> = Vec::with_capacity(candidates.len());
    for (candidate, site) in candidates.iter().zip(candidate_sites) {
        // Candidates carry no email set: discovery only runs for the focal
        // company's trusted domain.
        let age = enrichment_age_hours(
            state
                .enrichment_times
                .get(&candidate.organization_number)
                .await,
            now,
        );
        let signals = LeadSignals {
            website: site.as_ref(),
            emails: &[],
            enrichment_age_hours: age,
        };
        let score = scoring::score_candidate(candidate, &focal, &signals);
        leads.push(ScoredLead {
            company: candidate.clone(),
            website: site,
            score,
        });
    }

    // Step 7: Record the enrichment timestamp for freshness scoring
    state.enrichment_times.insert(orgnr.to_string(), now).await;

    let mut sources = vec!["brreg".to_string()];
    if news.is_available() {
        sources.push("news_search".to_string());
    }
    if emails.is_available() {
        sources.push("hunter".to_string());
    }
    if pitch.is_available() {
        sources.push("openai".to_string());
    }

    let address = focal
        .registered_address
        .as_ref()
        .map(|a| a.display())
        .unwrap_or_else(|| "Ingen adresse registrert".to_string());

    tracing::info!(
        "Analysis complete for {}: health {} with {} candidate(s)",
        orgnr,
        focal_score.health_score,
        leads.len()
    );

    Ok(AnalysisResponse {
        company: focal,
        address,
        website: focal_site,
        emails,
        pitch,
        score: focal_score,
        leads,
        metadata: AnalysisMetadata {
            sources,
            timestamp: now.to_rfc3339(),
            enrichment_age_hours: focal_age,
            widened_search,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_orgnr() {
        assert!(is_valid_orgnr("912345678"));
        assert!(!is_valid_orgnr("91234567"));
        assert!(!is_valid_orgnr("9123456789"));
        assert!(!is_valid_orgnr("91234567a"));
        assert!(!is_valid_orgnr(""));
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("post@eksempel.no"));
        assert!(is_valid_email("ola.nordmann@eksempel.no"));
        assert!(is_valid_email("salg+nord@eksempel-gruppen.no"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("posteksempel.no"));
        assert!(!is_valid_email("post@eksempelno"));
        assert!(!is_valid_email("@eksempel.no"));
        assert!(!is_valid_email("post@"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("post @eksempel.no"));
    }

    #[test]
    fn test_enrichment_age() {
        let now = Utc::now();
        assert_eq!(enrichment_age_hours(None, now), None);

        let six_hours_ago = now - chrono::Duration::hours(6);
        let age = enrichment_age_hours(Some(six_hours_ago), now).unwrap();
        assert!((age - 6.0).abs() < 0.01);

        // A clock that moved backwards must not produce a negative age.
        let future = now + chrono::Duration::hours(1);
        let age = enrichment_age_hours(Some(future), now).unwrap();
        assert_eq!(age, 0.0);
    }
}
