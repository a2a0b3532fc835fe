use crate::circuit_breaker::RegistryCircuitBreaker;
use crate::config::Config;
use crate::crm_client::{CrmLeadPayload, CrmWebhookClient};
use crate::errors::AppError;
use crate::models::*;
use crate::scoring::{self, LeadSignals};
use crate::services::{EmailFinderService, RegistryService};
use crate::website::{normalize_domain, ValidationCache, WebsiteProber};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the outbound CRM webhook (optional).
    pub crm_client: Option<CrmWebhookClient>,
    /// Circuit breaker shared by all registry calls.
    pub registry_breaker: RegistryCircuitBreaker,
    /// Issues website probes.
    pub website_prober: Arc<WebsiteProber>,
    /// Website validations keyed by normalized domain, session lifetime.
    pub website_cache: ValidationCache,
    /// Registry records keyed by orgnr, sealed JSON entries.
    pub company_cache: Cache<String, String>,
    /// News snippets keyed by lowercased company name, sealed JSON entries.
    pub search_cache: Cache<String, String>,
    /// Discovered emails keyed by domain, sealed JSON entries.
    pub email_cache: Cache<String, String>,
    /// Generated pitches keyed by orgnr, sealed JSON entries.
    pub pitch_cache: Cache<String, String>,
    /// Last enrichment time per orgnr, drives freshness scoring.
    pub enrichment_times: Cache<String, DateTime<Utc>>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-insights-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/companies/search
///
/// Searchbox backend: a 9-digit query is treated as an organisation number
/// and looked up directly; anything else runs a registry name search.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Query parameters with the free-text query.
///
/// # Returns
///
/// * `Result<Json<Vec<SearchHit>>, AppError>` - Matching companies as label/orgnr pairs.
pub async fn search_companies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    let query = params.q.trim();
    tracing::info!("GET /companies/search - q: '{}'", query);

    if query.len() < 2 {
        return Ok(Json(Vec::new()));
    }

    let registry = RegistryService::new(&state.config, state.registry_breaker.clone());

    // Direct orgnr lookup
    if crate::enrichment::is_valid_orgnr(query) {
        return match crate::enrichment::cached_company(&state, &registry, query).await {
            Ok(company) => Ok(Json(vec![SearchHit {
                label: format!("{}  ·  {}", company.name, company.organization_number),
                organization_number: company.organization_number,
            }])),
            Err(AppError::NotFound(_)) => Ok(Json(Vec::new())),
            Err(e) => Err(e),
        };
    }

    // Name search
    let companies = registry.search_by_name(query).await?;
    let hits = companies
        .into_iter()
        .map(|company| {
            let city = company
                .registered_address
                .as_ref()
                .and_then(|a| a.city.clone())
                .unwrap_or_default();
            SearchHit {
                label: format!(
                    "{}  ·  {}  ·  {} ansatte  ·  {}",
                    company.name,
                    city,
                    company.employees(),
                    company.organization_number
                ),
                organization_number: company.organization_number,
            }
        })
        .collect();

    Ok(Json(hits))
}

/// GET /api/v1/companies/:orgnr
///
/// Retrieves a company's raw registry record.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `orgnr` - The organisation number.
///
/// # Returns
///
/// * `Result<Json<CompanyRecord>, AppError>` - The registry record or an error.
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(orgnr): Path<String>,
) -> Result<Json<CompanyRecord>, AppError> {
    tracing::info!("GET /companies/{}", orgnr);

    let registry = RegistryService::new(&state.config, state.registry_breaker.clone());
    let company = crate::enrichment::cached_company(&state, &registry, &orgnr).await?;

    Ok(Json(company))
}

/// POST /api/v1/analyze
///
/// Runs the complete analysis workflow: registry lookup, candidate
/// discovery, website validation, enrichment, pitch and scoring.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - JSON body naming the focal company.
///
/// # Returns
///
/// * `Result<Json<AnalysisResponse>, AppError>` - The full analysis or an error.
pub async fn analyze_company(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    tracing::info!("POST /analyze - orgnr: {}", payload.orgnr);

    if !crate::enrichment::is_valid_orgnr(&payload.orgnr) {
        return Err(AppError::BadRequest(format!(
            "Invalid organisation number: {}",
            payload.orgnr
        )));
    }

    let analysis = crate::enrichment::analyze_company(&state, &payload.orgnr).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/score
///
/// Pure scoring endpoint: replays the scoring engine on explicit inputs
/// without touching any upstream API. Cannot fail for missing fields.
///
/// # Arguments
///
/// * `payload` - Candidate, reference and upstream signals.
///
/// # Returns
///
/// * `Json<crate::scoring::ScoreResult>` - The scoring result.
pub async fn score_lead(Json(payload): Json<ScoreRequest>) -> Json<crate::scoring::ScoreResult> {
    tracing::info!(
        "POST /score - candidate: {}",
        payload.candidate.organization_number
    );

    let signals = LeadSignals {
        website: payload.website.as_ref(),
        emails: &payload.emails,
        enrichment_age_hours: payload.enrichment_age_hours,
    };
    let result = scoring::score_candidate(&payload.candidate, &payload.reference, &signals);

    Json(result)
}

/// POST /api/v1/leads/forward
///
/// Forwards a qualified lead to the configured CRM webhook. The payload is
/// built from session caches where possible (registry record, website
/// validation, discovered emails, last generated pitch) and re-scored at
/// forward time.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - JSON body naming the lead and an optional seller note.
///
/// # Returns
///
/// * `Result<Json<ForwardLeadResponse>, AppError>` - Forward confirmation or an error.
pub async fn forward_lead(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForwardLeadRequest>,
) -> Result<Json<ForwardLeadResponse>, AppError> {
    tracing::info!("POST /leads/forward - orgnr: {}", payload.orgnr);

    let crm_client = state
        .crm_client
        .as_ref()
        .ok_or_else(|| AppError::InternalError("CRM webhook not configured".to_string()))?;

    if !crate::enrichment::is_valid_orgnr(&payload.orgnr) {
        return Err(AppError::BadRequest(format!(
            "Invalid organisation number: {}",
            payload.orgnr
        )));
    }

    let registry = RegistryService::new(&state.config, state.registry_breaker.clone());
    let company = crate::enrichment::cached_company(&state, &registry, &payload.orgnr).await?;

    let website = match company.website.as_deref() {
        Some(url) => {
            state
                .website_cache
                .get_or_probe(&state.website_prober, url)
                .await
        }
        None => None,
    };

    let email_service = EmailFinderService::new(&state.config);
    let emails = match company.website.as_deref().and_then(normalize_domain) {
        Some(domain) => {
            crate::enrichment::cached_emails(&state, &email_service, &domain)
                .await
                .unwrap_or_default()
        }
        None => Vec::new(),
    };

    // Standalone score: relative bonuses need a full analysis, the forward
    // payload only carries the company's own signals.
    let now = Utc::now();
    let age = crate::enrichment::enrichment_age_hours(
        state.enrichment_times.get(&payload.orgnr).await,
        now,
    );
    let signals = LeadSignals {
        website: website.as_ref(),
        emails: &emails,
        enrichment_age_hours: age,
    };
    let score = scoring::score_focal(&company, &[], &signals);

    let pitch = match state.pitch_cache.get(&payload.orgnr).await {
        Some(sealed) => crate::cache_validator::SealedCacheEntry::open::<String>(&sealed),
        None => None,
    };

    let address = company
        .registered_address
        .as_ref()
        .map(|a| a.display())
        .unwrap_or_else(|| "Ingen adresse registrert".to_string());

    let crm_payload = CrmLeadPayload {
        organization_number: company.organization_number.clone(),
        company_name: company.name.clone(),
        industry: company.industry.as_ref().and_then(|i| i.description.clone()),
        address,
        website: company.website.clone(),
        emails,
        score,
        pitch,
        note: payload.note,
        source: "lead-insights-api".to_string(),
        forwarded_at: now.to_rfc3339(),
    };

    crm_client.forward_lead(&crm_payload).await?;

    Ok(Json(ForwardLeadResponse {
        success: true,
        message: format!("Lead {} forwarded to CRM", payload.orgnr),
    }))
}
