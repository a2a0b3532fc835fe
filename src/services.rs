use crate::circuit_breaker::{self, RegistryCircuitBreaker};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CompanyRecord, CompanySearchResponse};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Minimum peer count before candidate discovery widens beyond the focal
/// company's municipality.
const MIN_LOCAL_PEERS: usize = 10;

// ============ Brønnøysund Registry Integration ============

/// Client for the Enhetsregisteret open API.
///
/// All calls go through the shared registry circuit breaker: when the
/// registry is down the analyze flow fails fast instead of stacking a
/// timeout per lookup.
pub struct RegistryService {
    client: Client,
    base_url: String,
    breaker: RegistryCircuitBreaker,
}

impl RegistryService {
    pub fn new(config: &Config, breaker: RegistryCircuitBreaker) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            base_url: config.brreg_base_url.clone(),
            breaker,
        }
    }

    /// Issues one GET against the registry, feeding the outcome through the
    /// circuit breaker. Transport errors and 5xx responses count as
    /// failures; any answered request (including 404) counts as success.
    async fn send(&self, url: reqwest::Url) -> Result<reqwest::Response, AppError> {
        if circuit_breaker::is_open(&self.breaker) {
            return Err(AppError::ExternalApiError(
                "Registry temporarily unavailable (circuit open)".to_string(),
            ));
        }

        let result = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Registry request failed: {}", e)));

        match &result {
            Ok(response) if response.status().is_server_error() => {
                let _ = circuit_breaker::record_outcome::<()>(
                    &self.breaker,
                    Err(AppError::ExternalApiError(format!(
                        "Registry returned {}",
                        response.status()
                    ))),
                );
            }
            Ok(_) => {
                let _ = circuit_breaker::record_outcome(&self.breaker, Ok(()));
            }
            Err(e) => {
                let _ = circuit_breaker::record_outcome::<()>(&self.breaker, Err(e.clone()));
            }
        }

        result
    }

    /// Fetch a single company by organisation number.
    pub async fn get_company(&self, orgnr: &str) -> Result<CompanyRecord, AppError> {
        if !crate::enrichment::is_valid_orgnr(orgnr) {
            return Err(AppError::BadRequest(format!(
                "Invalid organisation number: {}",
                orgnr
            )));
        }

        let url = reqwest::Url::parse(&format!("{}/enheter/{}", self.base_url, orgnr))
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Fetching registry record for orgnr: {}", orgnr);
        let response = self.send(url).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Company {} not found in the registry",
                orgnr
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Registry returned status {}: {}",
                status, error_text
            )));
        }

        let company: CompanyRecord = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse registry response: {}", e))
        })?;

        tracing::info!("Registry record fetched: {}", company.name);
        Ok(company)
    }

    /// Search companies by name, registry-style prefix matching.
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<CompanyRecord>, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/enheter", self.base_url),
            &[("navn", name), ("size", "8")],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Registry name search: {}", name);
        let response = self.send(url).await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApiError(format!(
                "Registry search returned status {}",
                status
            )));
        }

        let result: CompanySearchResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse registry search response: {}", e))
        })?;

        let companies = result.into_companies();
        tracing::info!("Registry search found {} matches for '{}'", companies.len(), name);
        Ok(companies)
    }

    /// Discover candidate leads in the focal company's industry segment.
    ///
    /// Prefers the focal municipality and widens to the whole country when
    /// the local result set is smaller than `MIN_LOCAL_PEERS`, de-duplicating
    /// by organisation number with local results first. The focal company is
    /// always excluded. Returns the leads and whether the search widened.
    pub async fn find_peers(
        &self,
        focal: &CompanyRecord,
    ) -> Result<(Vec<CompanyRecord>, bool), AppError> {
        let Some(industry_code) = focal.industry_code() else {
            tracing::info!(
                "Company {} has no industry code, skipping peer discovery",
                focal.organization_number
            );
            return Ok((Vec::new(), false));
        };

        let mut params: Vec<(&str, String)> = vec![
            ("naeringskode", industry_code.to_string()),
            ("sort", "antallAnsatte,desc".to_string()),
            ("fraAntallAnsatte", "5".to_string()),
            ("size", "50".to_string()),
        ];
        let municipality = focal.municipality_code().map(str::to_string);
        if let Some(ref kommune) = municipality {
            params.push(("kommunenummer", kommune.clone()));
        }

        let mut leads = self.peer_query(&params, &focal.organization_number).await?;

        // Too few local hits: widen to the whole country and append.
        let mut widened = false;
        if leads.len() < MIN_LOCAL_PEERS && municipality.is_some() {
            tracing::info!(
                "Only {} local peers, widening search nationwide",
                leads.len()
            );
            widened = true;
            params.retain(|(key, _)| *key != "kommunenummer");
            let nationwide = self.peer_query(&params, &focal.organization_number).await?;

            let existing: std::collections::HashSet<String> = leads
                .iter()
                .map(|c| c.organization_number.clone())
                .collect();
            for company in nationwide {
                if !existing.contains(&company.organization_number) {
                    leads.push(company);
                }
            }
        }

        tracing::info!(
            "Peer discovery found {} candidate(s) for {}",
            leads.len(),
            focal.organization_number
        );
        Ok((leads, widened))
    }

    async fn peer_query(
        &self,
        params: &[(&str, String)],
        exclude_orgnr: &str,
    ) -> Result<Vec<CompanyRecord>, AppError> {
        let url = reqwest::Url::parse_with_params(&format!("{}/enheter", self.base_url), params)
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        let response = self.send(url).await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApiError(format!(
                "Registry peer search returned status {}",
                status
            )));
        }

        let result: CompanySearchResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse registry search response: {}", e))
        })?;

        Ok(result
            .into_companies()
            .into_iter()
            .filter(|c| c.organization_number != exclude_orgnr)
            .collect())
    }
}

// ============ Email Discovery (Hunter) Integration ============

#[derive(Debug, Clone, Deserialize)]
struct HunterResponse {
    #[serde(default)]
    data: Option<HunterData>,
}

#[derive(Debug, Clone, Deserialize)]
struct HunterData {
    #[serde(default)]
    emails: Vec<HunterEmail>,
}

#[derive(Debug, Clone, Deserialize)]
struct HunterEmail {
    value: String,
}

/// Client for a Hunter-compatible domain-search API.
pub struct EmailFinderService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl EmailFinderService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.hunter_base_url.clone(),
            api_key: config.hunter_api_key.clone(),
        }
    }

    /// Discover email addresses registered for a domain (up to 5).
    pub async fn domain_search(&self, domain: &str) -> Result<Vec<String>, AppError> {
        let Some(ref api_key) = self.api_key else {
            return Err(AppError::ExternalApiError(
                "HUNTER_API_KEY not configured".to_string(),
            ));
        };

        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v2/domain-search", self.base_url),
            &[
                ("domain", domain),
                ("api_key", api_key.as_str()),
                ("limit", "5"),
            ],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Searching email contacts for domain: {}", domain);
        // Redact key from logs to prevent credential exposure
        tracing::debug!(
            "Email finder URL: {}/v2/domain-search?domain={}&api_key=[REDACTED]&limit=5",
            self.base_url,
            domain
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Email finder request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Email finder returned status {}: {}",
                status, error_text
            )));
        }

        let result: HunterResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse email finder response: {}", e))
        })?;

        let emails: Vec<String> = result
            .data
            .map(|d| d.emails.into_iter().map(|e| e.value).collect())
            .unwrap_or_default();

        tracing::info!("Found {} email(s) for domain {}", emails.len(), domain);
        Ok(emails)
    }
}

// ============ News Search Integration ============

#[derive(Debug, Clone, Deserialize)]
struct SearchGatewayResponse {
    #[serde(default)]
    results: Vec<SearchGatewayResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchGatewayResult {
    #[serde(default)]
    body: String,
}

/// Client for the web-search gateway used to pull news snippets about the
/// focal company into the pitch prompt.
pub struct NewsSearchService {
    client: Client,
    base_url: Option<String>,
}

impl NewsSearchService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: config.search_base_url.clone(),
        }
    }

    /// Fetch news snippets about a company, joined to one insight text.
    pub async fn find_news(&self, company_name: &str) -> Result<String, AppError> {
        let Some(ref base_url) = self.base_url else {
            return Err(AppError::ExternalApiError(
                "SEARCH_BASE_URL not configured".to_string(),
            ));
        };

        let query = format!("{} norge nyheter strategi ledelse", company_name);
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search", base_url),
            &[("q", query.as_str()), ("max_results", "5")],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::info!("Searching news for: {}", company_name);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("News search failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApiError(format!(
                "News search returned status {}",
                status
            )));
        }

        let result: SearchGatewayResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse news search response: {}", e))
        })?;

        let insight = result
            .results
            .iter()
            .map(|r| r.body.as_str())
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        tracing::info!(
            "News search returned {} snippet(s) for '{}'",
            result.results.len(),
            company_name
        );
        Ok(insight)
    }
}

// ============ Pitch Generation (OpenAI-compatible) Integration ============

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

/// Client generating the Norwegian sales pitch ("isbryter") via an
/// OpenAI-compatible chat completions endpoint.
pub struct PitchService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    pitch_context: String,
}

impl PitchService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            pitch_context: config.pitch_context.clone(),
        }
    }

    /// Generate a pitch of at most 3 short sentences tying the news insight
    /// to the seller's offering.
    pub async fn generate_pitch(
        &self,
        company_name: &str,
        industry_description: &str,
        insight: &str,
    ) -> Result<String, AppError> {
        let Some(ref api_key) = self.api_key else {
            return Err(AppError::ExternalApiError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        };

        let prompt = format!(
            "Du er en salgsstrateg for selgeren beskrevet her: {}\n\
             Selskap: {}\n\
             Bransje: {}\n\
             Innsikt: {}\n\
             OPPGAVE:\n\
             Skriv en analyse på maks 3 korte setninger som selgeren kan bruke.\n\
             1. Ingen hilsener eller emojier.\n\
             2. KNYTT innsikten direkte til selgerens løsninger.\n\
             3. Foreslå en konkret tittel å kontakte.",
            self.pitch_context, company_name, industry_description, insight
        );

        let payload = json!({
            "model": self.model,
            "messages": [
                ChatMessage {
                    role: "system",
                    content: "Du er en profesjonell salgsrådgiver. Du bruker aldri emojier."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        });

        tracing::info!("Generating pitch for: {}", company_name);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Pitch request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Pitch endpoint returned status {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse pitch response: {}", e))
        })?;

        let pitch = completion
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::ExternalApiError("Pitch response contained no content".to_string())
            })?;

        tracing::info!("Pitch generated ({} chars)", pitch.len());
        Ok(pitch)
    }
}
