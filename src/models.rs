use serde::{Deserialize, Serialize};

// ============ Registry Models (Enhetsregisteret wire shape) ============

/// A company record as returned by the Brønnøysund registry.
///
/// Field names serialize in the registry's own (Norwegian) wire shape so a
/// record round-trips unchanged between the registry, this API and its
/// consumers. Every field the scoring engine consumes may be absent; absence
/// is data, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Stable 9-digit organisation number.
    #[serde(rename = "organisasjonsnummer")]
    pub organization_number: String,
    /// Registered legal name.
    #[serde(rename = "navn")]
    pub name: String,
    /// Registered employee count; absent or zero for many small companies.
    #[serde(rename = "antallAnsatte", default)]
    pub employee_count: Option<u32>,
    /// Primary industry classification (dotted hierarchical NACE code).
    #[serde(rename = "naeringskode1", default)]
    pub industry: Option<IndustryCode>,
    /// Registered business address; any sub-field may be absent.
    #[serde(rename = "forretningsadresse", default)]
    pub registered_address: Option<RegisteredAddress>,
    /// Company website URL, often missing or malformed.
    #[serde(rename = "hjemmeside", default)]
    pub website: Option<String>,
}

impl CompanyRecord {
    /// Industry code, if registered.
    pub fn industry_code(&self) -> Option<&str> {
        self.industry.as_ref().map(|i| i.code.as_str())
    }

    /// Municipality code of the registered address, if present.
    pub fn municipality_code(&self) -> Option<&str> {
        self.registered_address
            .as_ref()
            .and_then(|a| a.municipality_code.as_deref())
    }

    /// Employee count with the registry's "absent means unknown" collapsed to 0.
    pub fn employees(&self) -> u32 {
        self.employee_count.unwrap_or(0)
    }
}

/// Industry classification entry (NACE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryCode {
    /// Dotted hierarchical code, e.g. "62.010".
    #[serde(rename = "kode")]
    pub code: String,
    /// Human-readable description.
    #[serde(rename = "beskrivelse", default)]
    pub description: Option<String>,
}

/// Registered business address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisteredAddress {
    /// Street address lines.
    #[serde(rename = "adresse", default)]
    pub address_lines: Vec<String>,
    /// Postal code.
    #[serde(rename = "postnummer", default)]
    pub postal_code: Option<String>,
    /// Postal town.
    #[serde(rename = "poststed", default)]
    pub city: Option<String>,
    /// Municipality number, e.g. "0301" for Oslo.
    #[serde(rename = "kommunenummer", default)]
    pub municipality_code: Option<String>,
    /// Municipality name.
    #[serde(rename = "kommune", default)]
    pub municipality: Option<String>,
}

impl RegisteredAddress {
    /// First non-empty street line, if any.
    pub fn street(&self) -> Option<&str> {
        self.address_lines
            .iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    /// How many of the four scored sub-fields (street, postal code, city,
    /// municipality code) are present.
    pub fn completeness(&self) -> u8 {
        let mut present = 0u8;
        if self.street().is_some() {
            present += 1;
        }
        if self.postal_code.as_deref().is_some_and(|s| !s.trim().is_empty()) {
            present += 1;
        }
        if self.city.as_deref().is_some_and(|s| !s.trim().is_empty()) {
            present += 1;
        }
        if self
            .municipality_code
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
        {
            present += 1;
        }
        present
    }

    /// Display string in the registry's conventional "gate, postnummer poststed" form.
    pub fn display(&self) -> String {
        let street = self.street().unwrap_or("");
        let post = format!(
            "{} {}",
            self.postal_code.as_deref().unwrap_or(""),
            self.city.as_deref().unwrap_or("")
        );
        let joined = format!("{}, {}", street, post.trim());
        let joined = joined.trim_matches(|c: char| c == ',' || c.is_whitespace());
        if joined.is_empty() {
            "Ingen adresse registrert".to_string()
        } else {
            joined.to_string()
        }
    }
}

/// Search response envelope from the registry (`GET /enheter?...`).
#[derive(Debug, Clone, Deserialize)]
pub struct CompanySearchResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<EmbeddedCompanies>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedCompanies {
    #[serde(rename = "enheter", default)]
    pub companies: Vec<CompanyRecord>,
}

impl CompanySearchResponse {
    /// Flattens the HAL envelope into a plain list.
    pub fn into_companies(self) -> Vec<CompanyRecord> {
        self.embedded.map(|e| e.companies).unwrap_or_default()
    }
}

// ============ Website Validation ============

/// Reachability classification of a company website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebsiteStatus {
    /// 2xx response on the requested host.
    Active,
    /// 2xx response after landing on a different host or URL.
    Redirected,
    /// The server answered with a non-success status.
    Inactive,
    /// Transport-level failure (DNS, TLS, timeout).
    Error,
}

impl WebsiteStatus {
    /// Whether the site answered with content a visitor would see.
    pub fn is_reachable(&self) -> bool {
        matches!(self, WebsiteStatus::Active | WebsiteStatus::Redirected)
    }
}

/// Result of probing a website, cached per normalized domain for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteValidation {
    /// Reachability classification.
    pub status: WebsiteStatus,
    /// URL the probe ended up on after redirects.
    pub final_url: Option<String>,
    /// HTTP status of the final response, when one was received.
    pub http_status: Option<u16>,
}

// ============ Best-effort fetch outcomes ============

/// Outcome of a best-effort upstream fetch.
///
/// Upstream data (news snippets, emails, the pitch) is supplementary: when a
/// provider is unconfigured or fails, the analysis carries on with an
/// explicit reason instead of a silently-empty value, and scoring treats the
/// input as missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Sourced<T> {
    /// The provider delivered a value.
    Available { value: T },
    /// The provider was skipped or failed; `reason` says why.
    Unavailable { reason: String },
}

impl<T> Sourced<T> {
    pub fn available(value: T) -> Self {
        Sourced::Available { value }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Sourced::Unavailable {
            reason: reason.into(),
        }
    }

    /// The value, if one was delivered.
    pub fn value(&self) -> Option<&T> {
        match self {
            Sourced::Available { value } => Some(value),
            Sourced::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Sourced::Available { .. })
    }
}

impl<T: Default + Clone> Sourced<T> {
    /// The value, or the neutral default scoring expects for missing input.
    pub fn value_or_default(&self) -> T {
        match self {
            Sourced::Available { value } => value.clone(),
            Sourced::Unavailable { .. } => T::default(),
        }
    }
}

// ============ API Request/Response Models ============

/// Query parameters for the searchbox endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    /// Free-text query: a 9-digit organisation number or a name fragment.
    pub q: String,
}

/// One searchbox hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Display label, e.g. "Eksempel AS  ·  Oslo  ·  42 ansatte  ·  912345678".
    pub label: String,
    /// Organisation number to feed into the analyze endpoint.
    pub organization_number: String,
}

/// Request payload for the analyze endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Organisation number of the focal company.
    pub orgnr: String,
}

/// Full analysis of a focal company and its candidate leads.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    /// The focal company as registered.
    pub company: CompanyRecord,
    /// Formatted registered address for display.
    pub address: String,
    /// Website validation of the focal company, when it has a usable URL.
    pub website: Option<WebsiteValidation>,
    /// Emails discovered for the focal company's domain.
    pub emails: Sourced<Vec<String>>,
    /// Generated sales pitch.
    pub pitch: Sourced<String>,
    /// Health scoring of the focal company against the candidate set.
    pub score: crate::scoring::ScoreResult,
    /// Candidate leads in the same industry segment, each scored.
    pub leads: Vec<ScoredLead>,
    /// Provenance and freshness metadata.
    pub metadata: AnalysisMetadata,
}

/// A candidate lead with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredLead {
    /// The candidate as registered.
    pub company: CompanyRecord,
    /// Website validation, when the candidate has a usable URL.
    pub website: Option<WebsiteValidation>,
    /// Score relative to the focal company.
    pub score: crate::scoring::ScoreResult,
}

/// Provenance metadata attached to an analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// Upstream sources that contributed data.
    pub sources: Vec<String>,
    /// Analysis timestamp (RFC 3339).
    pub timestamp: String,
    /// Hours since the focal company was last enriched this session, if ever.
    pub enrichment_age_hours: Option<f64>,
    /// Whether candidate discovery had to widen beyond the municipality.
    pub widened_search: bool,
}

/// Request payload for the pure scoring endpoint.
///
/// Lets a caller replay the scoring engine on explicit inputs without any
/// upstream fetching.
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    /// Candidate company to score.
    pub candidate: CompanyRecord,
    /// Focal company used for relative features.
    pub reference: CompanyRecord,
    /// Website validation of the candidate, if probed.
    #[serde(default)]
    pub website: Option<WebsiteValidation>,
    /// Emails discovered for the candidate.
    #[serde(default)]
    pub emails: Vec<String>,
    /// Hours since last enrichment; null means never enriched.
    #[serde(default)]
    pub enrichment_age_hours: Option<f64>,
}

/// Request payload for forwarding a qualified lead to the CRM.
#[derive(Debug, Deserialize)]
pub struct ForwardLeadRequest {
    /// Organisation number of the lead to forward.
    pub orgnr: String,
    /// Optional note from the seller.
    #[serde(default)]
    pub note: Option<String>,
}

/// Response payload for the forward endpoint.
#[derive(Debug, Serialize)]
pub struct ForwardLeadResponse {
    /// Whether the webhook accepted the payload.
    pub success: bool,
    /// Message describing the result.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(
        lines: &[&str],
        postal: Option<&str>,
        city: Option<&str>,
        municipality_code: Option<&str>,
    ) -> RegisteredAddress {
        RegisteredAddress {
            address_lines: lines.iter().map(|s| s.to_string()).collect(),
            postal_code: postal.map(String::from),
            city: city.map(String::from),
            municipality_code: municipality_code.map(String::from),
            municipality: None,
        }
    }

    #[test]
    fn test_address_completeness_counts_subfields() {
        assert_eq!(
            address(&["Storgata 1"], Some("0155"), Some("Oslo"), Some("0301")).completeness(),
            4
        );
        assert_eq!(
            address(&["Storgata 1"], Some("0155"), Some("Oslo"), None).completeness(),
            3
        );
        assert_eq!(address(&[], Some("0155"), Some("Oslo"), None).completeness(), 2);
        assert_eq!(address(&[], None, Some("Oslo"), None).completeness(), 1);
        assert_eq!(address(&[], None, None, None).completeness(), 0);
    }

    #[test]
    fn test_address_completeness_ignores_blank_strings() {
        assert_eq!(address(&["  "], Some(""), None, None).completeness(), 0);
    }

    #[test]
    fn test_address_display_full() {
        let addr = address(&["Storgata 1"], Some("0155"), Some("Oslo"), Some("0301"));
        assert_eq!(addr.display(), "Storgata 1, 0155 Oslo");
    }

    #[test]
    fn test_address_display_empty() {
        assert_eq!(address(&[], None, None, None).display(), "Ingen adresse registrert");
    }

    #[test]
    fn test_parse_registry_record() {
        let json = r#"
        {
            "organisasjonsnummer": "912345678",
            "navn": "Eksempel AS",
            "antallAnsatte": 42,
            "naeringskode1": {"kode": "62.010", "beskrivelse": "Programmeringstjenester"},
            "forretningsadresse": {
                "adresse": ["Storgata 1"],
                "postnummer": "0155",
                "poststed": "Oslo",
                "kommunenummer": "0301",
                "kommune": "Oslo"
            },
            "hjemmeside": "www.eksempel.no"
        }
        "#;

        let record: CompanyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.organization_number, "912345678");
        assert_eq!(record.employees(), 42);
        assert_eq!(record.industry_code(), Some("62.010"));
        assert_eq!(record.municipality_code(), Some("0301"));
    }

    #[test]
    fn test_parse_sparse_registry_record() {
        // Many registry entries carry only the identity fields.
        let json = r#"{"organisasjonsnummer": "987654321", "navn": "Tomt Firma"}"#;
        let record: CompanyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.employees(), 0);
        assert!(record.industry_code().is_none());
        assert!(record.registered_address.is_none());
        assert!(record.website.is_none());
    }

    #[test]
    fn test_search_response_without_embedded() {
        let response: CompanySearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_companies().is_empty());
    }

    #[test]
    fn test_sourced_serializes_tagged() {
        let ok: Sourced<Vec<String>> = Sourced::available(vec!["a@b.no".to_string()]);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "available");

        let gone: Sourced<Vec<String>> = Sourced::unavailable("HUNTER_API_KEY not configured");
        let json = serde_json::to_value(&gone).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert!(json["reason"].as_str().unwrap().contains("HUNTER_API_KEY"));
    }
}
