/// Scenario tests for the lead scoring engine through the public API
use lead_insights_api::models::{
    CompanyRecord, IndustryCode, RegisteredAddress, WebsiteStatus, WebsiteValidation,
};
use lead_insights_api::scoring::{score_candidate, score_focal, LeadSignals, HEALTH_WEIGHTS};

fn company(json: serde_json::Value) -> CompanyRecord {
    serde_json::from_value(json).unwrap()
}

fn full_candidate() -> CompanyRecord {
    CompanyRecord {
        organization_number: "911111111".to_string(),
        name: "Kandidat AS".to_string(),
        employee_count: Some(25),
        industry: Some(IndustryCode {
            code: "62.010".to_string(),
            description: Some("Programmeringstjenester".to_string()),
        }),
        registered_address: Some(RegisteredAddress {
            address_lines: vec!["Storgata 1".to_string()],
            postal_code: Some("0155".to_string()),
            city: Some("Oslo".to_string()),
            municipality_code: Some("0301".to_string()),
            municipality: Some("Oslo".to_string()),
        }),
        website: Some("www.kandidat.no".to_string()),
    }
}

fn active_site() -> WebsiteValidation {
    WebsiteValidation {
        status: WebsiteStatus::Active,
        final_url: Some("https://kandidat.no/".to_string()),
        http_status: Some(200),
    }
}

#[test]
fn test_same_industry_candidate_reaches_full_fit() {
    let candidate = full_candidate();
    let reference = company(serde_json::json!({
        "organisasjonsnummer": "922222222",
        "navn": "Hovedselskapet AS",
        "antallAnsatte": 30,
        "naeringskode1": {"kode": "62.010"}
    }));
    let site = active_site();
    let signals = LeadSignals {
        website: Some(&site),
        ..Default::default()
    };

    let result = score_candidate(&candidate, &reference, &signals);

    // 35 base + 35 industry + 15 size + 10 proximity + 5 website, clamped.
    assert_eq!(result.fit_score, 100);
    assert!(!result.reasons.fit.is_empty());
}

#[test]
fn test_local_growing_candidate_intent() {
    let mut candidate = full_candidate();
    candidate.employee_count = Some(55);
    let reference = company(serde_json::json!({
        "organisasjonsnummer": "922222222",
        "navn": "Hovedselskapet AS",
        "antallAnsatte": 40,
        "naeringskode1": {"kode": "70.220"},
        "forretningsadresse": {"kommunenummer": "0301"}
    }));
    let site = active_site();
    let signals = LeadSignals {
        website: Some(&site),
        ..Default::default()
    };

    let result = score_candidate(&candidate, &reference, &signals);

    // 30 base + 20 size + 15 municipality + 10 website + 10 larger-than.
    assert_eq!(result.intent_score, 85);
}

#[test]
fn test_blank_company_baseline() {
    let blank = company(serde_json::json!({
        "organisasjonsnummer": "999999999",
        "navn": "Tomt Firma"
    }));

    let result = score_focal(&blank, &[], &LeadSignals::default());

    assert_eq!(result.fit_score, 35);
    assert_eq!(result.intent_score, 30);
    assert_eq!(result.data_quality_score, 8);
    assert!(result.high_uncertainty);

    let (wf, wi, wd) = HEALTH_WEIGHTS;
    let expected = (wf * 35.0 + wi * 30.0 + wd * 8.0).round() as u8;
    assert_eq!(result.health_score, expected);
}

#[test]
fn test_fully_enriched_candidate_is_confident() {
    let candidate = full_candidate();
    let reference = company(serde_json::json!({
        "organisasjonsnummer": "922222222",
        "navn": "Hovedselskapet AS",
        "antallAnsatte": 30,
        "naeringskode1": {"kode": "62.010"},
        "forretningsadresse": {"kommunenummer": "0301"}
    }));
    let site = active_site();
    let emails = vec!["post@kandidat.no".to_string(), "salg@kandidat.no".to_string()];
    let signals = LeadSignals {
        website: Some(&site),
        emails: &emails,
        enrichment_age_hours: Some(2.0),
    };

    let result = score_candidate(&candidate, &reference, &signals);

    // 30 website + 30 address + 25 emails + 15 freshness.
    assert_eq!(result.data_quality_score, 100);
    assert!(!result.high_uncertainty);
}

#[test]
fn test_score_result_wire_shape() {
    let blank = company(serde_json::json!({
        "organisasjonsnummer": "999999999",
        "navn": "Tomt Firma"
    }));
    let result = score_focal(&blank, &[], &LeadSignals::default());

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["fit_score"].is_u64());
    assert!(json["intent_score"].is_u64());
    assert!(json["data_quality_score"].is_u64());
    assert!(json["health_score"].is_u64());
    assert!(json["high_uncertainty"].is_boolean());
    assert!(json["reasons"]["fit"].is_array());
    assert!(json["reasons"]["intent"].is_array());
    assert!(json["reasons"]["data_quality"].is_array());
}

#[test]
fn test_stale_enrichment_drags_quality_down() {
    let candidate = full_candidate();
    let reference = full_candidate();
    let site = active_site();

    let fresh = LeadSignals {
        website: Some(&site),
        enrichment_age_hours: Some(1.0),
        ..Default::default()
    };
    let stale = LeadSignals {
        website: Some(&site),
        enrichment_age_hours: Some(500.0),
        ..Default::default()
    };

    let fresh_score = score_candidate(&candidate, &reference, &fresh);
    let stale_score = score_candidate(&candidate, &reference, &stale);

    assert!(stale_score.data_quality_score < fresh_score.data_quality_score);
    assert_eq!(
        fresh_score.data_quality_score - stale_score.data_quality_score,
        11 // +15 fresh tier vs +4 stale tier
    );
}
