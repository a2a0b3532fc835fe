//! Lead scoring engine.
//!
//! Converts sparse, partially-missing company attributes into three 0-100
//! sub-scores (fit, intent, data quality) plus a blended health score, each
//! paired with short human-readable justifications. The engine is pure and
//! infallible: a missing input field penalizes the relevant sub-score, it
//! never raises. All I/O that feeds it (website probing, email discovery)
//! happens upstream on a best-effort basis.

use crate::models::{CompanyRecord, WebsiteValidation};
use serde::{Deserialize, Serialize};

/// Health-score blend weights: fit, intent, data quality.
///
/// One canonical tuple is used for both the per-lead and the focal form so
/// the badges stay comparable across the page. The per-lead weighting wins
/// because candidate ranking is the primary output of the product.
pub const HEALTH_WEIGHTS: (f64, f64, f64) = (0.45, 0.35, 0.20);

/// Data-quality threshold below which a lead is flagged as uncertain.
const HIGH_UNCERTAINTY_BELOW: u8 = 50;

/// Base values the additive tables start from.
const FIT_BASE: i32 = 35;
const INTENT_BASE: i32 = 30;

/// Signals gathered upstream for the company being scored.
///
/// Everything here is optional in practice: an empty email set, an absent
/// website validation and a null enrichment age are ordinary inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadSignals<'a> {
    /// Website probe result, when the company had a usable URL.
    pub website: Option<&'a WebsiteValidation>,
    /// Emails discovered for the company's domain.
    pub emails: &'a [String],
    /// Hours since the company was last enriched; `None` means never.
    pub enrichment_age_hours: Option<f64>,
}

/// Justification strings, one list per sub-score, in firing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReasons {
    pub fit: Vec<String>,
    pub intent: Vec<String>,
    pub data_quality: Vec<String>,
}

/// Output of a scoring pass. Recomputed fresh on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub fit_score: u8,
    pub intent_score: u8,
    pub data_quality_score: u8,
    pub health_score: u8,
    /// True when the data-quality score is too low to trust the lead data.
    pub high_uncertainty: bool,
    pub reasons: ScoreReasons,
}

/// Relative features of the company being scored against its comparison
/// point: a single reference company for candidates, the candidate set for
/// the focal company.
#[derive(Debug, Clone, Copy)]
struct ReferenceFrame<'a> {
    industry_match: bool,
    municipality_match: bool,
    /// Known employee count of the comparison point, when it has one.
    reference_employees: Option<u32>,
    /// Norwegian label for the comparison point, used in reason strings.
    peer_label: &'a str,
}

/// Scores a candidate lead relative to the focal company.
pub fn score_candidate(
    candidate: &CompanyRecord,
    reference: &CompanyRecord,
    signals: &LeadSignals,
) -> ScoreResult {
    let frame = ReferenceFrame {
        industry_match: match (candidate.industry_code(), reference.industry_code()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        municipality_match: match (candidate.municipality_code(), reference.municipality_code()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        reference_employees: reference.employee_count,
        peer_label: "hovedselskapet",
    };
    score_with_frame(candidate, &frame, signals)
}

/// Scores the focal company against its candidate set.
///
/// The relative features are derived from the set: the reference employee
/// count is the median over the candidates, and the industry/municipality
/// matches fire when at least one candidate shares the focal company's code.
/// An empty set contributes no relative bonuses.
pub fn score_focal(
    company: &CompanyRecord,
    candidates: &[CompanyRecord],
    signals: &LeadSignals,
) -> ScoreResult {
    let industry_match = company.industry_code().is_some_and(|code| {
        candidates
            .iter()
            .any(|c| c.industry_code() == Some(code))
    });
    let municipality_match = company.municipality_code().is_some_and(|code| {
        candidates
            .iter()
            .any(|c| c.municipality_code() == Some(code))
    });

    let frame = ReferenceFrame {
        industry_match,
        municipality_match,
        reference_employees: median_employees(candidates),
        peer_label: "lignende aktører",
    };
    score_with_frame(company, &frame, signals)
}

/// Blends the three sub-scores into the displayed health score.
pub fn health_score(fit: u8, intent: u8, data_quality: u8) -> u8 {
    let (wf, wi, wd) = HEALTH_WEIGHTS;
    let blended = wf * f64::from(fit) + wi * f64::from(intent) + wd * f64::from(data_quality);
    blended.round() as u8
}

fn score_with_frame(
    company: &CompanyRecord,
    frame: &ReferenceFrame,
    signals: &LeadSignals,
) -> ScoreResult {
    let (fit_score, fit) = fit_score(company, frame, signals);
    let (intent_score, intent) = intent_score(company, frame, signals);
    let (data_quality_score, data_quality) = data_quality_score(company, signals);

    ScoreResult {
        fit_score,
        intent_score,
        data_quality_score,
        health_score: health_score(fit_score, intent_score, data_quality_score),
        high_uncertainty: data_quality_score < HIGH_UNCERTAINTY_BELOW,
        reasons: ScoreReasons {
            fit,
            intent,
            data_quality,
        },
    }
}

/// Fit: how well the company matches the ideal customer profile.
fn fit_score(
    company: &CompanyRecord,
    frame: &ReferenceFrame,
    signals: &LeadSignals,
) -> (u8, Vec<String>) {
    let mut score = FIT_BASE;
    let mut reasons = Vec::new();
    let employees = company.employees();

    if frame.industry_match {
        score += 35;
        reasons.push(format!("Samme bransje som {}", frame.peer_label));
    } else if company.industry_code().is_none() {
        reasons.push("Bransjekode mangler".to_string());
    } else {
        reasons.push(format!("Annen bransje enn {}", frame.peer_label));
    }

    if employees >= 20 {
        score += 15;
        reasons.push(format!("Etablert organisasjon ({} ansatte)", employees));
    } else {
        reasons.push("Få eller ukjent antall ansatte".to_string());
    }

    if let Some(reference) = frame.reference_employees {
        if employees.abs_diff(reference) <= 50 {
            score += 10;
            reasons.push(format!("Sammenlignbar størrelse med {}", frame.peer_label));
        }
    }

    match signals.website.map(|w| w.status) {
        Some(status) if status.is_reachable() => {
            score += 5;
            reasons.push("Nettsiden svarer".to_string());
        }
        Some(_) => {
            score -= 3;
            reasons.push("Nettsiden svarer ikke".to_string());
        }
        None => {}
    }

    (clamp_score(score), reasons)
}

/// Intent: how receptive the company likely is to outreach right now.
fn intent_score(
    company: &CompanyRecord,
    frame: &ReferenceFrame,
    signals: &LeadSignals,
) -> (u8, Vec<String>) {
    let mut score = INTENT_BASE;
    let mut reasons = Vec::new();
    let employees = company.employees();

    if employees >= 50 {
        score += 20;
        reasons.push(format!("Stor organisasjon ({} ansatte)", employees));
    } else if employees >= 20 {
        score += 10;
        reasons.push(format!("Mellomstor organisasjon ({} ansatte)", employees));
    } else {
        reasons.push("Liten eller ukjent bemanning".to_string());
    }

    if frame.municipality_match {
        score += 15;
        reasons.push(format!("Samme kommune som {}", frame.peer_label));
    } else {
        reasons.push("Ikke lokal aktør".to_string());
    }

    match signals.website.map(|w| w.status) {
        Some(status) if status.is_reachable() => {
            score += 10;
            reasons.push("Aktiv digital tilstedeværelse".to_string());
        }
        Some(_) => {
            score -= 5;
            reasons.push("Svak digital tilstedeværelse".to_string());
        }
        None => {}
    }

    if let Some(reference) = frame.reference_employees {
        if employees > reference {
            score += 10;
            reasons.push(format!("Større enn {}", frame.peer_label));
        }
    }

    (clamp_score(score), reasons)
}

/// Data quality: completeness, verifiability and freshness of what we know.
fn data_quality_score(company: &CompanyRecord, signals: &LeadSignals) -> (u8, Vec<String>) {
    let mut score = 0i32;
    let mut reasons = Vec::new();

    match signals.website.map(|w| w.status) {
        Some(status) if status.is_reachable() => {
            score += 30;
            reasons.push("Nettsted verifisert".to_string());
        }
        _ => reasons.push("Nettsted ikke verifisert".to_string()),
    }

    let completeness = company
        .registered_address
        .as_ref()
        .map(|a| a.completeness())
        .unwrap_or(0);
    score += match completeness {
        4 => 30,
        3 => 22,
        2 => 15,
        1 => 8,
        _ => 0,
    };
    if completeness == 4 {
        reasons.push("Fullstendig adresse registrert".to_string());
    } else if completeness > 0 {
        reasons.push(format!("Delvis adresse ({} av 4 felt)", completeness));
    } else {
        reasons.push("Adresse mangler".to_string());
    }

    match signals.emails.len() {
        n if n >= 2 => {
            score += 25;
            reasons.push(format!("{} e-postkontakter funnet", n));
        }
        1 => {
            score += 15;
            reasons.push("Én e-postkontakt funnet".to_string());
        }
        _ => reasons.push("Ingen e-postkontakter funnet".to_string()),
    }

    // Freshness decay. A company that has never been enriched this session
    // gets partial credit: unknown freshness should not outrank a verified
    // fresh enrichment.
    match signals.enrichment_age_hours {
        None => {
            score += 8;
            reasons.push("Ikke beriket ennå".to_string());
        }
        Some(age) if age <= 24.0 => {
            score += 15;
            reasons.push("Nylig beriket".to_string());
        }
        Some(age) if age <= 72.0 => {
            score += 12;
            reasons.push("Beriket siste tre døgn".to_string());
        }
        Some(age) if age <= 168.0 => {
            score += 8;
            reasons.push("Beriket siste uke".to_string());
        }
        Some(_) => {
            score += 4;
            reasons.push("Berikelsen er utdatert".to_string());
        }
    }

    (clamp_score(score), reasons)
}

fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Median employee count over the candidate set; `None` for an empty set.
fn median_employees(candidates: &[CompanyRecord]) -> Option<u32> {
    if candidates.is_empty() {
        return None;
    }
    let mut counts: Vec<u32> = candidates.iter().map(|c| c.employees()).collect();
    counts.sort_unstable();
    let mid = counts.len() / 2;
    if counts.len() % 2 == 0 {
        Some((counts[mid - 1] + counts[mid]) / 2)
    } else {
        Some(counts[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndustryCode, RegisteredAddress, WebsiteStatus};

    fn company(
        orgnr: &str,
        employees: Option<u32>,
        industry: Option<&str>,
        municipality: Option<&str>,
    ) -> CompanyRecord {
        CompanyRecord {
            organization_number: orgnr.to_string(),
            name: format!("Firma {}", orgnr),
            employee_count: employees,
            industry: industry.map(|code| IndustryCode {
                code: code.to_string(),
                description: None,
            }),
            registered_address: municipality.map(|code| RegisteredAddress {
                address_lines: vec![],
                postal_code: None,
                city: None,
                municipality_code: Some(code.to_string()),
                municipality: None,
            }),
            website: None,
        }
    }

    fn validation(status: WebsiteStatus) -> WebsiteValidation {
        WebsiteValidation {
            status,
            final_url: Some("https://eksempel.no/".to_string()),
            http_status: Some(200),
        }
    }

    #[test]
    fn test_boundary_all_unknown_company() {
        let blank = company("999999999", None, None, None);
        let result = score_focal(&blank, &[], &LeadSignals::default());

        assert_eq!(result.fit_score, 35);
        assert_eq!(result.intent_score, 30);
        assert_eq!(result.data_quality_score, 8);
        assert!(result.high_uncertainty);
    }

    #[test]
    fn test_candidate_fit_clamps_at_100() {
        // Same industry, 25 vs 30 employees, website active:
        // 35 + 35 + 15 + 10 + 5 = 100.
        let candidate = company("911111111", Some(25), Some("62.010"), None);
        let reference = company("922222222", Some(30), Some("62.010"), None);
        let site = validation(WebsiteStatus::Active);
        let signals = LeadSignals {
            website: Some(&site),
            ..Default::default()
        };

        let result = score_candidate(&candidate, &reference, &signals);
        assert_eq!(result.fit_score, 100);
    }

    #[test]
    fn test_candidate_intent_table() {
        // Same municipality, 55 vs 40 employees, website active:
        // 30 + 20 + 15 + 10 + 10 = 85.
        let candidate = company("911111111", Some(55), Some("62.010"), Some("0301"));
        let reference = company("922222222", Some(40), Some("70.220"), Some("0301"));
        let site = validation(WebsiteStatus::Active);
        let signals = LeadSignals {
            website: Some(&site),
            ..Default::default()
        };

        let result = score_candidate(&candidate, &reference, &signals);
        assert_eq!(result.intent_score, 85);
    }

    #[test]
    fn test_broken_website_penalizes() {
        let candidate = company("911111111", None, None, None);
        let reference = company("922222222", None, None, None);
        let site = validation(WebsiteStatus::Inactive);
        let signals = LeadSignals {
            website: Some(&site),
            ..Default::default()
        };

        let result = score_candidate(&candidate, &reference, &signals);
        assert_eq!(result.fit_score, 32); // 35 - 3
        assert_eq!(result.intent_score, 25); // 30 - 5
    }

    #[test]
    fn test_size_proximity_requires_known_reference() {
        // No reference employee count: the proximity bonus must not fire
        // even though |0 - 0| would be within the window.
        let candidate = company("911111111", None, None, None);
        let reference = company("922222222", None, None, None);

        let result = score_candidate(&candidate, &reference, &LeadSignals::default());
        assert_eq!(result.fit_score, 35);
    }

    #[test]
    fn test_data_quality_freshness_tiers() {
        let full = company("911111111", None, None, None);
        let tiers = [
            (Some(1.0), 15),
            (Some(24.0), 15),
            (Some(48.0), 12),
            (Some(168.0), 8),
            (Some(400.0), 4),
            (None, 8),
        ];
        for (age, expected) in tiers {
            let signals = LeadSignals {
                enrichment_age_hours: age,
                ..Default::default()
            };
            let (score, _) = data_quality_score(&full, &signals);
            assert_eq!(score, expected, "age {:?}", age);
        }
    }

    #[test]
    fn test_data_quality_email_tiers() {
        let blank = company("911111111", None, None, None);
        let two = vec!["post@a.no".to_string(), "salg@a.no".to_string()];
        let one = vec!["post@a.no".to_string()];

        let score_for = |emails: &[String]| {
            data_quality_score(
                &blank,
                &LeadSignals {
                    emails,
                    enrichment_age_hours: Some(1000.0),
                    ..Default::default()
                },
            )
            .0
        };

        assert_eq!(score_for(&two), 25 + 4);
        assert_eq!(score_for(&one), 15 + 4);
        assert_eq!(score_for(&[]), 4);
    }

    #[test]
    fn test_data_quality_full_record() {
        let mut full = company("911111111", Some(30), Some("62.010"), Some("0301"));
        full.registered_address = Some(RegisteredAddress {
            address_lines: vec!["Storgata 1".to_string()],
            postal_code: Some("0155".to_string()),
            city: Some("Oslo".to_string()),
            municipality_code: Some("0301".to_string()),
            municipality: Some("Oslo".to_string()),
        });
        let site = validation(WebsiteStatus::Active);
        let emails = vec!["post@a.no".to_string(), "salg@a.no".to_string()];
        let signals = LeadSignals {
            website: Some(&site),
            emails: &emails,
            enrichment_age_hours: Some(2.0),
        };

        let (score, _) = data_quality_score(&full, &signals);
        assert_eq!(score, 100); // 30 + 30 + 25 + 15
    }

    #[test]
    fn test_health_blend_exact() {
        assert_eq!(health_score(100, 100, 100), 100);
        assert_eq!(health_score(0, 0, 0), 0);
        // 0.45*80 + 0.35*60 + 0.20*40 = 36 + 21 + 8 = 65
        assert_eq!(health_score(80, 60, 40), 65);
    }

    #[test]
    fn test_health_blend_rounds_half_up() {
        // 0.45*10 = 4.5 rounds to 5.
        assert_eq!(health_score(10, 0, 0), 5);
    }

    #[test]
    fn test_intent_monotonic_in_employee_count() {
        let reference = company("922222222", Some(60), Some("62.010"), None);
        let mut previous = 0u8;
        for employees in [10u32, 20, 30, 40, 50, 60] {
            let candidate = company("911111111", Some(employees), Some("62.010"), None);
            let result = score_candidate(&candidate, &reference, &LeadSignals::default());
            assert!(
                result.intent_score >= previous,
                "intent dropped at {} employees",
                employees
            );
            previous = result.intent_score;
        }
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let candidate = company("911111111", Some(25), Some("62.010"), Some("0301"));
        let reference = company("922222222", Some(30), Some("62.010"), Some("0301"));
        let site = validation(WebsiteStatus::Redirected);
        let emails = vec!["post@a.no".to_string()];
        let signals = LeadSignals {
            website: Some(&site),
            emails: &emails,
            enrichment_age_hours: Some(12.5),
        };

        let first = score_candidate(&candidate, &reference, &signals);
        let second = score_candidate(&candidate, &reference, &signals);
        assert_eq!(first, second);
    }

    #[test]
    fn test_focal_uses_candidate_set_median() {
        let focal = company("911111111", Some(100), Some("62.010"), Some("0301"));
        let candidates = vec![
            company("922222222", Some(10), Some("62.010"), Some("5001")),
            company("933333333", Some(20), Some("62.010"), Some("0301")),
            company("944444444", Some(30), Some("70.220"), Some("1103")),
        ];

        let result = score_focal(&focal, &candidates, &LeadSignals::default());
        // Industry and municipality both match at least one candidate; the
        // median (20) is more than 50 below the focal count, so no proximity
        // bonus: 35 + 35 + 15 = 85.
        assert_eq!(result.fit_score, 85);
        // 30 + 20 (>=50) + 15 (municipality) + 10 (100 > 20) = 75.
        assert_eq!(result.intent_score, 75);
    }

    #[test]
    fn test_focal_empty_candidate_set() {
        let focal = company("911111111", Some(100), Some("62.010"), Some("0301"));
        let result = score_focal(&focal, &[], &LeadSignals::default());
        // No relative bonuses: 35 + 15 (size) = 50.
        assert_eq!(result.fit_score, 50);
    }

    #[test]
    fn test_reason_lists_stay_short() {
        let candidate = company("911111111", Some(55), Some("62.010"), Some("0301"));
        let reference = company("922222222", Some(40), Some("62.010"), Some("0301"));
        let site = validation(WebsiteStatus::Active);
        let emails = vec!["post@a.no".to_string(), "salg@a.no".to_string()];
        let signals = LeadSignals {
            website: Some(&site),
            emails: &emails,
            enrichment_age_hours: Some(1.0),
        };

        let result = score_candidate(&candidate, &reference, &signals);
        for reasons in [
            &result.reasons.fit,
            &result.reasons.intent,
            &result.reasons.data_quality,
        ] {
            assert!(
                (2..=5).contains(&reasons.len()),
                "expected 2-5 reasons, got {:?}",
                reasons
            );
        }
    }

    #[test]
    fn test_median_employees() {
        assert_eq!(median_employees(&[]), None);
        let set = vec![
            company("1", Some(10), None, None),
            company("2", Some(30), None, None),
        ];
        assert_eq!(median_employees(&set), Some(20));
    }
}
