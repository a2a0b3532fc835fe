use crate::errors::AppError;
use crate::scoring::ScoreResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Qualified-lead payload posted to the CRM catch hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmLeadPayload {
    /// Organisation number of the lead.
    pub organization_number: String,
    /// Registered company name.
    pub company_name: String,
    /// Industry description, when registered.
    pub industry: Option<String>,
    /// Formatted registered address.
    pub address: String,
    /// Company website, when registered.
    pub website: Option<String>,
    /// Discovered email contacts.
    pub emails: Vec<String>,
    /// Scoring snapshot at forward time.
    pub score: ScoreResult,
    /// Generated pitch, when available.
    pub pitch: Option<String>,
    /// Optional note from the seller.
    pub note: Option<String>,
    /// Originating service identifier.
    pub source: String,
    /// Forward timestamp (RFC 3339).
    pub forwarded_at: String,
}

/// Client for forwarding qualified leads to a CRM via an outbound webhook
/// (Zapier-style catch hook).
#[derive(Clone)]
pub struct CrmWebhookClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl CrmWebhookClient {
    /// Creates a new `CrmWebhookClient`.
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - The catch-hook URL leads are posted to.
    pub fn new(webhook_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create CRM client: {}", e))
            })?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Posts a qualified lead to the CRM hook. Catch hooks acknowledge with
    /// any 2xx; everything else is surfaced as an external API error.
    pub async fn forward_lead(&self, payload: &CrmLeadPayload) -> Result<(), AppError> {
        tracing::info!(
            "Forwarding lead {} ({}) to CRM webhook",
            payload.organization_number,
            payload.company_name
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM webhook failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "CRM webhook returned status {}: {}",
                status, error_text
            )));
        }

        tracing::info!(
            "✓ Lead {} forwarded to CRM",
            payload.organization_number
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = CrmWebhookClient::new("https://hooks.example.com/catch/1".to_string());
        assert!(client.is_ok());
    }
}
