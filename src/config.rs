use serde::Deserialize;

/// Default public endpoint of the Brønnøysund Register Centre (Enhetsregisteret).
const DEFAULT_BRREG_BASE_URL: &str = "https://data.brreg.no/enhetsregisteret/api";
/// Default Hunter-compatible email discovery endpoint.
const DEFAULT_HUNTER_BASE_URL: &str = "https://api.hunter.io";
/// Default OpenAI-compatible chat completions endpoint.
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model used for pitch generation.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Default seller context injected into the pitch prompt.
const DEFAULT_PITCH_CONTEXT: &str =
    "Compend (www.compend.no) leverer plattformer for kurs, opplæring og kompetanseutvikling (LMS).";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub brreg_base_url: String,
    pub hunter_api_key: Option<String>,
    pub hunter_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub search_base_url: Option<String>,
    pub crm_webhook_url: Option<String>,
    pub pitch_context: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            brreg_base_url: std::env::var("BRREG_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BRREG_BASE_URL.to_string())
                .pipe_validate_http("BRREG_BASE_URL")?,
            hunter_api_key: std::env::var("HUNTER_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            hunter_base_url: std::env::var("HUNTER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_HUNTER_BASE_URL.to_string())
                .pipe_validate_http("HUNTER_BASE_URL")?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string())
                .pipe_validate_http("OPENAI_BASE_URL")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            search_base_url: match std::env::var("SEARCH_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(url) => Some(url.pipe_validate_http("SEARCH_BASE_URL")?),
                None => None,
            },
            crm_webhook_url: match std::env::var("CRM_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(url) => Some(url.pipe_validate_http("CRM_WEBHOOK_URL")?),
                None => None,
            },
            pitch_context: std::env::var("PITCH_CONTEXT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PITCH_CONTEXT.to_string()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Registry base URL: {}", config.brreg_base_url);
        tracing::debug!("Server Port: {}", config.port);
        if config.hunter_api_key.is_none() {
            tracing::warn!("HUNTER_API_KEY not set, email discovery disabled");
        }
        if config.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, pitch generation disabled");
        }
        if let Some(ref hook) = config.crm_webhook_url {
            tracing::info!("CRM webhook configured: {}", hook);
        }

        Ok(config)
    }
}

/// Small helper so URL-shaped settings share one validation path.
trait ValidateHttpUrl: Sized {
    fn pipe_validate_http(self, name: &str) -> anyhow::Result<String>;
}

impl ValidateHttpUrl for String {
    fn pipe_validate_http(self, name: &str) -> anyhow::Result<String> {
        if self.trim().is_empty() {
            anyhow::bail!("{} cannot be empty", name);
        }
        if !self.starts_with("http://") && !self.starts_with("https://") {
            anyhow::bail!("{} must start with http:// or https://", name);
        }
        Ok(self)
    }
}
