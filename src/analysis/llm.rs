use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AnalysisError;

/// Per-call generation parameters, resolved from `AnalysisConfig` by the
/// runner so the client stays stateless about analysis kinds.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

/// Hosted completion API abstraction (allows mocking).
pub trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, AnalysisError>;
}

/// HTTP client for the hosted completion API.
pub struct HttpCompletionClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpCompletionClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }
}

/// Request body for POST /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response body from POST /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl CompletionClient for HttpCompletionClient {
    fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &options.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_output_tokens,
            },
        };

        let mut request = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(options.timeout_secs))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                AnalysisError::Timeout(options.timeout_secs)
            } else if e.is_connect() {
                AnalysisError::Connection(self.base_url.clone())
            } else {
                AnalysisError::ResponseDecoding(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseDecoding(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Mock completion client for testing — returns a configurable response.
pub struct MockCompletionClient {
    response: String,
}

impl MockCompletionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(
        &self,
        _prompt: &str,
        _system: &str,
        _options: &CompletionOptions,
    ) -> Result<String, AnalysisError> {
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompletionOptions {
        CompletionOptions {
            model: "gemini-2.0-flash".into(),
            temperature: 0.3,
            max_output_tokens: 4096,
            timeout_secs: 90,
        }
    }

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockCompletionClient::new("test response");
        let result = client.complete("prompt", "system", &options()).unwrap();
        assert_eq!(result, "test response");
    }

    #[test]
    fn http_client_trims_trailing_slash() {
        let client = HttpCompletionClient::new("https://llm.example.com/", None);
        assert_eq!(client.base_url, "https://llm.example.com");
    }

    #[test]
    fn http_client_keeps_api_key() {
        let client = HttpCompletionClient::new("https://llm.example.com", Some("k-123".into()));
        assert_eq!(client.api_key.as_deref(), Some("k-123"));
    }
}
