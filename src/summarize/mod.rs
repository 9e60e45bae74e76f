pub mod format;
pub mod prompts;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub use format::format_ai_response;
use prompts::{analysis_prompt, KEY_CHECK_PROMPT, NOT_A_CHANGELOG};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

/// Low temperature and a bounded output: the summary should be terse and repeatable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<&'a GenerationConfig>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Gemini `generateContent` client.
pub struct Summarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    generation: GenerationConfig,
}

impl Summarizer {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            generation: GenerationConfig::default(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/models/{}:generateContent", self.base_url, self.model)
    }

    /// One request, first candidate's text. Any transport, status or decoding
    /// problem comes back as an error value.
    async fn generate(
        &self,
        prompt: &str,
        generation: Option<&GenerationConfig>,
        api_key: &str,
    ) -> Result<String> {
        if api_key.trim().is_empty() {
            return Err(Error::Configuration("Gemini API key not configured".into()));
        }

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: generation,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("API request failed: {}", e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("API request failed: {}", e)))?;

        let parsed: GenerateResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::Transport(format!("API returned status code: {}", status.as_u16())))
            }
            Err(_) => return Err(Error::Parse("Failed to parse API response".into())),
        };

        if let Some(err) = parsed.error {
            return Err(Error::Api(err.message));
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("API returned status code: {}", status.as_u16())));
        }

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| Error::Parse("Failed to extract summary: no candidate text".into()))
    }

    /// Summarize extracted changelog content into display HTML.
    pub async fn summarize(&self, content: &str, api_key: &str) -> Result<String> {
        let raw = self
            .generate(&analysis_prompt(content), Some(&self.generation), api_key)
            .await?;

        if raw.contains(NOT_A_CHANGELOG) {
            debug!("model reported content is not a changelog");
            return Err(Error::NotAChangelog(raw));
        }

        Ok(format_ai_response(&raw))
    }

    /// Check that the endpoint accepts `api_key`.
    pub async fn verify_key(&self, api_key: &str) -> Result<()> {
        self.generate(KEY_CHECK_PROMPT, None, api_key).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1/models/gemini-1.5-flash:generateContent";

    fn candidate(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
    }

    async fn summarizer_for(server: &MockServer) -> Summarizer {
        Summarizer::new(&server.uri(), DEFAULT_MODEL).unwrap()
    }

    #[test]
    fn request_serializes_in_gemini_shape() {
        let config = GenerationConfig::default();
        let req = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: Some(&config),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        let summarizer = summarizer_for(&server).await;
        let err = summarizer.summarize("content", "  ").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn formats_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "key-1"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "topK": 40, "maxOutputTokens": 1024 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                "H3 Product Name: Widget\n- Fixed bug\n- Added feature",
            )))
            .mount(&server)
            .await;

        let summary = summarizer_for(&server)
            .await
            .summarize("<p>notes</p>", "key-1")
            .await
            .unwrap();
        assert!(summary.starts_with("<h3>Product Name: Widget</h3>"));
        assert_eq!(summary.matches("<ul>").count(), 1);
    }

    #[tokio::test]
    async fn not_a_changelog_is_an_error_not_a_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                "<h4>NOT A CHANGELOG: This page does not appear to be a valid changelog.</h4>",
            )))
            .mount(&server)
            .await;

        let err = summarizer_for(&server)
            .await
            .summarize("<p>About us</p>", "key")
            .await
            .unwrap_err();
        match err {
            Error::NotAChangelog(message) => assert!(message.contains("NOT A CHANGELOG:")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_error_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let err = summarizer_for(&server)
            .await
            .summarize("x", "bad")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API Error: API key not valid");
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = summarizer_for(&server)
            .await
            .summarize("x", "key")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn empty_candidates_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = summarizer_for(&server)
            .await
            .summarize("x", "key")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn server_error_without_body_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = summarizer_for(&server).await.verify_key("key").await.unwrap_err();
        assert_eq!(err.to_string(), "API returned status code: 503");
    }
}
