use async_trait::async_trait;
use base64::Engine;
use expensa_core::{schema, Candidate, FunctionCall, GenerateResponse, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::ModelConfig;
use crate::model::{GenerativeModel, ModelError};

/// Gemini `generateContent` over REST.
///
/// In function-calling mode (the default) every request declares the
/// `addReceipt` function built from the receipt parameter table; with
/// [`GeminiModel::without_tools`] the model answers in free text.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    http: Client,
    config: ModelConfig,
    function_calling: bool,
}

impl GeminiModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            function_calling: true,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Drop the function declaration from requests.
    pub fn without_tools(mut self) -> Self {
        self.function_calling = false;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, self.config.model
        )
    }

    pub(crate) fn request_body(&self, image_jpeg: &[u8], instruction: &str) -> Value {
        let data = base64::engine::general_purpose::STANDARD.encode(image_jpeg);
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": "image/jpeg", "data": data } },
                    { "text": instruction },
                ],
            }],
        });
        if self.function_calling {
            body["tools"] = json!([{ "function_declarations": [schema::function_declaration()] }]);
        }
        body
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(
        &self,
        image_jpeg: &[u8],
        instruction: &str,
    ) -> Result<GenerateResponse, ModelError> {
        let body = self.request_body(image_jpeg, instruction);

        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network {
                context: format!("Cannot reach Gemini at {}", self.config.endpoint),
                source: e,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ModelError::Network {
            context: "Failed to read Gemini response body".into(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }
        decode_response(&text)
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
}

#[derive(Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    function_call: Option<WireFunctionCall>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl From<WirePart> for Part {
    fn from(part: WirePart) -> Self {
        if let Some(call) = part.function_call {
            return Part::FunctionCall(FunctionCall { name: call.name, args: call.args });
        }
        if let Some(text) = part.text {
            return Part::Text(text);
        }
        let kind = part.rest.keys().next().cloned().unwrap_or_else(|| "empty".into());
        Part::Other(kind)
    }
}

pub(crate) fn decode_response(body: &str) -> Result<GenerateResponse, ModelError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::InvalidResponse(format!("undecodable body: {e}")))?;

    let candidates = wire
        .candidates
        .into_iter()
        .map(|c| Candidate {
            parts: c
                .content
                .map(|content| content.parts.into_iter().map(Part::from).collect())
                .unwrap_or_default(),
        })
        .collect();

    Ok(GenerateResponse { candidates })
}

pub(crate) fn api_error(status: u16, body: &str) -> ModelError {
    let message = match serde_json::from_str::<WireErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.status.is_empty() => envelope.error.message,
        Ok(envelope) => format!("{} ({})", envelope.error.message, envelope.error.status),
        Err(_) => body.trim().to_string(),
    };
    ModelError::Api { status, message }
}
