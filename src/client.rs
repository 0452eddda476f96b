//! HTTP client for the remote generative endpoints
//!
//! Two endpoints are used: a text model (`:generateContent`) for prompt
//! translation and enhancement, and an image model (`:predict`) for image
//! production. Both are reached with a single [`reqwest::Client`] and an
//! explicit API key from [`ApiConfig`] — credentials are never read from the
//! environment or any other ambient source.
//!
//! The wire schemas here mirror what the endpoints actually accept and
//! return; everything else in the crate works against the
//! [`GenerativeBackend`] trait and never sees these types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::GeneratedImage;

/// Seam between the batch orchestrator and the remote endpoints
///
/// [`GeminiClient`] is the production implementation; tests substitute mocks
/// to exercise batching and retry behavior without a network.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Request up to `count` images for `prompt` in a single endpoint call
    ///
    /// A successful call may legitimately return fewer images than requested,
    /// including none at all.
    async fn produce_images(&self, prompt: &str, count: u32) -> Result<Vec<GeneratedImage>>;

    /// Send one instruction to the text model and return its reply text
    async fn generate_text(&self, instruction: &str) -> Result<String>;
}

/// Client for the Google Generative Language REST API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl GeminiClient {
    /// Create a client from endpoint configuration
    ///
    /// The per-request timeout from [`ApiConfig::request_timeout`] is baked
    /// into the underlying HTTP client.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Build the full URL for a model action, with the API key as a query parameter
    fn endpoint(&self, model: &str, action: &str) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let raw = format!("{base}/models/{model}:{action}");
        let mut url = Url::parse(&raw).map_err(|e| Error::Config {
            message: format!("cannot build endpoint URL from {raw}: {e}"),
            key: Some("api.base_url".to_string()),
        })?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url)
    }

    /// POST a JSON body and decode the JSON response, mapping non-2xx to [`Error::Api`]
    async fn post_json<Req, Resp>(&self, url: Url, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn produce_images(&self, prompt: &str, count: u32) -> Result<Vec<GeneratedImage>> {
        let url = self.endpoint(&self.config.image_model, "predict")?;
        let request = PredictRequest {
            instances: Instance {
                prompt: prompt.to_string(),
            },
            parameters: PredictParameters {
                sample_count: count,
            },
        };

        tracing::debug!(model = %self.config.image_model, requested = count, "requesting image batch");
        let response: PredictResponse = self.post_json(url, &request).await?;

        let images = response
            .predictions
            .into_iter()
            .map(|prediction| GeneratedImage {
                base64_data: prediction.bytes_base64_encoded,
                mime_type: prediction
                    .mime_type
                    .unwrap_or_else(|| "image/png".to_string()),
                batch: 0,
            })
            .collect();
        Ok(images)
    }

    async fn generate_text(&self, instruction: &str) -> Result<String> {
        let url = self.endpoint(&self.config.text_model, "generateContent")?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: instruction.to_string(),
                }],
            }],
        };

        tracing::debug!(model = %self.config.text_model, "requesting text generation");
        let response: GenerateContentResponse = self.post_json(url, &request).await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| {
                Error::MissingContent("response carried no candidate text".to_string())
            })
    }
}

// --- Wire types ---------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// The predict endpoint takes `instances` as a single object, not an array
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Instance,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct Instance {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct PredictParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: String,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}
