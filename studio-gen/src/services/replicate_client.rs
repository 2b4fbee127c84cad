//! Replicate prediction client for talking-avatar video
//!
//! Submits SadTalker predictions and decodes prediction status into
//! [`ProviderResponse`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::job_client::{validate_audio_reference, JobClient, JobClientError};
use crate::models::{GenerationRequest, JobHandle, ProviderResponse};

pub const REPLICATE_BASE_URL: &str = "https://api.replicate.com";
/// SadTalker model version
pub const SADTALKER_VERSION: &str =
    "3aa3dac9353cc4d6bd62a35e0f07d60c854ed5e00c37b2f12f6e6e2a83f1ba5a";
const USER_AGENT: &str = concat!("studio-gen/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    source_image: &'a str,
    driven_audio: &'a str,
    preprocess: &'static str,
    still_mode: bool,
    use_enhancer: bool,
    result_format: &'static str,
}

/// Prediction object as returned by create and get
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Prediction {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Value,
}

/// Map a prediction to the provider-neutral observation
///
/// Unknown or missing status is a malformed response.
pub fn decode_prediction(prediction: &Prediction) -> Result<ProviderResponse, JobClientError> {
    let status = prediction.status.as_deref().unwrap_or_default();

    match status {
        "starting" => Ok(ProviderResponse::Pending),
        "processing" => Ok(ProviderResponse::Running),
        "succeeded" => Ok(ProviderResponse::Succeeded {
            output: output_url(&prediction.output),
        }),
        "failed" => Ok(ProviderResponse::Failed {
            detail: error_text(&prediction.error),
        }),
        "canceled" => Ok(ProviderResponse::Canceled {
            detail: error_text(&prediction.error),
        }),
        "" => Err(JobClientError::Parse("prediction has no status".to_string())),
        other => Err(JobClientError::Parse(format!(
            "unknown prediction status: {}",
            other
        ))),
    }
}

/// Output is either a URL string or a list whose first element is the URL
fn output_url(output: &Value) -> Option<String> {
    let url = match output {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}

fn error_text(error: &Value) -> Option<String> {
    match error {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Replicate API client
pub struct ReplicateClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl ReplicateClient {
    pub fn new(api_token: Option<String>, request_timeout: Duration) -> Result<Self, JobClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| JobClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: REPLICATE_BASE_URL.to_string(),
            api_token: api_token.filter(|t| crate::config::is_valid_key(t)),
        })
    }

    /// Point the client at another host (local fake provider in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn token(&self) -> Result<&str, JobClientError> {
        self.api_token.as_deref().ok_or_else(|| {
            JobClientError::Configuration(
                "Replicate API token not configured (STUDIO_REPLICATE_API_TOKEN)".to_string(),
            )
        })
    }

    /// `{base_url}/v1/predictions[/{id}]`, with the id escaped as one path segment
    fn predictions_url(&self, prediction_id: Option<&str>) -> Result<Url, JobClientError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            JobClientError::Configuration(format!("invalid Replicate base URL: {}", e))
        })?;

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                JobClientError::Configuration(format!(
                    "Replicate base URL cannot hold a path: {}",
                    self.base_url
                ))
            })?;
            segments.pop_if_empty().extend(["v1", "predictions"]);
            if let Some(id) = prediction_id {
                segments.push(id);
            }
        }

        Ok(url)
    }

    async fn read_prediction(response: reqwest::Response) -> Result<Prediction, JobClientError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(JobClientError::Api(status.as_u16(), error_text));
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| JobClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl JobClient for ReplicateClient {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, JobClientError> {
        let token = self.token()?;
        validate_audio_reference(&request.audio_url)?;

        let body = PredictionRequest {
            version: SADTALKER_VERSION,
            input: PredictionInput {
                source_image: &request.source_image,
                driven_audio: request.audio_url.trim(),
                preprocess: "crop",
                still_mode: false,
                use_enhancer: true,
                result_format: "mp4",
            },
        };

        tracing::debug!(
            session_id = %request.session_id,
            item_id = %request.item_id,
            "Submitting Replicate prediction"
        );

        let response = self
            .http_client
            .post(self.predictions_url(None)?)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", token))
            .json(&body)
            .send()
            .await
            .map_err(|e| JobClientError::Network(e.to_string()))?;

        let prediction = Self::read_prediction(response).await?;

        match prediction.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Ok(JobHandle::new(id)),
            None => Err(JobClientError::Parse(
                "prediction created without an id".to_string(),
            )),
        }
    }

    async fn poll(&self, handle: &JobHandle) -> Result<ProviderResponse, JobClientError> {
        let token = self.token()?;

        let response = self
            .http_client
            .get(self.predictions_url(Some(&handle.provider_job_id))?)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", token))
            .send()
            .await
            .map_err(|e| JobClientError::Network(e.to_string()))?;

        let prediction = Self::read_prediction(response).await?;
        decode_prediction(&prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prediction_id_is_one_escaped_segment() {
        let client = ReplicateClient::new(Some("t".into()), Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");

        assert_eq!(
            client.predictions_url(None).unwrap().as_str(),
            "http://127.0.0.1:9/v1/predictions"
        );
        assert_eq!(
            client.predictions_url(Some("abc123")).unwrap().as_str(),
            "http://127.0.0.1:9/v1/predictions/abc123"
        );
        assert_eq!(
            client.predictions_url(Some("a/b?c")).unwrap().as_str(),
            "http://127.0.0.1:9/v1/predictions/a%2Fb%3Fc"
        );
    }

    fn prediction(value: Value) -> Prediction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_in_progress() {
        assert_eq!(
            decode_prediction(&prediction(json!({"id": "p", "status": "starting"}))).unwrap(),
            ProviderResponse::Pending
        );
        assert_eq!(
            decode_prediction(&prediction(json!({"id": "p", "status": "processing"}))).unwrap(),
            ProviderResponse::Running
        );
    }

    #[test]
    fn test_decode_success_shapes() {
        let single = prediction(json!({"status": "succeeded", "output": "https://r/v.mp4"}));
        assert_eq!(
            decode_prediction(&single).unwrap(),
            ProviderResponse::Succeeded {
                output: Some("https://r/v.mp4".into())
            }
        );

        let list = prediction(json!({"status": "succeeded", "output": ["https://r/a.mp4", "x"]}));
        assert_eq!(
            decode_prediction(&list).unwrap(),
            ProviderResponse::Succeeded {
                output: Some("https://r/a.mp4".into())
            }
        );
    }

    #[test]
    fn test_decode_malformed_success_has_no_output() {
        for output in [json!(null), json!(""), json!([]), json!({"video": "x"}), json!([42])] {
            let p = prediction(json!({"status": "succeeded", "output": output}));
            assert_eq!(
                decode_prediction(&p).unwrap(),
                ProviderResponse::Succeeded { output: None }
            );
        }
    }

    #[test]
    fn test_decode_failures() {
        let failed = prediction(json!({"status": "failed", "error": "bad audio"}));
        assert_eq!(
            decode_prediction(&failed).unwrap(),
            ProviderResponse::Failed {
                detail: Some("bad audio".into())
            }
        );

        let canceled = prediction(json!({"status": "canceled", "error": null}));
        assert_eq!(
            decode_prediction(&canceled).unwrap(),
            ProviderResponse::Canceled { detail: None }
        );
    }

    #[test]
    fn test_decode_unknown_status_is_parse_error() {
        let p = prediction(json!({"status": "queued_forever"}));
        assert!(matches!(decode_prediction(&p), Err(JobClientError::Parse(_))));
        let p = prediction(json!({"id": "p"}));
        assert!(matches!(decode_prediction(&p), Err(JobClientError::Parse(_))));
    }

    #[tokio::test]
    async fn test_submit_without_token_fails_fast() {
        let client = ReplicateClient::new(Some("  ".into()), Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert!(!client.is_configured());

        let request = GenerationRequest {
            source_image: "https://img/a.png".into(),
            audio_url: "https://aud/a.mp3".into(),
            session_id: uuid::Uuid::new_v4(),
            item_id: uuid::Uuid::new_v4(),
        };
        let err = client.submit(&request).await.unwrap_err();
        assert!(matches!(err, JobClientError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_submit_data_uri_rejected_before_network() {
        // Port 9 (discard) is never contacted; validation fails first
        let client = ReplicateClient::new(Some("r8_token".into()), Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let request = GenerationRequest {
            source_image: "https://img/a.png".into(),
            audio_url: "data:audio/mp3;base64,AAAA".into(),
            session_id: uuid::Uuid::new_v4(),
            item_id: uuid::Uuid::new_v4(),
        };
        let err = client.submit(&request).await.unwrap_err();
        assert!(matches!(err, JobClientError::Validation(_)));
    }
}
