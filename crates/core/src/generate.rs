use crate::error::GenerateError;
use crate::traits::Generate;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Decoding constraints handed to the summarization mode. Deterministic:
/// beam search, no sampling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SummaryConstraints {
    pub max_len: usize,
    pub min_len: usize,
    pub no_repeat_ngram: usize,
    pub num_beams: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
enum GenerateRequest<'a> {
    Summarize {
        text: &'a str,
        max_length: usize,
        min_length: usize,
        no_repeat_ngram_size: usize,
        num_beams: usize,
    },
    Answer {
        context: &'a str,
        question: &'a str,
    },
    Explain {
        context: &'a str,
        instruction: &'a str,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    text: Option<String>,
}

/// Client for a remote text-generation endpoint speaking a small JSON
/// protocol: one POST per call, optional bearer auth, `{"text": ...}` back.
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    async fn dispatch(&self, payload: &GenerateRequest<'_>) -> Result<String, GenerateError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GenerateError::BackendResponse {
                backend: "generator".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: GenerateResponse = response.json().await?;
        match payload.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerateError::EmptyOutput),
        }
    }
}

#[async_trait]
impl Generate for HttpGenerator {
    async fn summarize(
        &self,
        text: &str,
        constraints: &SummaryConstraints,
    ) -> Result<String, GenerateError> {
        self.dispatch(&GenerateRequest::Summarize {
            text,
            max_length: constraints.max_len,
            min_length: constraints.min_len,
            no_repeat_ngram_size: constraints.no_repeat_ngram,
            num_beams: constraints.num_beams,
        })
        .await
    }

    async fn answer(&self, context: &str, question: &str) -> Result<String, GenerateError> {
        self.dispatch(&GenerateRequest::Answer { context, question })
            .await
    }

    async fn explain(&self, context: &str, instruction: &str) -> Result<String, GenerateError> {
        self.dispatch(&GenerateRequest::Explain {
            context,
            instruction,
        })
        .await
    }
}
