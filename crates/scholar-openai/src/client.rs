// SPDX-FileCopyrightText: 2026 Scholar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI Assistants v2 API.
//!
//! Provides [`OpenAiClient`] which handles authentication, JSON and multipart
//! requests, transient error retry, and classification of failures into
//! [`ScholarError::EngineUnavailable`] and [`ScholarError::EngineRejected`].

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use scholar_core::ScholarError;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, FileObject};

/// HTTP client for OpenAI API communication.
///
/// Retries once on transient statuses (429 other than quota exhaustion, 500,
/// 502, 503, 504) and on transport failures.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// `base_url` is the API root without a trailing slash (`https://api.openai.com/v1`).
    pub fn new(
        api_key: &SecretString,
        base_url: &str,
        request_timeout: Duration,
    ) -> Result<Self, ScholarError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| ScholarError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ScholarError::EngineUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the delay between retry attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ScholarError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        self.send(path, || self.client.post(&url).json(body)).await
    }

    /// GET and decode the JSON response.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ScholarError> {
        let url = self.url(path);
        self.send(path, || self.client.get(&url)).await
    }

    /// Upload file bytes with `purpose=assistants`.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<FileObject, ScholarError> {
        let url = self.url("/files");
        self.send("/files", || {
            let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.to_string());
            let form = reqwest::multipart::Form::new()
                .text("purpose", "assistants")
                .part("file", part);
            self.client.post(&url).multipart(form)
        })
        .await
    }

    /// Send a request built by `build`, retrying transient failures.
    async fn send<R, F>(&self, path: &str, build: F) -> Result<R, ScholarError>
    where
        R: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(path, attempt, "retrying request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = match build().send().await {
                Ok(response) => response,
                Err(e) => {
                    let err = ScholarError::EngineUnavailable {
                        message: format!("HTTP request to {path} failed: {e}"),
                        source: Some(Box::new(e)),
                    };
                    if attempt < self.max_retries {
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            debug!(path, status = %status, attempt, "response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| ScholarError::EngineUnavailable {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| ScholarError::EngineUnavailable {
                    message: format!("failed to parse response from {path}: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let api_err = serde_json::from_str::<ApiErrorResponse>(&body).ok();
            let err = classify_error(status, api_err.as_ref(), &body);

            if err.is_transient() && attempt < self.max_retries {
                warn!(path, status = %status, "transient error, will retry");
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error.unwrap_or_else(|| ScholarError::unavailable("request failed after retries")))
    }
}

/// Map a non-2xx response onto the engine error taxonomy.
///
/// Quota exhaustion (429 `insufficient_quota`) and every other 4xx are terminal;
/// remaining 429s, 408, and 5xx are worth retrying later.
pub fn classify_error(
    status: StatusCode,
    api_err: Option<&ApiErrorResponse>,
    raw_body: &str,
) -> ScholarError {
    let detail = match api_err {
        Some(resp) => {
            let kind = resp
                .error
                .code
                .as_deref()
                .or(resp.error.type_.as_deref())
                .unwrap_or("error");
            format!("OpenAI API error {status} ({kind}): {}", resp.error.message)
        }
        None => format!("OpenAI API returned {status}: {raw_body}"),
    };

    let quota_exhausted = api_err.is_some_and(|resp| {
        resp.error.code.as_deref() == Some("insufficient_quota")
            || resp.error.type_.as_deref() == Some("insufficient_quota")
    });

    if is_transient_error(status) && !quota_exhausted {
        ScholarError::unavailable(detail)
    } else {
        ScholarError::EngineRejected { message: detail }
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}
