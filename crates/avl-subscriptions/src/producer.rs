// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP client for the producer exchange.
//!
//! Both operations POST a SIRI XML document and return the raw response
//! body for the caller to parse. They differ in authentication: subscribe
//! requests carry the subscription's API key as an `x-api-key` header (the
//! system, not the credential holder, originates the call), while terminate
//! requests use HTTP Basic auth with the resolved producer credentials.
//!
//! Each request runs under a bounded timeout so one unresponsive producer
//! cannot starve the rest of the batch.

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::error::{Error, Result};

/// Media type for all SIRI exchanges.
const TEXT_XML: &str = "text/xml";

/// How much of an upstream error body to carry into the error message.
const ERROR_BODY_LIMIT: usize = 256;

/// HTTP client for subscribe/terminate exchanges with producers.
pub struct ProducerClient {
    client: reqwest::Client,
}

impl ProducerClient {
    /// Create a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the underlying HTTP client cannot
    /// be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// POST a `SubscriptionRequest` document, authenticated with the
    /// subscription's API key.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] on network failure or non-2xx status,
    /// [`Error::EmptyResponse`] on a 2xx answer with no body.
    pub async fn subscribe(&self, url: &str, body: String, api_key: &str) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, TEXT_XML)
            .header("x-api-key", api_key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::read_body(url, response).await
    }

    /// POST a `TerminateSubscriptionRequest` document, authenticated with
    /// HTTP Basic auth.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`ProducerClient::subscribe`].
    pub async fn terminate(
        &self,
        url: &str,
        body: String,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, TEXT_XML)
            .basic_auth(username, Some(password))
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::read_body(url, response).await
    }

    /// Classify the response: non-2xx is a transport error carrying the
    /// upstream message, a 2xx with an empty body is its own error.
    async fn read_body(url: &str, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            let mut upstream = response.text().await.unwrap_or_default();
            // Truncate on a char boundary; the limit is in bytes and the
            // body is untrusted UTF-8.
            let mut end = ERROR_BODY_LIMIT.min(upstream.len());
            while !upstream.is_char_boundary(end) {
                end -= 1;
            }
            upstream.truncate(end);
            return Err(Error::Transport(format!(
                "{url} returned {status}: {}",
                upstream.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(Error::EmptyResponse(url.to_string()));
        }
        Ok(body)
    }
}
