use crate::core::error::IntakeError;
use reqwest::{Client, Method, redirect::Policy};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-shot HTTP client for pre-signed upload URLs: no redirects, no
/// retries, the full response body is buffered before returning.
#[derive(Debug, Clone)]
pub struct RawHttpClient {
    client: Client,
}

impl RawHttpClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, IntakeError> {
        let mut builder = Client::builder().redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub async fn send(
        &self,
        url: &str,
        method: Method,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, IntakeError> {
        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
