use crate::core::error::IntakeError;
use crate::core::operations::AdminOperation;
use crate::utils::constants::SHOPIFY_TOKEN_HEADER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

#[derive(Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: &'a V,
}

#[derive(Deserialize)]
struct GraphqlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

/// Admin GraphQL client bound to one shop and one static access token.
#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl AdminClient {
    pub fn new(http: Client, endpoint: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            endpoint,
            token: token.into(),
        }
    }

    pub async fn execute<Op: AdminOperation>(
        &self,
        variables: &Op::Variables,
    ) -> Result<Op::Data, IntakeError> {
        let start = std::time::Instant::now();
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(SHOPIFY_TOKEN_HEADER, &self.token)
            .json(&GraphqlRequest {
                query: Op::QUERY,
                variables,
            })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(
            operation = Op::NAME,
            status = status.as_u16(),
            "admin call finished in {:?}",
            start.elapsed()
        );

        if !status.is_success() {
            return Err(IntakeError::RemoteStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: GraphqlResponse<Op::Data> = serde_json::from_str(&text)?;
        if !envelope.errors.is_empty() {
            let message = envelope
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(IntakeError::remote_validation("query", message));
        }

        envelope.data.ok_or_else(|| {
            IntakeError::remote_validation(Op::NAME, "response contained no data")
        })
    }
}
