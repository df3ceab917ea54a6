use crate::core::admin_client::AdminClient;
use crate::core::order_annotation::NoteMode;
use crate::core::raw_http::RawHttpClient;
use crate::core::submission::Intake;
use crate::utils::constants::{
    DEFAULT_API_VERSION, DEFAULT_MAX_CONCURRENT_UPLOADS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_BURST, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TRUSTED_PROXY_COUNT,
    UPLOAD_PERMIT_WAIT_SECS,
};
use crate::utils::get_env::{lookup_env_var, parse_or};
use crate::utils::urls::{admin_graphql_url, to_origin, to_url};
use anyhow::{Error, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Clone)]
pub struct AppConfig {
    pub admin_endpoint: Url,
    pub admin_token: String,
    pub allowed_origin: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub max_concurrent_uploads: usize,
    pub rate_limit_burst: u32,
    pub trusted_proxy_count: usize,
    pub note_mode: NoteMode,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("admin_endpoint", &self.admin_endpoint.as_str())
            .field("allowed_origin", &self.allowed_origin)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_concurrent_uploads", &self.max_concurrent_uploads)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("trusted_proxy_count", &self.trusted_proxy_count)
            .field("note_mode", &self.note_mode)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(lookup_env_var)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        let admin_token = required("SHOPIFY_ADMIN_API_TOKEN")?;
        let api_version =
            lookup("SHOPIFY_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let admin_endpoint = match lookup("SHOPIFY_ADMIN_URL") {
            Some(raw) => to_url(&raw).map_err(|e| anyhow!("invalid SHOPIFY_ADMIN_URL: {e}"))?,
            None => admin_graphql_url(&required("SHOPIFY_SHOP_DOMAIN")?, &api_version)
                .map_err(|e| anyhow!("invalid SHOPIFY_SHOP_DOMAIN: {e}"))?,
        };
        let allowed_origin = to_origin(&required("ALLOWED_ORIGIN")?)
            .map_err(|e| anyhow!("invalid ALLOWED_ORIGIN: {e}"))?;

        let max_concurrent_uploads =
            parse_or(&lookup, "MAX_CONCURRENT_UPLOADS", DEFAULT_MAX_CONCURRENT_UPLOADS)?;
        if max_concurrent_uploads == 0 {
            return Err(anyhow!("MAX_CONCURRENT_UPLOADS must be at least 1"));
        }
        let note_mode = match lookup("NOTE_MODE") {
            Some(raw) => raw
                .parse::<NoteMode>()
                .map_err(|e| anyhow!("invalid NOTE_MODE: {e}"))?,
            None => NoteMode::default(),
        };

        Ok(Self {
            admin_endpoint,
            admin_token,
            allowed_origin,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_concurrent_uploads,
            rate_limit_burst: parse_or(&lookup, "RATE_LIMIT_BURST", DEFAULT_RATE_LIMIT_BURST)?,
            trusted_proxy_count: parse_or(
                &lookup,
                "TRUSTED_PROXY_COUNT",
                DEFAULT_TRUSTED_PROXY_COUNT,
            )?,
            note_mode,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub intake: Intake,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let http_client = Client::builder().timeout(config.request_timeout).build()?;
        let admin = AdminClient::new(
            http_client,
            config.admin_endpoint.clone(),
            config.admin_token.clone(),
        );
        let raw = RawHttpClient::new(Some(config.request_timeout))?;
        let intake = Intake::new(
            admin,
            raw,
            config.note_mode,
            config.max_concurrent_uploads,
            Duration::from_secs(UPLOAD_PERMIT_WAIT_SECS),
        );
        Ok(Self { config, intake })
    }
}

#[derive(Serialize, Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Serialize, Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Set when the file reached the platform before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}
