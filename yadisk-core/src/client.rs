use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::listing::Listing;

pub const DEFAULT_BASE_URL: &str = "https://cloud-api.yandex.net";
const PUBLIC_RESOURCES_PATH: &str = "/v1/disk/public/resources";

#[derive(Debug, Error)]
pub enum PublicApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    NotFound,
    RateLimit,
    Transient,
    Permanent,
}

/// Client for the unauthenticated `public/resources` endpoint.
#[derive(Clone)]
pub struct PublicClient {
    http: Client,
    base_url: Url,
    request_timeout: Option<Duration>,
}

impl PublicClient {
    pub fn new() -> Result<Self, PublicApiError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, PublicApiError> {
        Self::with_http(Client::new(), base_url)
    }

    pub fn with_http(http: Client, base_url: &str) -> Result<Self, PublicApiError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            request_timeout: None,
        })
    }

    /// Applies a per-request timeout to every listing call.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Fetches one listing page of `path` inside the share identified by
    /// `public_key`.
    pub async fn list(
        &self,
        public_key: &str,
        path: &str,
        offset: u32,
        limit: Option<u32>,
    ) -> Result<Listing, PublicApiError> {
        let url = self.listing_url(public_key, path, offset, limit)?;
        let mut request = self.http.get(url);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        let payload: Value = Self::handle_response(response).await?;
        Ok(Listing::from_value(payload, offset))
    }

    pub fn listing_url(
        &self,
        public_key: &str,
        path: &str,
        offset: u32,
        limit: Option<u32>,
    ) -> Result<Url, PublicApiError> {
        let mut url = self.endpoint(PUBLIC_RESOURCES_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("public_key", public_key)
                .append_pair("path", path)
                .append_pair("offset", &offset.to_string());
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, PublicApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PublicApiError> {
        if response.status().is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(PublicApiError::Api { status, body })
        }
    }
}

impl PublicApiError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            PublicApiError::Api { status, .. } => Some(classify_api_status(*status)),
            PublicApiError::Request(err) if err.is_timeout() || err.is_connect() => {
                Some(ApiErrorClass::Transient)
            }
            _ => None,
        }
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if status == StatusCode::NOT_FOUND {
        ApiErrorClass::NotFound
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::CONFLICT | StatusCode::TOO_EARLY
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}
