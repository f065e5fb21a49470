use crate::geo::LatLng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid store url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
}

/// Wire shape of one location on every store endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<LatLng> for LocationPayload {
    fn from(position: LatLng) -> Self {
        Self {
            latitude: position.lat,
            longitude: position.lng,
        }
    }
}

impl From<LocationPayload> for LatLng {
    fn from(payload: LocationPayload) -> Self {
        LatLng::new(payload.latitude, payload.longitude)
    }
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// Outcome of a mutating store call. Non-success statuses still carry the
/// store's message (e.g. a duplicate save answers 400 "Location already exists").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReply {
    pub status: StatusCode,
    pub message: String,
}

impl StoreReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[derive(Clone)]
pub struct StoreClient {
    base_url: Url,
    http: Client,
}

impl StoreClient {
    /// Builds a client; with `timeout` unset requests wait as long as the store takes.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::Build)?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, ClientError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|source| ClientError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    pub async fn get_locations(&self) -> Result<Vec<LatLng>, ClientError> {
        let url = self.endpoint("get_locations")?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        let payload: Vec<LocationPayload> =
            response.json().await.map_err(|source| ClientError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(payload.into_iter().map(LatLng::from).collect())
    }

    pub async fn save_location(&self, position: LatLng) -> Result<StoreReply, ClientError> {
        self.post_message("save_location", Some(LocationPayload::from(position)))
            .await
    }

    pub async fn remove_location(&self, position: LatLng) -> Result<StoreReply, ClientError> {
        self.post_message("remove_location", Some(LocationPayload::from(position)))
            .await
    }

    pub async fn clear_all(&self) -> Result<StoreReply, ClientError> {
        self.post_message("clear_all", None).await
    }

    async fn post_message(
        &self,
        path: &str,
        body: Option<LocationPayload>,
    ) -> Result<StoreReply, ClientError> {
        let url = self.endpoint(path)?;
        let mut request = self.http.post(url.clone());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })?;

        let message = match serde_json::from_slice::<MessageBody>(&bytes) {
            Ok(body) => body.message,
            Err(_) => String::from_utf8_lossy(&bytes).trim().to_string(),
        };
        Ok(StoreReply { status, message })
    }
}
