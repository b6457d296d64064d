//! Azure DevOps REST client.
//!
//! A thin typed layer over `reqwest`: every call sends one request, maps the
//! status onto [`DevOpsError`] and decodes the JSON body. Nothing is retried.

mod error;
mod git;
pub mod models;
mod pipelines;
mod policy;
mod threads;

pub use error::DevOpsError;

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// API version of the pull request thread and attachment endpoints.
pub const PULL_REQUEST_API_VERSION: &str = "7.1";

/// How requests authenticate.
#[derive(Clone)]
pub enum Credential {
    /// Personal access token, sent as HTTP Basic with an empty user name.
    Basic(String),
    /// OAuth token such as a pipeline's `System.AccessToken`.
    Bearer(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic(_) => f.write_str("Basic([REDACTED])"),
            Self::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

/// Authenticated Azure DevOps client.
#[derive(Debug, Clone)]
pub struct DevOpsClient {
    http: reqwest::Client,
    credential: Credential,
}

impl DevOpsClient {
    /// Creates a client that authenticates every request with `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`DevOpsError::Http`] if the HTTP client cannot be built.
    pub fn new(credential: Credential) -> Result<Self, DevOpsError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cdk-devops/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, credential })
    }

    /// Returns a client sharing this connection pool that authenticates with
    /// `credential` instead.
    #[must_use]
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            http: self.http.clone(),
            credential,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Credential::Basic(pat) => request.basic_auth("", Some(pat)),
            Credential::Bearer(token) => request.bearer_auth(token),
        }
    }

    /// Sends a request and maps non-success statuses onto [`DevOpsError`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, DevOpsError> {
        let response = self
            .authorize(request)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DevOpsError> {
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, DevOpsError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.http.post(url).json(body)).await?;
        decode(response).await
    }

    async fn patch_json<B, T>(&self, url: Url, body: &B) -> Result<T, DevOpsError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.http.patch(url).json(body)).await?;
        decode(response).await
    }
}

/// Appends path segments and the `api-version` query to `base`.
///
/// Segments are percent-encoded, so repository and pipeline names can be
/// passed as-is.
///
/// # Errors
///
/// Returns [`DevOpsError::InvalidUrl`] if `base` cannot carry a path.
pub fn endpoint(base: &Url, segments: &[&str], api_version: &str) -> Result<Url, DevOpsError> {
    let mut url = join_segments(base, segments)?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

/// Appends percent-encoded path segments to `base`, ignoring a trailing slash.
///
/// # Errors
///
/// Returns [`DevOpsError::InvalidUrl`] if `base` cannot carry a path.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, DevOpsError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|()| DevOpsError::InvalidUrl {
            url: base.to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response, DevOpsError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
        return Err(DevOpsError::Unauthorized {
            status: status.as_u16(),
        });
    }

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(match status {
        StatusCode::FORBIDDEN => DevOpsError::Forbidden { message },
        StatusCode::NOT_FOUND => DevOpsError::NotFound { message },
        StatusCode::CONFLICT => DevOpsError::Conflict { message },
        _ => DevOpsError::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DevOpsError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(DevOpsError::Decode)
}

/// Pulls the `message` field out of an Azure DevOps error body.
fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;
    parsed
        .get("message")
        .and_then(|message| message.as_str())
        .map(ToOwned::to_owned)
}
