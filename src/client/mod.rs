//! HTTP client for the Terrareg registry API.
//!
//! [`TerraregClient`] owns the transport concerns: endpoint URL synthesis,
//! standard headers (including the optional `X-Terrareg-ApiKey`), JSON body
//! handling and status-code classification. The per-entity accessors live in
//! the submodules and are implemented as methods on the client.
//!
//! Every request is a single blocking round trip from the caller's point of
//! view. There are no retries and no timeout beyond the transport default.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub mod git_provider;
pub mod module;
pub mod namespace;

pub use git_provider::{GitProviderModel, GitProviderSelector};
pub use module::{ModuleId, ModuleModel, ModuleUpdateModel};
pub use namespace::{NamespaceConfigModel, NamespaceModel};

/// Header used to authenticate against Terrareg.
pub const API_KEY_HEADER: &str = "X-Terrareg-ApiKey";

/// Errors returned by the Terrareg API client.
#[derive(Debug, Error)]
pub enum TerraregError {
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API rejected the configured credentials (HTTP 401).
    #[error("invalid authentication")]
    InvalidAuth,

    /// The API refused the operation for these credentials (HTTP 403).
    #[error("unauthorized")]
    Unauthorized,

    /// The requested entity does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// The registry failed internally (HTTP 500-503).
    #[error("server error (status {status})")]
    Server {
        /// The HTTP status code returned by the registry.
        status: u16,
    },

    /// Any other unexpected HTTP response.
    #[error("unknown HTTP response (status {status})")]
    UnknownResponse {
        /// The HTTP status code returned by the registry.
        status: u16,
    },

    /// A 200 response carried a body that did not match the expected shape.
    #[error("unable to decode {context} from response body: {source}")]
    Decode {
        /// What was being decoded, for the error message.
        context: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A module ID did not split into exactly namespace/name/provider.
    #[error("invalid module ID {0:?}: expected \"namespace/name/provider\"")]
    InvalidId(String),

    /// A caller-side validation failure, raised before any request is made.
    #[error("{0}")]
    Validation(String),
}

/// Client for the Terrareg API.
///
/// Cheap to clone; the underlying connection pool is shared between clones.
#[derive(Debug, Clone)]
pub struct TerraregClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl TerraregClient {
    /// Create a client for the registry at `url`.
    ///
    /// The URL must be non-empty; a trailing slash is tolerated. An empty
    /// API key is treated the same as no API key.
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, TerraregError> {
        let url = url.into();
        if url.is_empty() {
            return Err(TerraregError::Validation(
                "Terrareg URL must not be empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!(
                "terraform-provider-terrareg/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }

    /// The configured registry base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/v1/terrareg/{}", self.url, endpoint)
    }

    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        match &self.api_key {
            Some(key) => req.header(API_KEY_HEADER, key),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, TerraregError> {
        let res = self.apply_headers(req).send().await?;
        classify_status(res.status())?;
        Ok(res)
    }

    pub(crate) async fn get(&self, endpoint: &str) -> Result<Response, TerraregError> {
        debug!(endpoint, "GET");
        self.send(self.http.get(self.api_url(endpoint))).await
    }

    pub(crate) async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, TerraregError> {
        debug!(endpoint, "POST");
        self.send(self.http.post(self.api_url(endpoint)).json(body))
            .await
    }

    pub(crate) async fn delete(&self, endpoint: &str) -> Result<Response, TerraregError> {
        debug!(endpoint, "DELETE");
        self.send(self.http.delete(self.api_url(endpoint))).await
    }

    pub(crate) async fn delete_with_body<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, TerraregError> {
        debug!(endpoint, "DELETE");
        self.send(self.http.delete(self.api_url(endpoint)).json(body))
            .await
    }
}

/// Map a response status onto the client error taxonomy.
///
/// Applied uniformly after every request, regardless of which accessor
/// issued it.
fn classify_status(status: StatusCode) -> Result<(), TerraregError> {
    match status.as_u16() {
        200 => Ok(()),
        401 => Err(TerraregError::InvalidAuth),
        403 => Err(TerraregError::Unauthorized),
        404 => Err(TerraregError::NotFound),
        status @ 500..=503 => Err(TerraregError::Server { status }),
        status => Err(TerraregError::UnknownResponse { status }),
    }
}

/// Decode a 200 response body, reporting failures as [`TerraregError::Decode`].
pub(crate) async fn decode_body<T: DeserializeOwned>(
    res: Response,
    context: &'static str,
) -> Result<T, TerraregError> {
    let body = res.text().await?;
    serde_json::from_str(&body).map_err(|source| TerraregError::Decode { context, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK).is_ok());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            Err(TerraregError::InvalidAuth)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            Err(TerraregError::Unauthorized)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            Err(TerraregError::NotFound)
        ));
        for status in 500..=503u16 {
            assert!(matches!(
                classify_status(StatusCode::from_u16(status).unwrap()),
                Err(TerraregError::Server { status: s }) if s == status
            ));
        }
        assert!(matches!(
            classify_status(StatusCode::IM_A_TEAPOT),
            Err(TerraregError::UnknownResponse { status: 418 })
        ));
    }

    #[test]
    fn test_api_url() {
        let client = TerraregClient::new("https://terrareg.example.com", None).unwrap();
        assert_eq!(
            client.api_url("namespaces"),
            "https://terrareg.example.com/v1/terrareg/namespaces"
        );

        // Trailing slash must not produce a double slash
        let client = TerraregClient::new("https://terrareg.example.com/", None).unwrap();
        assert_eq!(
            client.api_url("git_providers"),
            "https://terrareg.example.com/v1/terrareg/git_providers"
        );
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(matches!(
            TerraregClient::new("", None),
            Err(TerraregError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_api_key_header_sent_when_configured() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/terrareg/git_providers"))
            .and(header(API_KEY_HEADER, "secret-key"))
            .and(header("Content-Type", "application/json"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = TerraregClient::new(server.uri(), Some("secret-key".to_string())).unwrap();
        client.get("git_providers").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_api_key_not_sent() {
        let server = MockServer::start().await;

        // The mock only matches requests without the API key header.
        Mock::given(method("GET"))
            .and(path("/v1/terrareg/git_providers"))
            .and(wiremock::matchers::header_exists(API_KEY_HEADER))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/terrareg/git_providers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = TerraregClient::new(server.uri(), Some(String::new())).unwrap();
        client.get("git_providers").await.unwrap();
    }

    #[tokio::test]
    async fn test_status_classification_is_accessor_independent() {
        // Every accessor goes through the same classification; exercise it
        // end-to-end for each classified status.
        let cases = [
            (401u16, "invalid authentication"),
            (403, "unauthorized"),
            (500, "server error (status 500)"),
            (501, "server error (status 501)"),
            (502, "server error (status 502)"),
            (503, "server error (status 503)"),
        ];

        for (status, message) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let client = TerraregClient::new(server.uri(), None).unwrap();
            let err = client.get("namespaces/anything").await.unwrap_err();
            assert_eq!(err.to_string(), message, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Nothing listens on this port; reqwest fails before any status
        // classification can apply.
        let client = TerraregClient::new("http://127.0.0.1:1", None).unwrap();
        let err = client.get("namespaces").await.unwrap_err();
        assert!(matches!(err, TerraregError::Transport(_)));
    }
}
