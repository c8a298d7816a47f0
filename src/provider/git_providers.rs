//! The `terrareg_git_provider` and `terrareg_git_providers` data sources.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{GitProviderSelector, TerraregClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

/// Single git provider lookup data source type name.
pub const PROVIDER_TYPE_NAME: &str = "terrareg_git_provider";

/// Git provider listing data source type name.
pub const PROVIDERS_TYPE_NAME: &str = "terrareg_git_providers";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LookupConfig {
    id: Option<i64>,
    name: Option<String>,
}

/// Schema for the single git provider lookup.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Data source for obtaining a git provider")
        .with_attribute(
            "id",
            // Computed, but also optional so the user may select by it
            Attribute::new(AttributeType::Int64, AttributeFlags::optional_computed())
                .with_description("Internal ID of the git provider"),
        )
        .with_attribute(
            "name",
            Attribute::new(AttributeType::String, AttributeFlags::optional_computed())
                .with_description("Name of the git provider"),
        )
}

/// Schema for the git provider listing.
pub fn list_schema() -> Schema {
    let mut entry = HashMap::new();
    entry.insert("id".to_string(), AttributeType::Int64);
    entry.insert("name".to_string(), AttributeType::String);

    Schema::v0()
        .with_description("Data source for obtaining all git providers")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Internal ID"),
        )
        .with_attribute(
            "git_providers",
            Attribute::new(
                AttributeType::list(AttributeType::Object(entry)),
                AttributeFlags::computed(),
            )
            .with_description("List of git providers, including id and name"),
        )
}

/// Config-time validation for the lookup data source: id and name conflict.
pub fn validate_lookup(config: &Value) -> Vec<Diagnostic> {
    let id_set = config.get("id").is_some_and(|v| !v.is_null());
    let name_set = config.get("name").is_some_and(|v| !v.is_null());
    if id_set && name_set {
        vec![Diagnostic::error("Invalid attribute combination")
            .with_detail("'id' and 'name' cannot both be set for terrareg_git_provider")
            .with_attribute("id")]
    } else {
        Vec::new()
    }
}

/// Adapter for looking up a single git provider by id or name.
pub struct GitProviderDataSource {
    client: Arc<TerraregClient>,
}

impl GitProviderDataSource {
    /// Create the adapter with an injected client.
    pub fn new(client: Arc<TerraregClient>) -> Self {
        Self { client }
    }

    /// Resolve the configured criteria against the registry's provider list.
    ///
    /// Selector construction validates the id/name combination before any
    /// request is issued; the scan itself is client-side, first match wins.
    pub async fn read(&self, config: Value) -> Result<Value, ProviderError> {
        let config: LookupConfig = serde_json::from_value(config)?;
        let selector = GitProviderSelector::new(config.id, config.name)?;

        let found = self
            .client
            .find_git_provider(&selector)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(
                    "unable to find git provider with matching details".to_string(),
                )
            })?;

        Ok(json!({"id": found.id, "name": found.name}))
    }
}

/// Adapter for listing every git provider.
pub struct GitProvidersDataSource {
    client: Arc<TerraregClient>,
}

impl GitProvidersDataSource {
    /// Create the adapter with an injected client.
    pub fn new(client: Arc<TerraregClient>) -> Self {
        Self { client }
    }

    /// Fetch the full listing. The `id` is synthetic; the framework requires
    /// one for every data source.
    pub async fn read(&self, _config: Value) -> Result<Value, ProviderError> {
        let providers = self.client.get_git_providers().await?;
        Ok(json!({"id": "this", "git_providers": providers}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_client(server: &MockServer) -> Arc<TerraregClient> {
        Arc::new(TerraregClient::new(server.uri(), None).unwrap())
    }

    async fn mock_listing(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/terrareg/git_providers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Github"},
                {"id": 2, "name": "Bitbucket"},
                {"id": 3, "name": "Gitlab"}
            ])))
            .mount(server)
            .await;
    }

    #[test]
    fn test_validate_lookup_conflicting() {
        let diagnostics = validate_lookup(&json!({"id": 1, "name": "Github"}));
        assert_eq!(diagnostics.len(), 1);

        assert!(validate_lookup(&json!({"id": 1, "name": null})).is_empty());
        assert!(validate_lookup(&json!({"name": "Github"})).is_empty());
        assert!(validate_lookup(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_lookup_by_name() {
        let server = MockServer::start().await;
        mock_listing(&server).await;

        let state = GitProviderDataSource::new(mock_client(&server))
            .read(json!({"name": "Gitlab"}))
            .await
            .unwrap();
        assert_eq!(state, json!({"id": 3, "name": "Gitlab"}));
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let server = MockServer::start().await;
        mock_listing(&server).await;

        let state = GitProviderDataSource::new(mock_client(&server))
            .read(json!({"id": 2}))
            .await
            .unwrap();
        assert_eq!(state, json!({"id": 2, "name": "Bitbucket"}));
    }

    #[tokio::test]
    async fn test_lookup_criteria_validated_before_any_request() {
        let server = MockServer::start().await;
        // Expect no traffic at all for invalid criteria
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let source = GitProviderDataSource::new(mock_client(&server));

        let err = source
            .read(json!({"id": 1, "name": "Github"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));

        let err = source.read(json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lookup_no_match() {
        let server = MockServer::start().await;
        mock_listing(&server).await;

        let err = GitProviderDataSource::new(mock_client(&server))
            .read(json!({"name": "Gitea"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing() {
        let server = MockServer::start().await;
        mock_listing(&server).await;

        let state = GitProvidersDataSource::new(mock_client(&server))
            .read(json!({}))
            .await
            .unwrap();
        assert_eq!(state["id"], "this");
        assert_eq!(state["git_providers"].as_array().unwrap().len(), 3);
        assert_eq!(state["git_providers"][2], json!({"id": 3, "name": "Gitlab"}));
    }

    #[tokio::test]
    async fn test_listing_propagates_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/terrareg/git_providers"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = GitProvidersDataSource::new(mock_client(&server))
            .read(json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
