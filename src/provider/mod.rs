//! The Terrareg provider: resource and data-source adapters.
//!
//! [`TerraregProvider`] implements [`ProviderService`] by dispatching on the
//! resource/data-source type name. The [`TerraregClient`] is built once at
//! `configure` time and injected into each adapter at construction; adapters
//! never discover it through the request context.

use std::sync::{Arc, RwLock};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::TerraregClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation;

pub mod git_providers;
pub mod module;
pub mod namespace;

pub use git_providers::{GitProviderDataSource, GitProvidersDataSource};
pub use module::ModuleResource;
pub use namespace::NamespaceResource;

/// Provider configuration block.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderConfig {
    url: Option<String>,
    api_key: Option<String>,
}

/// The Terrareg provider.
#[derive(Debug, Default)]
pub struct TerraregProvider {
    client: RwLock<Option<Arc<TerraregClient>>>,
}

impl TerraregProvider {
    /// Create an unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<Arc<TerraregClient>, ProviderError> {
        self.client
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or_else(|| {
                ProviderError::Configuration("the provider has not been configured".to_string())
            })
    }

    fn provider_config_schema() -> Schema {
        Schema::v0()
            .with_description("Interact with a Terrareg module registry")
            .with_attribute(
                "url",
                Attribute::required_string()
                    .with_description("Terrareg url (e.g. https://terrareg.example.com)"),
            )
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(
                        "API key for authenticating to Terrareg \
                         (currently supports the admin auth token)",
                    ),
            )
    }
}

#[async_trait::async_trait]
impl ProviderService for TerraregProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(Self::provider_config_schema())
            .with_resource(namespace::TYPE_NAME, namespace::schema())
            .with_resource(module::TYPE_NAME, module::schema())
            .with_data_source(git_providers::PROVIDER_TYPE_NAME, git_providers::schema())
            .with_data_source(
                git_providers::PROVIDERS_TYPE_NAME,
                git_providers::list_schema(),
            )
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&Self::provider_config_schema(), &config);
        if let Some("") = config.get("url").and_then(Value::as_str) {
            diagnostics.push(missing_url_diagnostic());
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config: ProviderConfig = serde_json::from_value(config)?;

        let url = match config.url.filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => return Ok(vec![missing_url_diagnostic()]),
        };

        debug!("creating Terrareg client");
        let client = TerraregClient::new(url, config.api_key).map_err(|err| {
            ProviderError::Configuration(format!("unable to create Terrareg API client: {err}"))
        })?;

        if let Ok(mut guard) = self.client.write() {
            *guard = Some(Arc::new(client));
        }
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schemas = self.schema();
        let schema = schemas
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;

        let mut diagnostics = validation::validate(schema, &config);
        if resource_type == module::TYPE_NAME {
            diagnostics.extend(module::validate_identity(&config));
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        match resource_type {
            namespace::TYPE_NAME => namespace::plan(prior_state, proposed_state),
            module::TYPE_NAME => module::plan(prior_state, proposed_state),
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            namespace::TYPE_NAME => {
                NamespaceResource::new(self.client()?)
                    .create(planned_state)
                    .await
            }
            module::TYPE_NAME => {
                ModuleResource::new(self.client()?)
                    .create(planned_state)
                    .await
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            namespace::TYPE_NAME => {
                NamespaceResource::new(self.client()?)
                    .read(current_state)
                    .await
            }
            module::TYPE_NAME => {
                ModuleResource::new(self.client()?)
                    .read(current_state)
                    .await
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            namespace::TYPE_NAME => {
                NamespaceResource::new(self.client()?)
                    .update(prior_state, planned_state)
                    .await
            }
            module::TYPE_NAME => {
                ModuleResource::new(self.client()?)
                    .update(prior_state, planned_state)
                    .await
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        match resource_type {
            namespace::TYPE_NAME => {
                NamespaceResource::new(self.client()?)
                    .delete(current_state)
                    .await
            }
            module::TYPE_NAME => {
                ModuleResource::new(self.client()?)
                    .delete(current_state)
                    .await
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        match resource_type {
            namespace::TYPE_NAME => namespace::import(id),
            module::TYPE_NAME => module::import(id),
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schemas = self.schema();
        let schema = schemas
            .data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))?;

        let mut diagnostics = validation::validate(schema, &config);
        if data_source_type == git_providers::PROVIDER_TYPE_NAME {
            diagnostics.extend(git_providers::validate_lookup(&config));
        }
        Ok(diagnostics)
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        match data_source_type {
            git_providers::PROVIDER_TYPE_NAME => {
                GitProviderDataSource::new(self.client()?).read(config).await
            }
            git_providers::PROVIDERS_TYPE_NAME => {
                GitProvidersDataSource::new(self.client()?).read(config).await
            }
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }
}

fn missing_url_diagnostic() -> Diagnostic {
    Diagnostic::error("Missing Url")
        .with_detail(
            "The provider must be configured with a non-empty Terrareg URL. \
             Set the url value in the provider configuration.",
        )
        .with_attribute("url")
}

/// Diff two state documents attribute by attribute.
///
/// Keys are compared at the top level only; all Terrareg schemas are flat.
/// `serde_json` maps iterate in key order, so the change list is
/// deterministic.
pub(crate) fn attribute_changes(prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    let planned_obj = match planned.as_object() {
        Some(obj) => obj,
        None => return Vec::new(),
    };
    let prior_obj = prior.and_then(Value::as_object);

    let mut changes = Vec::new();
    for (key, after) in planned_obj {
        match prior_obj.and_then(|obj| obj.get(key)) {
            None => {
                if !after.is_null() {
                    changes.push(AttributeChange::added(key, after.clone()));
                }
            }
            Some(before) if before != after => {
                changes.push(AttributeChange::modified(key, before.clone(), after.clone()));
            }
            Some(_) => {}
        }
    }
    if let Some(prior_obj) = prior_obj {
        for (key, before) in prior_obj {
            if !planned_obj.contains_key(key) && !before.is_null() {
                changes.push(AttributeChange::removed(key, before.clone()));
            }
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_changes_added_modified_removed() {
        let prior = json!({"name": "one", "display_name": "One", "stale": "x"});
        let planned = json!({"name": "two", "display_name": "One", "fresh": "y"});

        let changes = attribute_changes(Some(&prior), &planned);
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["fresh", "name", "stale"]);

        assert_eq!(changes[0].before, None);
        assert_eq!(changes[1].before, Some(json!("one")));
        assert_eq!(changes[1].after, Some(json!("two")));
        assert_eq!(changes[2].after, None);
    }

    #[test]
    fn test_attribute_changes_no_prior() {
        let planned = json!({"name": "one", "id": null});
        let changes = attribute_changes(None, &planned);
        // Null-valued planned attributes are not reported as additions
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "name");
    }

    #[test]
    fn test_attribute_changes_identical() {
        let state = json!({"name": "one", "display_name": "One"});
        assert!(attribute_changes(Some(&state), &state).is_empty());
    }

    #[test]
    fn test_schema_lists_all_types() {
        let provider = TerraregProvider::new();
        let schema = provider.schema();
        assert!(schema.resources.contains_key("terrareg_namespace"));
        assert!(schema.resources.contains_key("terrareg_module"));
        assert!(schema.data_sources.contains_key("terrareg_git_provider"));
        assert!(schema.data_sources.contains_key("terrareg_git_providers"));
        assert!(schema.provider.block.attributes.contains_key("url"));
        assert!(schema.provider.block.attributes["api_key"].flags.sensitive);
    }

    #[tokio::test]
    async fn test_operations_require_configuration() {
        let provider = TerraregProvider::new();
        let err = provider
            .read("terrareg_namespace", json!({"id": "x", "name": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_rejects_missing_url() {
        let provider = TerraregProvider::new();

        let diagnostics = provider.configure(json!({})).await.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing Url");

        let diagnostics = provider.configure(json!({"url": ""})).await.unwrap();
        assert_eq!(diagnostics.len(), 1);

        // Still unconfigured afterwards
        assert!(provider.client().is_err());
    }

    #[tokio::test]
    async fn test_configure_builds_client() {
        let provider = TerraregProvider::new();
        let diagnostics = provider
            .configure(json!({"url": "https://terrareg.example.com", "api_key": "key"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
        assert!(provider.client().is_ok());
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = TerraregProvider::new();
        let err = provider
            .plan("terrareg_widget", None, json!({}), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }
}
