//! The `terrareg_namespace` resource.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{NamespaceConfigModel, NamespaceModel, TerraregClient, TerraregError};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::types::{ImportedResource, PlanResult};

use super::attribute_changes;

/// Resource type name.
pub const TYPE_NAME: &str = "terrareg_namespace";

/// Namespace state as persisted by the framework.
///
/// `id` tracks the namespace name; `is_auto_verified` and `trusted` are set
/// by the registry and only ever read back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct NamespaceState {
    id: Option<String>,
    name: Option<String>,
    display_name: Option<String>,
    is_auto_verified: Option<bool>,
    trusted: Option<bool>,
}

impl NamespaceState {
    fn config(&self) -> Result<NamespaceConfigModel, ProviderError> {
        Ok(NamespaceConfigModel {
            name: self.require_name()?.to_string(),
            display_name: self.display_name.clone(),
        })
    }

    fn require_name(&self) -> Result<&str, ProviderError> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ProviderError::Validation("namespace name must be set".to_string())
            })
    }

    /// The name to address the namespace with on a Read: the tracked ID when
    /// present (it is authoritative after imports), the name otherwise.
    fn lookup_name(&self) -> Result<&str, ProviderError> {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => Ok(id),
            None => self.require_name(),
        }
    }

    fn apply_remote(&mut self, name: &str, remote: &NamespaceModel) {
        self.name = Some(name.to_string());
        self.id = Some(name.to_string());
        // The registry reports an empty display name as ""
        self.display_name = remote.display_name.clone().filter(|value| !value.is_empty());
        self.is_auto_verified = Some(remote.is_auto_verified);
        self.trusted = Some(remote.trusted);
    }
}

/// Schema for the namespace resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Namespace resource")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("ID of the namespace"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Namespace name"),
        )
        .with_attribute(
            "display_name",
            Attribute::optional_string()
                .with_description("User-friendly Namespace display name"),
        )
        .with_attribute(
            "is_auto_verified",
            Attribute::computed_bool().with_description(
                "Whether new module versions in this namespace are automatically verified",
            ),
        )
        .with_attribute(
            "trusted",
            Attribute::computed_bool()
                .with_description("Whether the namespace is trusted"),
        )
}

/// Plan a namespace change.
///
/// The computed `id` always follows `name`; the registry-set attributes are
/// carried over from prior state so an unchanged namespace plans clean.
pub fn plan(prior: Option<Value>, proposed: Value) -> Result<PlanResult, ProviderError> {
    if proposed.is_null() {
        // Destroy plan
        return Ok(PlanResult::no_change(Value::Null));
    }

    let mut state: NamespaceState = serde_json::from_value(proposed)?;
    if let Some(name) = state.name.clone().filter(|name| !name.is_empty()) {
        state.id = Some(name);
    }

    if let Some(prior_value) = &prior {
        let prior_state: NamespaceState = serde_json::from_value(prior_value.clone())?;
        state.is_auto_verified = state.is_auto_verified.or(prior_state.is_auto_verified);
        state.trusted = state.trusted.or(prior_state.trusted);
    }

    let planned = serde_json::to_value(&state)?;
    let changes = attribute_changes(prior.as_ref(), &planned);
    Ok(PlanResult::with_changes(planned, changes))
}

/// Import a namespace by name.
pub fn import(id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
    if id.is_empty() {
        return Err(ProviderError::Validation(
            "namespace import requires the namespace name as the ID".to_string(),
        ));
    }
    let state = NamespaceState {
        id: Some(id.to_string()),
        name: Some(id.to_string()),
        ..Default::default()
    };
    Ok(vec![ImportedResource::new(
        TYPE_NAME,
        serde_json::to_value(state)?,
    )])
}

/// Adapter performing namespace CRUD against the registry.
pub struct NamespaceResource {
    client: Arc<TerraregClient>,
}

impl NamespaceResource {
    /// Create the adapter with an injected client.
    pub fn new(client: Arc<TerraregClient>) -> Self {
        Self { client }
    }

    /// Create the namespace, then read it back to pick up registry-set
    /// attributes.
    pub async fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut state: NamespaceState = serde_json::from_value(planned)?;
        let config = state.config()?;

        self.client.create_namespace(&config).await?;

        let remote = self.client.get_namespace(&config.name).await?;
        state.apply_remote(&config.name, &remote);
        Ok(serde_json::to_value(state)?)
    }

    /// Read the namespace; a missing namespace drops it from tracked state.
    pub async fn read(&self, current: Value) -> Result<Value, ProviderError> {
        let mut state: NamespaceState = serde_json::from_value(current)?;
        let name = state.lookup_name()?.to_string();

        match self.client.get_namespace(&name).await {
            Ok(remote) => {
                state.apply_remote(&name, &remote);
                Ok(serde_json::to_value(state)?)
            }
            Err(TerraregError::NotFound) => Ok(Value::Null),
            Err(err) => Err(err.into()),
        }
    }

    /// Update the namespace. The URL path addresses the namespace by its
    /// pre-rename name; the body carries the new name as the rename target.
    pub async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let prior_state: NamespaceState = serde_json::from_value(prior)?;
        let mut state: NamespaceState = serde_json::from_value(planned)?;
        let config = state.config()?;

        self.client
            .update_namespace(prior_state.require_name()?, &config)
            .await?;

        let remote = self.client.get_namespace(&config.name).await?;
        state.apply_remote(&config.name, &remote);
        Ok(serde_json::to_value(state)?)
    }

    /// Delete the namespace.
    pub async fn delete(&self, current: Value) -> Result<(), ProviderError> {
        let state: NamespaceState = serde_json::from_value(current)?;
        self.client.delete_namespace(state.require_name()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_create_sets_id_from_name() {
        let result = plan(
            None,
            json!({"name": "moduleteam", "display_name": "Module Team"}),
        )
        .unwrap();

        assert_eq!(result.planned_state["id"], "moduleteam");
        assert!(!result.requires_replace);
        assert!(result
            .changes
            .iter()
            .any(|change| change.path == "name"));
    }

    #[test]
    fn test_plan_rename_is_in_place() {
        let prior = json!({
            "id": "oldname",
            "name": "oldname",
            "display_name": "Old",
            "is_auto_verified": false,
            "trusted": false
        });
        let result = plan(
            Some(prior),
            json!({"name": "newname", "display_name": "Old"}),
        )
        .unwrap();

        assert_eq!(result.planned_state["id"], "newname");
        assert!(!result.requires_replace);
        // Registry-set attributes are carried over, not re-diffed
        assert_eq!(result.planned_state["trusted"], false);
        assert!(result
            .changes
            .iter()
            .all(|change| change.path == "name" || change.path == "id"));
    }

    #[test]
    fn test_plan_no_change() {
        let state = json!({
            "id": "moduleteam",
            "name": "moduleteam",
            "display_name": "Module Team",
            "is_auto_verified": true,
            "trusted": false
        });
        let result = plan(Some(state.clone()), state).unwrap();
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_plan_destroy() {
        let result = plan(Some(json!({"name": "moduleteam"})), Value::Null).unwrap();
        assert_eq!(result.planned_state, Value::Null);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_import_builds_state_from_name() {
        let imported = import("moduleteam").unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, TYPE_NAME);
        assert_eq!(imported[0].state["id"], "moduleteam");
        assert_eq!(imported[0].state["name"], "moduleteam");

        assert!(import("").is_err());
    }
}
