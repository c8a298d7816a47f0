//! The `terrareg_module` resource.
//!
//! A module is identified by the composite `namespace/name/provider` key.
//! The `id` attribute tracks that key: it is computed at plan time when all
//! three components are known, parsed back into its components on reads that
//! only have an ID (imports), and recomputed client-side on renames since
//! the settings endpoint does not echo one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ModuleId, ModuleModel, ModuleUpdateModel, TerraregClient, TerraregError};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::{ImportedResource, PlanResult};

use super::attribute_changes;

/// Resource type name.
pub const TYPE_NAME: &str = "terrareg_module";

/// Module state as persisted by the framework.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ModuleState {
    id: Option<String>,
    namespace: Option<String>,
    name: Option<String>,
    provider_name: Option<String>,
    git_provider_id: Option<i64>,
    repo_base_url_template: Option<String>,
    repo_clone_url_template: Option<String>,
    repo_browse_url_template: Option<String>,
    archive_git_path: Option<bool>,
    git_tag_format: Option<String>,
    git_path: Option<String>,
}

impl ModuleState {
    /// The identity triple, when every component is present.
    ///
    /// Returns an error if a present component is invalid (empty or
    /// containing the separator); returns `Ok(None)` when a component is
    /// still unknown, which only plan tolerates.
    fn identity_if_known(&self) -> Result<Option<ModuleId>, ProviderError> {
        match (&self.namespace, &self.name, &self.provider_name) {
            (Some(namespace), Some(name), Some(provider)) => {
                Ok(Some(ModuleId::new(namespace, name, provider)?))
            }
            _ => Ok(None),
        }
    }

    /// The identity to address the registry with: the triple when fully
    /// known, otherwise the tracked ID split into its three parts.
    fn working_identity(&self) -> Result<ModuleId, ProviderError> {
        match self.identity_if_known()? {
            Some(id) => Ok(id),
            None => Ok(ModuleId::parse(self.id.as_deref().unwrap_or_default())?),
        }
    }

    fn to_model(&self) -> ModuleModel {
        ModuleModel {
            git_provider_id: self.git_provider_id,
            repo_base_url_template: self.repo_base_url_template.clone(),
            repo_clone_url_template: self.repo_clone_url_template.clone(),
            repo_browse_url_template: self.repo_browse_url_template.clone(),
            git_tag_format: self.git_tag_format.clone().unwrap_or_default(),
            git_path: self.git_path.clone(),
            archive_git_path: self.archive_git_path,
        }
    }

    fn apply_remote(&mut self, remote: &ModuleModel) {
        self.git_provider_id = remote.git_provider_id;
        self.repo_base_url_template = remote.repo_base_url_template.clone();
        self.repo_clone_url_template = remote.repo_clone_url_template.clone();
        self.repo_browse_url_template = remote.repo_browse_url_template.clone();
        self.git_tag_format = Some(remote.git_tag_format.clone());
        self.git_path = remote.git_path.clone();
        if remote.archive_git_path.is_some() {
            self.archive_git_path = remote.archive_git_path;
        }
    }

    /// Resynchronize the tracked identity (components and ID) from `id`.
    fn bind(&mut self, id: &ModuleId) {
        self.namespace = Some(id.namespace.clone());
        self.name = Some(id.name.clone());
        self.provider_name = Some(id.provider.clone());
        self.id = Some(id.to_string());
    }
}

/// Schema for the module resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Module resource")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Full ID of the module"),
        )
        .with_attribute(
            "namespace",
            Attribute::required_string().with_description("Namespace of the module"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Module name"),
        )
        .with_attribute(
            "provider_name",
            Attribute::required_string().with_description("Module provider"),
        )
        .with_attribute(
            "git_provider_id",
            Attribute::optional_int64().with_description(
                "ID of the Git Repository Provider to use for the module. \
                 Set to null to use the custom URL templates instead.",
            ),
        )
        .with_attribute(
            "repo_base_url_template",
            Attribute::optional_string().with_description(
                "URL for browsing the base of the repository. May include templated \
                 values such as {namespace}, {module}, {provider}. Setting this field \
                 overrides the repository provider configuration.",
            ),
        )
        .with_attribute(
            "repo_clone_url_template",
            Attribute::optional_string().with_description(
                "URL for cloning the repository. May include templated values such as \
                 {namespace}, {module}, {provider}. Setting this field overrides the \
                 repository provider configuration.",
            ),
        )
        .with_attribute(
            "repo_browse_url_template",
            Attribute::optional_string().with_description(
                "URL for browsing the source code at a particular tag/path. Must \
                 include the {tag} and {path} template values. Setting this field \
                 overrides the repository provider configuration.",
            ),
        )
        .with_attribute(
            "archive_git_path",
            Attribute::optional_bool().with_description(
                "Whether generated archives only contain the contents of the module \
                 path, for modules provided from archives rather than git redirects.",
            ),
        )
        .with_attribute(
            "git_tag_format",
            Attribute::required_string().with_description(
                "Git tag format for module versions. Use the {version} placeholder, \
                 or {major}/{minor}/{patch} when tags do not carry a full semantic \
                 version.",
            ),
        )
        .with_attribute(
            "git_path",
            Attribute::optional_string().with_description(
                "Path within the repository that the module exists in. Defaults to \
                 the root of the repository.",
            ),
        )
}

/// Config-time validation of the identity components.
///
/// The separator would make the composite ID ambiguous, so it is rejected
/// client-side rather than passed through to the registry.
pub fn validate_identity(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for field in ["namespace", "name", "provider_name"] {
        if let Some(value) = config.get(field).and_then(Value::as_str) {
            if value.contains('/') {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid value for '{field}'"))
                        .with_detail("The '/' character is not allowed here; it is reserved as the module ID separator")
                        .with_attribute(field),
                );
            }
        }
    }
    diagnostics
}

/// Plan a module change.
///
/// When the identity triple is fully known the computed `id` is its
/// slash-join; while any component is still unknown the ID is left as-is.
pub fn plan(prior: Option<Value>, proposed: Value) -> Result<PlanResult, ProviderError> {
    if proposed.is_null() {
        // Destroy plan
        return Ok(PlanResult::no_change(Value::Null));
    }

    let mut state: ModuleState = serde_json::from_value(proposed)?;
    if let Some(id) = state.identity_if_known()? {
        state.id = Some(id.to_string());
    }

    let planned = serde_json::to_value(&state)?;
    let changes = attribute_changes(prior.as_ref(), &planned);
    Ok(PlanResult::with_changes(planned, changes))
}

/// Import a module by its composite ID.
pub fn import(id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
    let parsed = ModuleId::parse(id)?;
    let mut state = ModuleState::default();
    state.bind(&parsed);
    Ok(vec![ImportedResource::new(
        TYPE_NAME,
        serde_json::to_value(state)?,
    )])
}

/// Adapter performing module CRUD against the registry.
pub struct ModuleResource {
    client: Arc<TerraregClient>,
}

impl ModuleResource {
    /// Create the adapter with an injected client.
    pub fn new(client: Arc<TerraregClient>) -> Self {
        Self { client }
    }

    /// Create the module. The registry's create response is the source of
    /// truth for the resulting ID.
    pub async fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut state: ModuleState = serde_json::from_value(planned)?;
        let id = state.identity_if_known()?.ok_or_else(|| {
            ProviderError::Validation(
                "module namespace, name and provider_name must all be set".to_string(),
            )
        })?;

        let created_id = self.client.create_module(&id, &state.to_model()).await?;
        state.id = Some(created_id);
        Ok(serde_json::to_value(state)?)
    }

    /// Read the module; a missing module drops it from tracked state.
    ///
    /// After an import only the ID is known, so the identity is parsed from
    /// it. The tracked ID is always resynchronized from the identity the
    /// read was performed with.
    pub async fn read(&self, current: Value) -> Result<Value, ProviderError> {
        let mut state: ModuleState = serde_json::from_value(current)?;
        let id = state.working_identity()?;

        match self.client.get_module(&id).await {
            Ok(remote) => {
                state.apply_remote(&remote);
                state.bind(&id);
                Ok(serde_json::to_value(state)?)
            }
            Err(TerraregError::NotFound) => Ok(Value::Null),
            Err(err) => Err(err.into()),
        }
    }

    /// Update the module's settings.
    ///
    /// The request addresses the module by its pre-rename identity. Rename
    /// fields are sent only when the identity changed, and then always all
    /// three together; otherwise they are omitted and the tracked ID is kept.
    pub async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let prior_state: ModuleState = serde_json::from_value(prior)?;
        let mut state: ModuleState = serde_json::from_value(planned)?;

        let prior_id = prior_state.working_identity()?;
        let new_id = state.identity_if_known()?.ok_or_else(|| {
            ProviderError::Validation(
                "module namespace, name and provider_name must all be set".to_string(),
            )
        })?;

        let update = if new_id != prior_id {
            ModuleUpdateModel::renaming(state.to_model(), &new_id)
        } else {
            ModuleUpdateModel::in_place(state.to_model())
        };

        let renamed_id = self.client.update_module(&prior_id, &update).await?;
        state.id = Some(renamed_id.unwrap_or_else(|| prior_id.to_string()));
        Ok(serde_json::to_value(state)?)
    }

    /// Delete the module.
    pub async fn delete(&self, current: Value) -> Result<(), ProviderError> {
        let state: ModuleState = serde_json::from_value(current)?;
        let id = state.working_identity()?;
        self.client.delete_module(&id).await?;
        Ok(())
    }
}
