//! Module accessors and composite module identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{decode_body, TerraregClient, TerraregError};

/// Separator used in the externally persisted module identifier.
pub const ID_SEPARATOR: char = '/';

/// The composite identity of a module: `namespace/name/provider`.
///
/// Components may not be empty and may not contain the `/` separator; both
/// would make the serialized identifier ambiguous to parse, so they are
/// rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleId {
    /// Namespace the module belongs to.
    pub namespace: String,
    /// Module name.
    pub name: String,
    /// Module provider (e.g. `aws`).
    pub provider: String,
}

impl ModuleId {
    /// Build a module ID from its components, validating each one.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<Self, TerraregError> {
        let id = Self {
            namespace: namespace.into(),
            name: name.into(),
            provider: provider.into(),
        };
        validate_component("namespace", &id.namespace)?;
        validate_component("name", &id.name)?;
        validate_component("provider", &id.provider)?;
        Ok(id)
    }

    /// Parse a serialized module ID.
    ///
    /// The identifier must split on `/` into exactly three non-empty parts;
    /// anything else is a fatal format error.
    pub fn parse(id: &str) -> Result<Self, TerraregError> {
        let parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
        let [namespace, name, provider] = parts[..] else {
            return Err(TerraregError::InvalidId(id.to_string()));
        };
        Self::new(namespace, name, provider).map_err(|_| TerraregError::InvalidId(id.to_string()))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.namespace,
            self.name,
            self.provider,
            sep = ID_SEPARATOR
        )
    }
}

fn validate_component(what: &str, value: &str) -> Result<(), TerraregError> {
    if value.is_empty() {
        return Err(TerraregError::Validation(format!(
            "module {what} must not be empty"
        )));
    }
    if value.contains(ID_SEPARATOR) {
        return Err(TerraregError::Validation(format!(
            "module {what} {value:?} must not contain {ID_SEPARATOR:?}"
        )));
    }
    Ok(())
}

/// Module attributes as sent to and returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleModel {
    /// Git provider to take repository URLs from. `None` means the custom
    /// URL templates below are used instead.
    pub git_provider_id: Option<i64>,
    /// Template for browsing the base of the repository.
    pub repo_base_url_template: Option<String>,
    /// Template for cloning the repository.
    pub repo_clone_url_template: Option<String>,
    /// Template for browsing the source at a particular tag/path.
    pub repo_browse_url_template: Option<String>,
    /// Git tag format, containing `{version}` or `{major}`/`{minor}`/`{patch}`.
    pub git_tag_format: String,
    /// Path of the module within the repository.
    pub git_path: Option<String>,
    /// Whether generated archives only contain the module path contents.
    /// Omitted from the payload when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_git_path: Option<bool>,
}

/// Payload for a module settings update.
///
/// The rename fields follow an all-or-nothing contract: either all three are
/// present (a full rename) or none is. When absent they are omitted from the
/// serialized payload entirely rather than sent as empty strings; the
/// registry treats the two differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleUpdateModel {
    /// The module attributes to apply.
    #[serde(flatten)]
    pub module: ModuleModel,
    /// New namespace, when renaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// New module name, when renaming. Serialized as `module`.
    #[serde(rename = "module", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New provider, when renaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ModuleUpdateModel {
    /// An update that keeps the module identity unchanged.
    pub fn in_place(module: ModuleModel) -> Self {
        Self {
            module,
            namespace: None,
            name: None,
            provider: None,
        }
    }

    /// An update that also renames the module to `target`.
    pub fn renaming(module: ModuleModel, target: &ModuleId) -> Self {
        Self {
            module,
            namespace: Some(target.namespace.clone()),
            name: Some(target.name.clone()),
            provider: Some(target.provider.clone()),
        }
    }

    /// Resolve the rename target, enforcing the all-or-nothing contract.
    fn rename_target(&self) -> Result<Option<ModuleId>, TerraregError> {
        match (&self.namespace, &self.name, &self.provider) {
            (None, None, None) => Ok(None),
            (Some(namespace), Some(name), Some(provider)) => {
                Ok(Some(ModuleId::new(namespace, name, provider)?))
            }
            _ => Err(TerraregError::Validation(
                "a module rename requires namespace, name and provider together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateModuleResponse {
    id: String,
}

impl TerraregClient {
    /// Create a module and return the identifier assigned by the registry.
    pub async fn create_module(
        &self,
        id: &ModuleId,
        config: &ModuleModel,
    ) -> Result<String, TerraregError> {
        let res = self
            .post(
                &format!(
                    "modules/{}/{}/{}/create",
                    id.namespace, id.name, id.provider
                ),
                config,
            )
            .await?;
        let created: CreateModuleResponse = decode_body(res, "module create response").await?;
        Ok(created.id)
    }

    /// Fetch a module's attributes.
    pub async fn get_module(&self, id: &ModuleId) -> Result<ModuleModel, TerraregError> {
        let res = self
            .get(&format!("modules/{}/{}/{}", id.namespace, id.name, id.provider))
            .await?;
        decode_body(res, "module").await
    }

    /// Update a module's settings.
    ///
    /// When the update renames the module, the new identifier is computed
    /// client-side from the rename fields and returned; the settings
    /// endpoint does not echo one. An update without a rename returns
    /// `None` and the tracked identifier stays as it was.
    pub async fn update_module(
        &self,
        id: &ModuleId,
        config: &ModuleUpdateModel,
    ) -> Result<Option<String>, TerraregError> {
        let endpoint = format!(
            "modules/{}/{}/{}/settings",
            id.namespace, id.name, id.provider
        );

        match config.rename_target()? {
            Some(target) => {
                self.post(&endpoint, config).await?;
                Ok(Some(target.to_string()))
            }
            None => {
                // Send the bare attribute payload so the rename keys are
                // omitted rather than present-but-empty.
                self.post(&endpoint, &config.module).await?;
                Ok(None)
            }
        }
    }

    /// Delete a module.
    pub async fn delete_module(&self, id: &ModuleId) -> Result<(), TerraregError> {
        // The delete endpoint rejects requests without a JSON body, so an
        // empty object is sent.
        self.delete_with_body(
            &format!("modules/{}/{}/{}/delete", id.namespace, id.name, id.provider),
            &serde_json::json!({}),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_module() -> ModuleModel {
        ModuleModel {
            git_provider_id: Some(1),
            repo_base_url_template: None,
            repo_clone_url_template: None,
            repo_browse_url_template: None,
            git_tag_format: "v{version}".to_string(),
            git_path: Some("modules/vpc".to_string()),
            archive_git_path: None,
        }
    }

    fn client(server: &MockServer) -> TerraregClient {
        TerraregClient::new(server.uri(), None).unwrap()
    }

    #[test]
    fn test_module_id_display_parse_round_trip() {
        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        assert_eq!(id.to_string(), "moduleteam/vpc/aws");
        assert_eq!(ModuleId::parse("moduleteam/vpc/aws").unwrap(), id);
    }

    #[test]
    fn test_module_id_parse_rejects_bad_formats() {
        for bad in ["", "justone", "two/parts", "a/b/c/d", "a//c", "/b/c", "a/b/"] {
            assert!(
                matches!(ModuleId::parse(bad), Err(TerraregError::InvalidId(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_module_id_components_may_not_contain_separator() {
        assert!(matches!(
            ModuleId::new("module/team", "vpc", "aws"),
            Err(TerraregError::Validation(_))
        ));
        assert!(matches!(
            ModuleId::new("moduleteam", "", "aws"),
            Err(TerraregError::Validation(_))
        ));
    }

    #[test]
    fn test_update_model_rename_target_all_or_nothing() {
        let in_place = ModuleUpdateModel::in_place(sample_module());
        assert_eq!(in_place.rename_target().unwrap(), None);

        let target = ModuleId::new("newns", "newname", "newprov").unwrap();
        let renaming = ModuleUpdateModel::renaming(sample_module(), &target);
        assert_eq!(renaming.rename_target().unwrap(), Some(target));

        let partial = ModuleUpdateModel {
            namespace: Some("newns".to_string()),
            ..ModuleUpdateModel::in_place(sample_module())
        };
        assert!(matches!(
            partial.rename_target(),
            Err(TerraregError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_module_returns_server_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/terrareg/modules/moduleteam/vpc/aws/create"))
            .and(body_json(json!({
                "git_provider_id": 1,
                "repo_base_url_template": null,
                "repo_clone_url_template": null,
                "repo_browse_url_template": null,
                "git_tag_format": "v{version}",
                "git_path": "modules/vpc"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "moduleteam/vpc/aws"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        let created = client(&server)
            .create_module(&id, &sample_module())
            .await
            .unwrap();
        assert_eq!(created, "moduleteam/vpc/aws");
    }

    #[tokio::test]
    async fn test_get_module() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/terrareg/modules/moduleteam/vpc/aws"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "git_provider_id": null,
                "repo_base_url_template": "https://github.com/{namespace}/{module}-{provider}",
                "repo_clone_url_template": "ssh://git@github.com/{namespace}/{module}-{provider}.git",
                "repo_browse_url_template": "https://github.com/{namespace}/{module}-{provider}/tree/{tag}/{path}",
                "git_tag_format": "v{version}",
                "git_path": null
            })))
            .mount(&server)
            .await;

        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        let module = client(&server).get_module(&id).await.unwrap();
        assert_eq!(module.git_provider_id, None);
        assert_eq!(module.git_tag_format, "v{version}");
        assert_eq!(
            module.repo_base_url_template.as_deref(),
            Some("https://github.com/{namespace}/{module}-{provider}")
        );
    }

    #[tokio::test]
    async fn test_update_without_rename_omits_rename_keys() {
        let server = MockServer::start().await;

        // body_json matches exactly: the payload must not contain the
        // namespace/module/provider keys at all.
        Mock::given(method("POST"))
            .and(path("/v1/terrareg/modules/moduleteam/vpc/aws/settings"))
            .and(body_json(json!({
                "git_provider_id": 1,
                "repo_base_url_template": null,
                "repo_clone_url_template": null,
                "repo_browse_url_template": null,
                "git_tag_format": "v{version}",
                "git_path": "modules/vpc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        let new_id = client(&server)
            .update_module(&id, &ModuleUpdateModel::in_place(sample_module()))
            .await
            .unwrap();
        assert_eq!(new_id, None);
    }

    #[tokio::test]
    async fn test_update_with_rename_sends_all_fields_and_computes_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/terrareg/modules/moduleteam/vpc/aws/settings"))
            .and(body_json(json!({
                "git_provider_id": 1,
                "repo_base_url_template": null,
                "repo_clone_url_template": null,
                "repo_browse_url_template": null,
                "git_tag_format": "v{version}",
                "git_path": "modules/vpc",
                "namespace": "platform",
                "module": "network",
                "provider": "aws"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        let target = ModuleId::new("platform", "network", "aws").unwrap();
        let new_id = client(&server)
            .update_module(&id, &ModuleUpdateModel::renaming(sample_module(), &target))
            .await
            .unwrap();
        assert_eq!(new_id.as_deref(), Some("platform/network/aws"));
    }

    #[tokio::test]
    async fn test_update_partial_rename_rejected_before_request() {
        let server = MockServer::start().await;
        // No mock mounted: a request would fail the test via the 404 guard.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        let partial = ModuleUpdateModel {
            provider: Some("aws".to_string()),
            ..ModuleUpdateModel::in_place(sample_module())
        };
        let err = client(&server)
            .update_module(&id, &partial)
            .await
            .unwrap_err();
        assert!(matches!(err, TerraregError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_module_sends_empty_object_body() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/terrareg/modules/moduleteam/vpc/aws/delete"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let id = ModuleId::new("moduleteam", "vpc", "aws").unwrap();
        client(&server).delete_module(&id).await.unwrap();
    }

    #[test]
    fn test_archive_git_path_omitted_when_unset() {
        let payload = serde_json::to_value(sample_module()).unwrap();
        assert!(payload.get("archive_git_path").is_none());

        let with_archive = ModuleModel {
            archive_git_path: Some(true),
            ..sample_module()
        };
        let payload = serde_json::to_value(with_archive).unwrap();
        assert_eq!(payload["archive_git_path"], json!(true));
    }
}
