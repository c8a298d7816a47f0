//! Namespace accessors.

use serde::{Deserialize, Serialize};

use super::{decode_body, TerraregClient, TerraregError};

/// Namespace attributes as returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceModel {
    /// User-friendly display name, if one has been set.
    pub display_name: Option<String>,
    /// Whether new module versions in this namespace are verified
    /// automatically. Set by the registry, never by the client.
    #[serde(default)]
    pub is_auto_verified: bool,
    /// Whether the namespace is trusted. Set by the registry.
    #[serde(default)]
    pub trusted: bool,
}

/// Namespace attributes sent on create and update.
///
/// On update the `name` carried here is the rename target; the namespace
/// being addressed is identified by the URL path instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceConfigModel {
    /// Namespace name (the new name, when renaming).
    pub name: String,
    /// User-friendly display name.
    pub display_name: Option<String>,
}

impl TerraregClient {
    /// Create a namespace.
    pub async fn create_namespace(
        &self,
        config: &NamespaceConfigModel,
    ) -> Result<(), TerraregError> {
        self.post("namespaces", config).await?;
        Ok(())
    }

    /// Fetch a namespace by name.
    pub async fn get_namespace(&self, name: &str) -> Result<NamespaceModel, TerraregError> {
        let res = self.get(&format!("namespaces/{name}")).await?;
        decode_body(res, "namespace").await
    }

    /// Update a namespace.
    ///
    /// `name` addresses the namespace as it currently exists; a different
    /// name in `config` renames it.
    pub async fn update_namespace(
        &self,
        name: &str,
        config: &NamespaceConfigModel,
    ) -> Result<(), TerraregError> {
        self.post(&format!("namespaces/{name}"), config).await?;
        Ok(())
    }

    /// Delete a namespace by name.
    pub async fn delete_namespace(&self, name: &str) -> Result<(), TerraregError> {
        self.delete(&format!("namespaces/{name}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TerraregClient {
        TerraregClient::new(server.uri(), Some("unittest-api-key".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_create_namespace() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/terrareg/namespaces"))
            .and(body_json(json!({
                "name": "moduleteam",
                "display_name": "Module Team"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .create_namespace(&NamespaceConfigModel {
                name: "moduleteam".to_string(),
                display_name: Some("Module Team".to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_namespace() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/terrareg/namespaces/moduleteam"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "Module Team",
                "is_auto_verified": true,
                "trusted": false
            })))
            .mount(&server)
            .await;

        let namespace = client(&server)
            .get_namespace("moduleteam")
            .await
            .unwrap();
        assert_eq!(namespace.display_name.as_deref(), Some("Module Team"));
        assert!(namespace.is_auto_verified);
        assert!(!namespace.trusted);
    }

    #[tokio::test]
    async fn test_get_namespace_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/terrareg/namespaces/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_namespace("missing")
            .await
            .unwrap_err();
        assert!(matches!(err, TerraregError::NotFound));
    }

    #[tokio::test]
    async fn test_get_namespace_decode_error_is_distinct() {
        let server = MockServer::start().await;

        // 200 with an unexpected body shape must surface as a decode error,
        // not as a status or transport error.
        Mock::given(method("GET"))
            .and(path("/v1/terrareg/namespaces/moduleteam"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "Module Team",
                "unexpected_field": 42
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_namespace("moduleteam")
            .await
            .unwrap_err();
        assert!(matches!(err, TerraregError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_update_namespace_addresses_old_name() {
        let server = MockServer::start().await;

        // The path carries the pre-rename name, the body the new one.
        Mock::given(method("POST"))
            .and(path("/v1/terrareg/namespaces/oldname"))
            .and(body_json(json!({
                "name": "newname",
                "display_name": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_namespace(
                "oldname",
                &NamespaceConfigModel {
                    name: "newname".to_string(),
                    display_name: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_namespace() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/terrareg/namespaces/moduleteam"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete_namespace("moduleteam")
            .await
            .unwrap();
    }
}
