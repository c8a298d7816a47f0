//! Git provider accessors.
//!
//! Git providers are a read-only lookup set; the registry only exposes a
//! listing endpoint, so single-item lookups are a client-side linear scan.

use serde::{Deserialize, Serialize};

use super::{decode_body, TerraregClient, TerraregError};

/// A git provider integration known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitProviderModel {
    /// Internal ID the registry assigns to this provider.
    pub id: i64,
    /// Display name, e.g. `Gitlab`.
    pub name: String,
}

/// Criteria for a single git provider lookup.
///
/// Exactly one of id or name must be supplied; constructing a selector from
/// both or neither fails before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitProviderSelector {
    /// Match on the registry-assigned ID.
    ById(i64),
    /// Match on the display name.
    ByName(String),
}

impl GitProviderSelector {
    /// Build a selector from optional id and name inputs.
    pub fn new(id: Option<i64>, name: Option<String>) -> Result<Self, TerraregError> {
        match (id, name) {
            (Some(_), Some(_)) => Err(TerraregError::Validation(
                "'id' and 'name' are mutually exclusive for git provider lookup".to_string(),
            )),
            (Some(id), None) => Ok(Self::ById(id)),
            (None, Some(name)) => Ok(Self::ByName(name)),
            (None, None) => Err(TerraregError::Validation(
                "either 'id' or 'name' must be provided for git provider lookup".to_string(),
            )),
        }
    }

    /// Whether `candidate` satisfies this selector.
    pub fn matches(&self, candidate: &GitProviderModel) -> bool {
        match self {
            Self::ById(id) => candidate.id == *id,
            Self::ByName(name) => candidate.name == *name,
        }
    }
}

impl TerraregClient {
    /// Fetch all git providers, in registry order.
    pub async fn get_git_providers(&self) -> Result<Vec<GitProviderModel>, TerraregError> {
        let res = self.get("git_providers").await?;
        decode_body(res, "git providers").await
    }

    /// Find the first git provider matching `selector`.
    pub async fn find_git_provider(
        &self,
        selector: &GitProviderSelector,
    ) -> Result<Option<GitProviderModel>, TerraregError> {
        let providers = self.get_git_providers().await?;
        Ok(providers.into_iter().find(|p| selector.matches(p)))
    }
}
