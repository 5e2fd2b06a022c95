//! Tag and catalog listing.

use serde::Deserialize;

use crate::clients::Paginator;
use crate::registry::client::validate_repository;
use crate::registry::{RegistryClient, RegistryError};

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    repositories: Option<Vec<String>>,
}

impl RegistryClient {
    /// Lists every tag of `repository`, following pagination links.
    ///
    /// A repository without tags (`"tags": null`) yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRepository`] for a malformed name, or
    /// the first error of any page. Pages fetched before the error are
    /// discarded.
    pub async fn tags(&self, repository: &str) -> Result<Vec<String>, RegistryError> {
        validate_repository(repository)?;
        let url = self.endpoint(&format!("/v2/{repository}/tags/list"));

        let pages: Vec<TagList> = Paginator::new(self.transport())
            .with_log(self.log_hook(), "registry.tags")
            .field("repository", repository)
            .fetch_all(&url)
            .await?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.tags.unwrap_or_default())
            .collect())
    }

    /// Lists every repository in the registry catalog.
    ///
    /// # Errors
    ///
    /// Returns the first error of any page.
    pub async fn repositories(&self) -> Result<Vec<String>, RegistryError> {
        let url = self.endpoint("/v2/_catalog");

        let pages: Vec<Catalog> = Paginator::new(self.transport())
            .with_log(self.log_hook(), "registry.repositories")
            .fetch_all(&url)
            .await?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.repositories.unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tags_decode_as_none() {
        let list: TagList = serde_json::from_str(r#"{"name":"app","tags":null}"#).unwrap();
        assert!(list.tags.is_none());

        let list: TagList = serde_json::from_str(r#"{"name":"app"}"#).unwrap();
        assert!(list.tags.is_none());
    }

    #[test]
    fn test_catalog_decodes() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"repositories":["a","b/c"]}"#).unwrap();
        assert_eq!(catalog.repositories.unwrap(), vec!["a", "b/c"]);
    }
}
