//! Registry Service
//!
//! Turns logical registry requests into catalog operations and shapes the
//! response payloads. Validation happens here, before the catalog is touched.

use crate::catalog::CatalogHandle;
use crate::error::Result;
use crate::models::{
    DownloadResult, NewPackageVersion, PackageVersion, PublishResult, SearchResult,
    VersionsResult,
};
use chrono::Utc;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_AVAILABLE: &str = "available";

/// Conventional archive location for a package version
pub fn download_url(name: &str, version: &str) -> String {
    format!("/packages/{name}/{version}/archive")
}

#[derive(Clone)]
pub struct Registry {
    catalog: CatalogHandle,
}

impl Registry {
    pub fn new(catalog: CatalogHandle) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    /// Search package summaries; an empty query lists the whole catalog
    pub async fn search(&self, query: &str) -> Result<SearchResult> {
        let packages = self.catalog.search(query).await?;

        tracing::debug!(query, total = packages.len(), "Searched catalog");

        Ok(SearchResult {
            query: query.to_string(),
            total: packages.len(),
            packages,
        })
    }

    /// Publish a package version. Re-publishing an existing version is
    /// reported as success and leaves the stored record unchanged.
    pub async fn publish(&self, record: NewPackageVersion) -> Result<PublishResult> {
        let record = record.validate()?;
        let (name, version) = (record.name.clone(), record.version.clone());

        let inserted = self.catalog.insert(record).await?;

        let message = if inserted {
            tracing::info!(package = %name, version = %version, "Published package version");
            "Package uploaded successfully".to_string()
        } else {
            tracing::info!(
                package = %name,
                version = %version,
                "Package version already published, keeping existing record"
            );
            format!("Package {name} {version} is already published")
        };

        Ok(PublishResult {
            status: STATUS_SUCCESS.to_string(),
            message,
            timestamp: Utc::now(),
        })
    }

    pub async fn list_versions(&self, name: &str) -> Result<VersionsResult> {
        let versions = self.catalog.list_versions(name).await?;
        Ok(VersionsResult {
            package: name.to_string(),
            versions,
        })
    }

    /// Count a download and point the caller at the archive.
    /// Unknown versions still report "available"; whoever serves the
    /// archive URL decides whether it exists.
    pub async fn download(&self, name: &str, version: &str) -> Result<DownloadResult> {
        let found = self.catalog.increment_download(name, version).await?;
        if !found {
            tracing::debug!(
                package = %name,
                version = %version,
                "Download requested for unknown package version"
            );
        }

        Ok(DownloadResult {
            name: name.to_string(),
            version: version.to_string(),
            download_url: download_url(name, version),
            status: STATUS_AVAILABLE.to_string(),
        })
    }

    pub async fn metadata(&self, name: &str, version: &str) -> Result<Option<PackageVersion>> {
        self.catalog.get(name, version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogActor, CatalogStore, VersionOrdering};
    use crate::error::Error;

    fn registry() -> Registry {
        let store = CatalogStore::open_in_memory(VersionOrdering::Lexical).unwrap();
        let (actor, handle) = CatalogActor::new(store);
        actor.spawn().unwrap();
        Registry::new(handle)
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let registry = registry();

        let result = registry
            .publish(NewPackageVersion::new("pkg", "1.0.0"))
            .await
            .unwrap();
        assert_eq!(result.status, "success");

        let versions = registry.list_versions("pkg").await.unwrap();
        assert_eq!(versions.package, "pkg");
        assert_eq!(versions.versions.len(), 1);
        assert_eq!(versions.versions[0].version, "1.0.0");

        let download = registry.download("pkg", "1.0.0").await.unwrap();
        assert_eq!(download.status, "available");
        assert_eq!(download.download_url, "/packages/pkg/1.0.0/archive");
        let record = registry.metadata("pkg", "1.0.0").await.unwrap().unwrap();
        assert_eq!(record.downloads, 1);

        let download = registry.download("pkg", "unknown-version").await.unwrap();
        assert_eq!(download.status, "available");
        let record = registry.metadata("pkg", "1.0.0").await.unwrap().unwrap();
        assert_eq!(record.downloads, 1);
        assert!(
            registry
                .metadata("pkg", "unknown-version")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_publish_validation_fails_before_storage() {
        let registry = registry();

        let result = registry.publish(NewPackageVersion::new("", "1.0.0")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = registry.publish(NewPackageVersion::new("pkg", "  ")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let search = registry.search("").await.unwrap();
        assert_eq!(search.total, 0);
    }

    #[tokio::test]
    async fn test_duplicate_publish_reports_success() {
        let registry = registry();
        let first = NewPackageVersion::new("pkg", "1.0.0").with_description("first");
        let second = NewPackageVersion::new("pkg", "1.0.0").with_description("second");

        registry.publish(first).await.unwrap();
        let result = registry.publish(second).await.unwrap();
        assert_eq!(result.status, "success");
        assert!(result.message.contains("already published"));

        let record = registry.metadata("pkg", "1.0.0").await.unwrap().unwrap();
        assert_eq!(record.description, "first");
    }

    #[tokio::test]
    async fn test_search_total_matches_packages() {
        let registry = registry();
        registry
            .publish(NewPackageVersion::new("foo-lib", "1.0.0").with_description("bar baz"))
            .await
            .unwrap();
        registry
            .publish(NewPackageVersion::new("qux", "0.1.0"))
            .await
            .unwrap();

        let result = registry.search("bar").await.unwrap();
        assert_eq!(result.query, "bar");
        assert_eq!(result.total, 1);
        assert_eq!(result.packages[0].name, "foo-lib");

        let result = registry.search("").await.unwrap();
        assert_eq!(result.total, 2);
    }

    #[tokio::test]
    async fn test_shut_down_catalog_is_unavailable() {
        let registry = registry();
        registry.catalog().shutdown().await;

        // Queued behind the shutdown message, so its reply sender is dropped
        let result = registry.search("").await;
        assert!(matches!(result, Err(Error::CatalogUnavailable)));
    }
}
