use crate::archive::path_component_problem;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single published version of a package, as stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackageVersion {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Short description
    pub description: String,
    /// Package author
    pub author: String,
    /// Project homepage URL
    pub homepage: String,
    /// Source repository URL
    pub repository: String,
    /// License identifier (e.g., MIT)
    pub license: String,
    /// When this version was published
    pub created_at: DateTime<Utc>,
    /// Number of downloads of this version
    pub downloads: u64,
}

/// Metadata supplied when publishing a package version
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewPackageVersion {
    /// Package name
    #[serde(default)]
    #[schema(example = "libmath")]
    pub name: String,
    /// Package version
    #[serde(default)]
    #[schema(example = "1.2.0")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub license: String,
}

impl NewPackageVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the identity fields and return the record with `name` and
    /// `version` trimmed. Both must be usable as a single URL path segment.
    pub fn validate(mut self) -> Result<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("package name must not be empty"));
        }
        if let Some(problem) = path_component_problem(name) {
            return Err(Error::validation(format!("package name {problem}")));
        }
        let version = self.version.trim();
        if version.is_empty() {
            return Err(Error::validation("package version must not be empty"));
        }
        if let Some(problem) = path_component_problem(version) {
            return Err(Error::validation(format!("package version {problem}")));
        }

        self.name = name.to_string();
        self.version = version.to_string();
        Ok(self)
    }
}

/// Search-result projection of a package's latest version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackageSummary {
    /// Package name
    pub name: String,
    /// Latest version of the package
    #[serde(rename = "version")]
    pub latest_version: String,
    pub description: String,
    pub author: String,
    pub homepage: String,
    /// Downloads of the latest version
    pub downloads: u64,
}

impl From<PackageVersion> for PackageSummary {
    fn from(record: PackageVersion) -> Self {
        Self {
            name: record.name,
            latest_version: record.version,
            description: record.description,
            author: record.author,
            homepage: record.homepage,
            downloads: record.downloads,
        }
    }
}

/// One entry of a package's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VersionEntry {
    pub version: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// The query as received (empty for a full listing)
    pub query: String,
    pub packages: Vec<PackageSummary>,
    /// Number of packages returned
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VersionsResult {
    /// Package name
    pub package: String,
    /// Versions, most recently published first
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadResult {
    pub name: String,
    pub version: String,
    /// Where the package archive can be fetched from
    #[schema(example = "/packages/libmath/1.1.0/archive")]
    pub download_url: String,
    #[schema(example = "available")]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishResult {
    #[schema(example = "success")]
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    /// Substring to look for in package names and descriptions
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_identity() {
        let record = NewPackageVersion::new("  libmath ", "\t1.0.0\n")
            .validate()
            .unwrap();
        assert_eq!(record.name, "libmath");
        assert_eq!(record.version, "1.0.0");
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let result = NewPackageVersion::new("   ", "1.0.0").validate();
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_validate_rejects_blank_version() {
        let result = NewPackageVersion::new("libmath", "").validate();
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_validate_rejects_reserved_characters() {
        for name in ["a/b?c", "pkg#1", "..", "a\\b", "100%"] {
            let result = NewPackageVersion::new(name, "1.0.0").validate();
            assert!(
                matches!(result, Err(Error::Validation { .. })),
                "accepted name {name:?}"
            );
        }
        let result = NewPackageVersion::new("pkg", "1.0/../2.0").validate();
        assert!(matches!(result, Err(Error::Validation { .. })));

        let record = NewPackageVersion::new("lib-math_2", "1.0.0-rc.1+build.5")
            .validate()
            .unwrap();
        assert_eq!(record.version, "1.0.0-rc.1+build.5");
    }

    #[test]
    fn test_publish_request_missing_identity_fails_validation() {
        let record: NewPackageVersion = serde_json::from_str(r#"{"version": "1.0.0"}"#).unwrap();
        assert_eq!(record.name, "");
        assert!(matches!(record.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_publish_request_optional_fields_default_empty() {
        let record: NewPackageVersion =
            serde_json::from_str(r#"{"name": "pkg", "version": "1.0.0"}"#).unwrap();
        assert_eq!(record.description, "");
        assert_eq!(record.license, "");
    }

    #[test]
    fn test_summary_serializes_latest_as_version() {
        let summary = PackageSummary {
            name: "libmath".to_string(),
            latest_version: "1.1.0".to_string(),
            description: String::new(),
            author: String::new(),
            homepage: String::new(),
            downloads: 3,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["version"], "1.1.0");
        assert!(json.get("latest_version").is_none());
    }
}
