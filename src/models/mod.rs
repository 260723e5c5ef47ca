pub mod package;

pub use package::{
    DownloadResult, NewPackageVersion, PackageSummary, PackageVersion, PublishResult, SearchQuery,
    SearchResult, VersionEntry, VersionsResult,
};
