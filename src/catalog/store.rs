use crate::catalog::VersionOrdering;
use crate::catalog::schema::{DEMO_PACKAGES, SCHEMA};
use crate::error::Result;
use crate::models::{NewPackageVersion, PackageSummary, PackageVersion, VersionEntry};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

const RECORD_COLUMNS: &str =
    "name, version, description, author, homepage, repository, license, created_at, downloads";

/// Counts reported at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    pub packages: u64,
    pub versions: u64,
}

/// SQLite-backed table of package version records.
///
/// The (name, version) uniqueness rule lives in the schema, so every
/// mutation is a single statement and needs no read-then-write.
pub struct CatalogStore {
    conn: Connection,
    ordering: VersionOrdering,
    fresh: bool,
}

impl CatalogStore {
    /// Open (creating if needed) the catalog database at `path`
    pub fn open(path: &Path, ordering: VersionOrdering) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        Self::init(conn, ordering)
    }

    /// Open a private in-memory catalog
    pub fn open_in_memory(ordering: VersionOrdering) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, ordering)
    }

    fn init(conn: Connection, ordering: VersionOrdering) -> Result<Self> {
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'packages'",
            [],
            |row| row.get(0),
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            ordering,
            fresh: existing == 0,
        })
    }

    /// True if the packages table did not exist before this store was opened
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn ordering(&self) -> VersionOrdering {
        self.ordering
    }

    /// Insert the demo packages, ignoring any that already exist.
    /// Returns how many were inserted.
    pub fn seed_demo(&mut self) -> Result<usize> {
        let created_at = format_timestamp(Utc::now());
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO packages (name, version, description, author, homepage, repository, license, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for [name, version, description, author, homepage, repository, license] in
                DEMO_PACKAGES
            {
                inserted += stmt.execute(params![
                    name,
                    version,
                    description,
                    author,
                    homepage,
                    repository,
                    license,
                    created_at
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Insert a version record unless (name, version) is already present.
    /// Returns false, leaving the existing record untouched, for a duplicate.
    pub fn insert(&self, record: &NewPackageVersion) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO packages (name, version, description, author, homepage, repository, license, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.name,
                record.version,
                record.description,
                record.author,
                record.homepage,
                record.repository,
                record.license,
                format_timestamp(Utc::now())
            ],
        )?;
        Ok(changed == 1)
    }

    /// One summary per matching package, built from its latest version.
    ///
    /// A package matches when `query` is empty, or when the name or the
    /// description of any of its versions contains `query` (case-sensitive).
    /// Results are ordered by downloads descending, then name ascending.
    pub fn search(&self, query: &str) -> Result<Vec<PackageSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM packages \
             WHERE name IN ( \
                 SELECT name FROM packages \
                 WHERE ?1 = '' OR instr(name, ?1) > 0 OR instr(description, ?1) > 0 \
             )"
        ))?;
        let rows = stmt.query_map(params![query], record_from_row)?;

        let mut latest: BTreeMap<String, PackageVersion> = BTreeMap::new();
        for row in rows {
            let record = row?;
            match latest.entry(record.name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
                Entry::Occupied(mut entry) => {
                    if self
                        .ordering
                        .compare(&record.version, &entry.get().version)
                        .is_gt()
                    {
                        entry.insert(record);
                    }
                }
            }
        }

        let mut summaries: Vec<PackageSummary> =
            latest.into_values().map(PackageSummary::from).collect();
        summaries.sort_by(|a, b| {
            b.downloads
                .cmp(&a.downloads)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }

    /// Version history of a package, most recently published first.
    /// An unknown package yields an empty list.
    pub fn list_versions(&self, name: &str) -> Result<Vec<VersionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT version, created_at FROM packages \
             WHERE name = ?1 \
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![name], |row| {
            Ok(VersionEntry {
                version: row.get(0)?,
                created_at: timestamp_column(row, 1)?,
            })
        })?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?);
        }
        Ok(versions)
    }

    /// Bump the download counter of one version. Returns false if no such version exists.
    pub fn increment_download(&self, name: &str, version: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE packages SET downloads = downloads + 1 WHERE name = ?1 AND version = ?2",
            params![name, version],
        )?;
        Ok(changed == 1)
    }

    pub fn get(&self, name: &str, version: &str) -> Result<Option<PackageVersion>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM packages WHERE name = ?1 AND version = ?2"),
                params![name, version],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(DISTINCT name), COUNT(*) FROM packages",
            [],
            |row| {
                Ok(CatalogStats {
                    packages: row.get(0)?,
                    versions: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }
}

/// Fixed-width RFC 3339 so that text ordering in SQL matches time ordering
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<PackageVersion> {
    Ok(PackageVersion {
        name: row.get(0)?,
        version: row.get(1)?,
        description: row.get(2)?,
        author: row.get(3)?,
        homepage: row.get(4)?,
        repository: row.get(5)?,
        license: row.get(6)?,
        created_at: timestamp_column(row, 7)?,
        downloads: row.get(8)?,
    })
}
