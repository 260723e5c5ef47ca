pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    homepage TEXT NOT NULL DEFAULT '',
    repository TEXT NOT NULL DEFAULT '',
    license TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    downloads INTEGER NOT NULL DEFAULT 0 CHECK (downloads >= 0),
    UNIQUE(name, version)
);

CREATE INDEX IF NOT EXISTS idx_packages_name ON packages(name);
CREATE INDEX IF NOT EXISTS idx_packages_downloads ON packages(downloads DESC);
"#;

/// Packages inserted into a freshly created catalog when demo seeding is enabled.
/// Columns: name, version, description, author, homepage, repository, license.
pub const DEMO_PACKAGES: &[[&str; 7]] = &[
    [
        "libmath",
        "1.0.0",
        "Mathematical library for C",
        "Math Team",
        "https://github.com/mathteam/libmath",
        "",
        "MIT",
    ],
    [
        "libmath",
        "1.1.0",
        "Mathematical library for C (updated)",
        "Math Team",
        "https://github.com/mathteam/libmath",
        "",
        "MIT",
    ],
    [
        "libutils",
        "2.0.1",
        "Utility functions for C development",
        "Utils Team",
        "https://github.com/utilsteam/libutils",
        "",
        "Apache-2.0",
    ],
    [
        "libnetwork",
        "0.9.5",
        "Network programming utilities",
        "Network Group",
        "https://github.com/netgroup/libnetwork",
        "",
        "BSD-3-Clause",
    ],
];
