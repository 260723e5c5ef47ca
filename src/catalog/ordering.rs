use serde::Deserialize;
use std::cmp::Ordering;

/// How versions of the same package are compared when picking the latest one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// Plain byte-wise string comparison, so "1.9.0" sorts above "1.10.0"
    #[default]
    Lexical,
    /// Semantic versioning precedence. Versions that don't parse as semver
    /// sort below every version that does.
    Semver,
}

impl VersionOrdering {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            VersionOrdering::Lexical => a.cmp(b),
            VersionOrdering::Semver => {
                match (semver::Version::parse(a), semver::Version::parse(b)) {
                    // Build metadata is ignored by semver precedence
                    (Ok(va), Ok(vb)) => va.cmp_precedence(&vb).then_with(|| a.cmp(b)),
                    (Ok(_), Err(_)) => Ordering::Greater,
                    (Err(_), Ok(_)) => Ordering::Less,
                    (Err(_), Err(_)) => a.cmp(b),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_matches_string_max() {
        let ordering = VersionOrdering::Lexical;
        assert_eq!(ordering.compare("1.1.0", "1.0.0"), Ordering::Greater);
        assert_eq!(ordering.compare("1.9.0", "1.10.0"), Ordering::Greater);
        assert_eq!(ordering.compare("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_semver_precedence() {
        let ordering = VersionOrdering::Semver;
        assert_eq!(ordering.compare("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(ordering.compare("1.0.0-rc.1", "1.0.0"), Ordering::Less);
        assert_eq!(ordering.compare("2.0.0", "10.0.0"), Ordering::Less);
    }

    #[test]
    fn test_semver_unparsable_sorts_low() {
        let ordering = VersionOrdering::Semver;
        assert_eq!(ordering.compare("20250115", "0.0.1"), Ordering::Less);
        assert_eq!(ordering.compare("0.0.1", "nightly"), Ordering::Greater);
        assert_eq!(ordering.compare("beta", "alpha"), Ordering::Greater);
    }

    #[test]
    fn test_semver_build_metadata_is_deterministic() {
        let ordering = VersionOrdering::Semver;
        assert_eq!(
            ordering.compare("1.0.0+build.2", "1.0.0+build.1"),
            Ordering::Greater
        );
    }
}
