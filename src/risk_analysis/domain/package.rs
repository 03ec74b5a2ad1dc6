use crate::shared::security::{validate_package_name, validate_version_component};
use crate::shared::{RiskError, RiskResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// NewType wrapper for an npm package name with validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> RiskResult<Self> {
        let name = name.into();
        validate_package_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageName {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::borrow::Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single concrete version, never a range.
///
/// Construction parses the string as a semantic version, so range syntax
/// such as `^`, `~`, `>=`, `*` or `||` can never end up inside one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExactVersion(String);

impl ExactVersion {
    pub fn new(version: impl Into<String>) -> RiskResult<Self> {
        let version = version.into();
        validate_version_component(&version)?;
        let trimmed = version.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parsed = semver::Version::parse(trimmed).map_err(|e| {
            RiskError::validation(format!("'{}' is not an exact version: {}", version, e))
        })?;
        Ok(Self(parsed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExactVersion {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExactVersion> for String {
    fn from(version: ExactVersion) -> Self {
        version.0
    }
}

impl std::fmt::Display for ExactVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-wide signals about how actively a package is maintained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStats {
    pub version_count: usize,
    pub maintainer_count: usize,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Validated metadata for one published version of a package.
///
/// Immutable once fetched; cached by `name@version` (or `name` for latest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub name: PackageName,
    pub version: ExactVersion,
    pub license: Option<String>,
    /// Direct dependencies: name -> range string
    pub dependencies: BTreeMap<String, String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deprecated: Option<String>,
    #[serde(default)]
    pub maintenance: Option<MaintenanceStats>,
}

impl PackageMetadata {
    /// Whole days elapsed since this version was published
    pub fn days_since_publish(&self, now: DateTime<Utc>) -> Option<i64> {
        self.published_at.map(|published| (now - published).num_days())
    }
}

/// Per-version manifest data extracted from a packument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub license: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub deprecated: Option<String>,
}

/// The full registry document for a package: every version, dist-tags and
/// publish times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packument {
    pub name: PackageName,
    pub dist_tags: BTreeMap<String, String>,
    pub versions: BTreeMap<String, VersionManifest>,
    #[serde(default)]
    pub time: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub maintainer_count: usize,
}

impl Packument {
    /// The version the `latest` dist-tag points at
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }

    /// All published versions that parse as semantic versions
    pub fn published_versions(&self) -> Vec<semver::Version> {
        self.versions
            .keys()
            .filter_map(|v| semver::Version::parse(v).ok())
            .collect()
    }

    pub fn maintenance_stats(&self) -> MaintenanceStats {
        MaintenanceStats {
            version_count: self.versions.len(),
            maintainer_count: self.maintainer_count,
            created_at: self.time.get("created").copied(),
            modified_at: self.time.get("modified").copied(),
        }
    }

    /// Builds validated metadata for `version`, or for `latest` when `None`
    pub fn metadata_for(&self, version: Option<&str>) -> RiskResult<PackageMetadata> {
        let requested = match version {
            Some(v) => v.to_string(),
            None => self.latest().map(str::to_string).ok_or_else(|| {
                RiskError::validation(format!("Package '{}' has no 'latest' dist-tag", self.name))
            })?,
        };

        let exact = ExactVersion::new(requested.clone())?;
        let manifest = self
            .versions
            .get(&requested)
            .or_else(|| self.versions.get(exact.as_str()))
            .ok_or_else(|| RiskError::NotFound {
                package: format!("{}@{}", self.name, requested),
            })?;

        Ok(PackageMetadata {
            name: self.name.clone(),
            published_at: self.time.get(exact.as_str()).copied(),
            version: exact,
            license: manifest.license.clone(),
            dependencies: manifest.dependencies.clone(),
            deprecated: manifest.deprecated.clone(),
            maintenance: Some(self.maintenance_stats()),
        })
    }
}
