use super::retry::HttpExecutor;
use crate::ports::outbound::PackageRegistry;
use crate::risk_analysis::domain::{PackageName, Packument, VersionManifest};
use crate::shared::security::validate_https_base_url;
use crate::shared::{RiskError, RiskResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const SERVICE: &str = "npm registry";

#[derive(Debug, Deserialize)]
struct RawPackument {
    name: String,
    #[serde(rename = "dist-tags", default)]
    dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    versions: BTreeMap<String, RawVersion>,
    #[serde(default)]
    time: BTreeMap<String, Value>,
    #[serde(default)]
    maintainers: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    #[serde(default)]
    license: Option<Value>,
    /// Legacy `licenses: [{type, url}]` form
    #[serde(default)]
    licenses: Option<Vec<Value>>,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, String>>,
    #[serde(default)]
    deprecated: Option<Value>,
}

impl RawVersion {
    /// Normalizes the three license shapes found in the wild:
    /// `"MIT"`, `{"type": "MIT"}` and `licenses: [{"type": "MIT"}, ...]`
    fn license(&self) -> Option<String> {
        fn from_value(value: &Value) -> Option<String> {
            match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(map) => map
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            }
        }

        if let Some(license) = self.license.as_ref().and_then(from_value) {
            return Some(license);
        }

        let legacy: Vec<String> = self
            .licenses
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(from_value)
            .collect();
        match legacy.len() {
            0 => None,
            1 => legacy.into_iter().next(),
            _ => Some(format!("({})", legacy.join(" OR "))),
        }
    }

    /// `deprecated` is a message string; `false` or empty means not deprecated
    fn deprecated(&self) -> Option<String> {
        match &self.deprecated {
            Some(Value::String(message)) if !message.is_empty() => Some(message.clone()),
            Some(Value::Bool(true)) => Some("deprecated".to_string()),
            _ => None,
        }
    }
}

impl RawPackument {
    fn into_domain(self) -> RiskResult<Packument> {
        let name = PackageName::new(self.name)?;

        let versions = self
            .versions
            .iter()
            .map(|(version, raw)| {
                (
                    version.clone(),
                    VersionManifest {
                        license: raw.license(),
                        dependencies: raw.dependencies.clone().unwrap_or_default(),
                        deprecated: raw.deprecated(),
                    },
                )
            })
            .collect();

        // `time` may also carry non-timestamp entries such as `unpublished`
        let time = self
            .time
            .iter()
            .filter_map(|(key, value)| {
                let raw = value.as_str()?;
                let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
                Some((key.clone(), parsed.with_timezone(&Utc)))
            })
            .collect();

        Ok(Packument {
            name,
            dist_tags: self.dist_tags,
            versions,
            time,
            maintainer_count: self.maintainers.len(),
        })
    }
}

/// NpmRegistryClient adapter for the npm registry JSON API
///
/// Fetches full packuments (`GET {base}/{name}`) through the retrying HTTP
/// executor. Scoped names are addressed as `@scope%2Fname`.
///
/// # Security
/// Package names are validated before being interpolated into URLs and the
/// base URL must use HTTPS.
pub struct NpmRegistryClient {
    http: HttpExecutor,
    base_url: String,
}

impl NpmRegistryClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://registry.npmjs.org";

    pub fn new(http: HttpExecutor, base_url: impl Into<String>) -> RiskResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        validate_https_base_url(&base_url, SERVICE)?;
        Ok(Self { http, base_url })
    }

    fn packument_url(&self, name: &PackageName) -> String {
        let encoded = match name.as_str().strip_prefix('@') {
            Some(scoped) => format!("@{}", urlencoding::encode(scoped)),
            None => urlencoding::encode(name.as_str()).into_owned(),
        };
        format!("{}/{}", self.base_url, encoded)
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistryClient {
    async fn fetch_packument(&self, name: &PackageName) -> RiskResult<Arc<Packument>> {
        let url = self.packument_url(name);
        debug!(package = %name, url = %url, "Fetching packument");

        let response = self
            .http
            .execute(SERVICE, |client| {
                client.get(&url).header("accept", "application/json")
            })
            .await
            .map_err(|e| match e {
                RiskError::Api { status: 404, .. } => RiskError::NotFound {
                    package: name.to_string(),
                },
                other => other,
            })?;

        let raw: RawPackument = response.json().await.map_err(|e| {
            RiskError::validation(format!(
                "Unexpected registry response for '{}': {}",
                name, e
            ))
        })?;

        if raw.versions.is_empty() {
            // Unpublished packages keep a document without versions
            return Err(RiskError::NotFound {
                package: name.to_string(),
            });
        }

        raw.into_domain().map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::network::retry::RetryPolicy;
    use crate::risk_analysis::domain::ExactVersion;
    use mockito::Server;
    use serde_json::json;
    use std::time::Duration;

    fn client(base_url: &str) -> NpmRegistryClient {
        let http = HttpExecutor::new(RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        NpmRegistryClient::new(http, base_url).unwrap()
    }

    fn lodash_document() -> Value {
        json!({
            "name": "lodash",
            "dist-tags": {"latest": "4.17.21"},
            "versions": {
                "4.17.20": {"license": "MIT"},
                "4.17.21": {
                    "license": {"type": "MIT"},
                    "dependencies": {"ms": "^2.1.1"}
                },
                "3.10.1": {
                    "licenses": [{"type": "MIT"}, {"type": "Apache-2.0"}],
                    "deprecated": "Please upgrade"
                }
            },
            "time": {
                "created": "2012-04-23T16:37:11.912Z",
                "modified": "2023-06-01T00:00:00.000Z",
                "4.17.21": "2021-02-20T15:42:16.891Z"
            },
            "maintainers": [{"name": "jdalton"}, {"name": "mathias"}]
        })
    }

    #[test]
    fn test_rejects_plain_http_base_url() {
        let http = HttpExecutor::new(RetryPolicy::default()).unwrap();
        assert!(NpmRegistryClient::new(http, "http://registry.example.com").is_err());
    }

    #[test]
    fn test_scoped_name_url_encoding() {
        let client = client("https://registry.npmjs.org/");
        let name = PackageName::new("@types/node").unwrap();
        assert_eq!(
            client.packument_url(&name),
            "https://registry.npmjs.org/@types%2Fnode"
        );
    }

    #[test]
    fn test_license_shapes() {
        let raw: RawPackument = serde_json::from_value(lodash_document()).unwrap();
        assert_eq!(raw.versions["4.17.20"].license().as_deref(), Some("MIT"));
        assert_eq!(raw.versions["4.17.21"].license().as_deref(), Some("MIT"));
        assert_eq!(
            raw.versions["3.10.1"].license().as_deref(),
            Some("(MIT OR Apache-2.0)")
        );
    }

    #[tokio::test]
    async fn test_fetch_packument_parses_document() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(lodash_document().to_string())
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url());
        let name = PackageName::new("lodash").unwrap();
        let packument = client.fetch_packument(&name).await.unwrap();

        mock.assert_async().await;
        assert_eq!(packument.latest(), Some("4.17.21"));
        assert_eq!(packument.versions.len(), 3);
        assert_eq!(packument.maintainer_count, 2);
        assert_eq!(
            packument.versions["3.10.1"].deprecated.as_deref(),
            Some("Please upgrade")
        );
        assert!(packument.time.contains_key("created"));
    }

    #[tokio::test]
    async fn test_default_methods_derive_from_packument() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_body(lodash_document().to_string())
            .create_async()
            .await;

        let client = client(&server.url());
        let name = PackageName::new("lodash").unwrap();

        let resolved = client.resolve_range(&name, "^4.17.0").await.unwrap();
        assert_eq!(resolved.as_str(), "4.17.21");

        let latest = client.fetch_metadata(&name, None).await.unwrap();
        assert_eq!(latest.version.as_str(), "4.17.21");
        assert_eq!(latest.dependencies["ms"], "^2.1.1");
        assert!(latest.published_at.is_some());

        let pinned = ExactVersion::new("4.17.20").unwrap();
        let old = client.fetch_metadata(&name, Some(&pinned)).await.unwrap();
        assert!(old.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_missing_package_is_not_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/does-not-exist")
            .with_status(404)
            .with_body(r#"{"error":"Not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url());
        let name = PackageName::new("does-not-exist").unwrap();
        let err = client.fetch_packument(&name).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_document_is_validation_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken")
            .with_status(200)
            .with_body(r#"{"versions": "nope"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let name = PackageName::new("broken").unwrap();
        let err = client.fetch_packument(&name).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unpublished_package_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/gone")
            .with_status(200)
            .with_body(r#"{"name": "gone", "time": {"unpublished": {"time": "2020-01-01T00:00:00Z"}}}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let name = PackageName::new("gone").unwrap();
        assert_eq!(client.fetch_packument(&name).await.unwrap_err().code(), "NOT_FOUND");
    }
}
