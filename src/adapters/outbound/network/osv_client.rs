use super::retry::HttpExecutor;
use crate::adapters::outbound::cache::ResultCache;
use crate::ports::outbound::VulnerabilityRepository;
use crate::risk_analysis::domain::{
    ExactVersion, PackageName, ResolvedDependencySet, VulnerabilityRecord, VulnerabilityReport,
};
use crate::risk_analysis::services::SeverityClassifier;
use crate::shared::security::validate_https_base_url;
use crate::shared::{RiskError, RiskResult};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const SERVICE: &str = "OSV";
const ECOSYSTEM: &str = "npm";

/// Concurrent `GET /v1/vulns/{id}` requests while hydrating details
const DETAIL_CONCURRENCY: usize = 10;

/// Upper bound on follow-up `/v1/query` pages for a single package
const MAX_EXTRA_PAGES: usize = 20;

/// Options for the OSV client
#[derive(Debug, Clone)]
pub struct OsvOptions {
    pub base_url: String,
    /// Queries per `querybatch` request (1..=1000)
    pub batch_size: usize,
    /// Fetch full advisories for findings that lack severity data
    pub hydrate_details: bool,
}

impl Default for OsvOptions {
    fn default() -> Self {
        Self {
            base_url: OsvClient::DEFAULT_BASE_URL.to_string(),
            batch_size: OsvClient::MAX_BATCH_SIZE,
            hydrate_details: true,
        }
    }
}

/// OSV API client for fetching vulnerability data
///
/// Uses the OSV.dev batch query API. Each package query result is cached
/// under `osv:{name}@{version}` and only cache misses are sent upstream.
/// Batches are independent: a failed batch is logged and reported in
/// `VulnerabilityReport::failed_batches` while the others still contribute.
pub struct OsvClient {
    http: HttpExecutor,
    cache: ResultCache,
    base_url: String,
    batch_size: usize,
    hydrate_details: bool,
}

impl OsvClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.osv.dev";
    pub const MAX_BATCH_SIZE: usize = 1000;

    pub fn new(http: HttpExecutor, cache: ResultCache, options: OsvOptions) -> RiskResult<Self> {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        validate_https_base_url(&base_url, SERVICE)?;

        if options.batch_size == 0 || options.batch_size > Self::MAX_BATCH_SIZE {
            return Err(RiskError::validation(format!(
                "OSV batch size must be between 1 and {}, got {}",
                Self::MAX_BATCH_SIZE,
                options.batch_size
            )));
        }

        Ok(Self {
            http,
            cache,
            base_url,
            batch_size: options.batch_size,
            hydrate_details: options.hydrate_details,
        })
    }

    fn query_key(name: &PackageName, version: &ExactVersion) -> String {
        format!("osv:{}@{}", name, version)
    }

    /// Fetches vulnerabilities for a batch of packages
    async fn fetch_batch(&self, packages: &[(PackageName, ExactVersion)]) -> RiskResult<Vec<OsvResult>> {
        let batch_query = OsvBatchQuery {
            queries: packages
                .iter()
                .map(|(name, version)| OsvQuery {
                    package: OsvPackage {
                        name: name.to_string(),
                        ecosystem: ECOSYSTEM.to_string(),
                    },
                    version: version.to_string(),
                    page_token: None,
                })
                .collect(),
        };

        let url = format!("{}/v1/querybatch", self.base_url);
        let response = self
            .http
            .execute(SERVICE, |client| client.post(&url).json(&batch_query))
            .await?;

        let batch_response: OsvBatchResponse = response.json().await.map_err(|e| {
            RiskError::validation(format!("Unexpected OSV batch response: {}", e))
        })?;

        if batch_response.results.len() != packages.len() {
            return Err(RiskError::validation(format!(
                "OSV returned {} results for {} queries",
                batch_response.results.len(),
                packages.len()
            )));
        }

        Ok(batch_response.results)
    }

    /// Follows `next_page_token` for one package with single `/v1/query`
    /// calls, appending every further page to `vulns`.
    async fn fetch_remaining_pages(
        &self,
        name: &PackageName,
        version: &ExactVersion,
        first_token: String,
        vulns: &mut Vec<OsvVulnerability>,
    ) -> RiskResult<()> {
        let url = format!("{}/v1/query", self.base_url);
        let mut token = first_token;

        for page in 1..=MAX_EXTRA_PAGES {
            let query = OsvQuery {
                package: OsvPackage {
                    name: name.to_string(),
                    ecosystem: ECOSYSTEM.to_string(),
                },
                version: version.to_string(),
                page_token: Some(token),
            };
            let response = self
                .http
                .execute(SERVICE, |client| client.post(&url).json(&query))
                .await?;
            let result: OsvResult = response.json().await.map_err(|e| {
                RiskError::validation(format!("Unexpected OSV query response: {}", e))
            })?;

            debug!(package = %name, version = %version, page = page + 1, found = result.vulns.len(), "Fetched OSV page");
            vulns.extend(result.vulns);
            match result.next_page_token {
                Some(next) => token = next,
                None => return Ok(()),
            }
        }

        Err(RiskError::validation(format!(
            "OSV kept paginating past {} extra pages",
            MAX_EXTRA_PAGES
        )))
    }

    /// Fetches detailed vulnerability information by ID
    ///
    /// The batch API only returns ids, so severity and affected ranges have
    /// to be queried per advisory.
    async fn fetch_vulnerability_details(&self, vuln_id: &str) -> RiskResult<OsvVulnerability> {
        let key = format!("osv-vuln:{}", vuln_id);
        if let Some(cached) = self.cache.get_as::<OsvVulnerability>(&key) {
            return Ok(cached);
        }

        let url = format!("{}/v1/vulns/{}", self.base_url, urlencoding::encode(vuln_id));
        let response = self.http.execute(SERVICE, |client| client.get(&url)).await?;
        let vuln: OsvVulnerability = response.json().await.map_err(|e| {
            RiskError::validation(format!("Unexpected OSV advisory for {}: {}", vuln_id, e))
        })?;

        self.cache.set_as(key, &vuln);
        Ok(vuln)
    }

    /// Replaces a minimal batch finding with the full advisory when possible.
    /// Hydration failures keep the minimal record.
    async fn hydrate(&self, vuln: OsvVulnerability) -> OsvVulnerability {
        if !self.hydrate_details || vuln.has_severity_data() {
            return vuln;
        }

        match self.fetch_vulnerability_details(&vuln.id).await {
            Ok(detailed) => detailed,
            Err(e) => {
                warn!(advisory = %vuln.id, error = %e, "Failed to fetch advisory details");
                vuln
            }
        }
    }

    /// Converts one batch's results into records, grouped per query
    async fn convert_batch(
        &self,
        packages: &[(PackageName, ExactVersion)],
        results: Vec<OsvResult>,
    ) -> Vec<Vec<VulnerabilityRecord>> {
        let findings: Vec<(usize, OsvVulnerability)> = results
            .into_iter()
            .enumerate()
            .flat_map(|(index, result)| result.vulns.into_iter().map(move |v| (index, v)))
            .collect();

        let hydrated: Vec<(usize, OsvVulnerability)> = stream::iter(findings)
            .map(|(index, vuln)| async move { (index, self.hydrate(vuln).await) })
            .buffered(DETAIL_CONCURRENCY)
            .collect()
            .await;

        let mut per_package: Vec<Vec<VulnerabilityRecord>> = vec![Vec::new(); packages.len()];
        for (index, vuln) in hydrated {
            let (name, version) = &packages[index];
            per_package[index].push(convert_to_record(name, version, &vuln));
        }
        per_package
    }
}

#[async_trait]
impl VulnerabilityRepository for OsvClient {
    async fn find_vulnerabilities(
        &self,
        dependencies: &ResolvedDependencySet,
    ) -> RiskResult<VulnerabilityReport> {
        let mut records: Vec<VulnerabilityRecord> = Vec::new();
        let mut misses: Vec<(PackageName, ExactVersion)> = Vec::new();

        for (name, version) in dependencies.iter() {
            match self
                .cache
                .get_as::<Vec<VulnerabilityRecord>>(&Self::query_key(name, version))
            {
                Some(cached) => records.extend(cached),
                None => misses.push((name.clone(), version.clone())),
            }
        }

        debug!(
            total = dependencies.len(),
            cached = dependencies.len() - misses.len(),
            "Querying OSV"
        );

        let mut failed_batches = Vec::new();
        let batch_count = misses.len().div_ceil(self.batch_size);

        for (index, chunk) in misses.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            match self.fetch_batch(chunk).await {
                Ok(mut results) => {
                    // Packages whose later pages failed keep their first page
                    // but stay uncached so the next lookup retries them
                    let mut incomplete = vec![false; chunk.len()];
                    for (position, ((name, version), result)) in
                        chunk.iter().zip(results.iter_mut()).enumerate()
                    {
                        let Some(token) = result.next_page_token.take() else {
                            continue;
                        };
                        if let Err(e) = self
                            .fetch_remaining_pages(name, version, token, &mut result.vulns)
                            .await
                        {
                            warn!(package = %name, version = %version, error = %e, "OSV pagination failed");
                            failed_batches.push(format!(
                                "{}@{} (advisories after the first page): {}",
                                name, version, e
                            ));
                            incomplete[position] = true;
                        }
                    }

                    for (position, ((name, version), package_records)) in chunk
                        .iter()
                        .zip(self.convert_batch(chunk, results).await)
                        .enumerate()
                    {
                        if !incomplete[position] {
                            self.cache
                                .set_as(Self::query_key(name, version), &package_records);
                        }
                        records.extend(package_records);
                    }
                }
                Err(e) => {
                    let first = chunk
                        .first()
                        .map(|(name, version)| format!("{}@{}", name, version))
                        .unwrap_or_default();
                    warn!(
                        batch = batch_number,
                        batches = batch_count,
                        size = chunk.len(),
                        first = %first,
                        error = %e,
                        "OSV batch failed, continuing with remaining batches"
                    );
                    failed_batches.push(format!(
                        "batch {}/{} ({} packages starting at {}): {}",
                        batch_number,
                        batch_count,
                        chunk.len(),
                        first,
                        e
                    ));
                }
            }
        }

        info!(
            queried = dependencies.len(),
            findings = records.len(),
            failed_batches = failed_batches.len(),
            "Vulnerability lookup finished"
        );

        Ok(VulnerabilityReport {
            records,
            queried: dependencies.len(),
            failed_batches,
        })
    }
}

/// Converts a single OSV advisory to a domain record
fn convert_to_record(
    name: &PackageName,
    version: &ExactVersion,
    vuln: &OsvVulnerability,
) -> VulnerabilityRecord {
    // CVSS v3 first, then whatever score is present
    let score_text = vuln.severity.as_ref().and_then(|severities| {
        severities
            .iter()
            .find(|s| s.severity_type == "CVSS_V3")
            .or_else(|| severities.first())
            .map(|s| s.score.as_str())
    });
    let label = vuln
        .database_specific
        .as_ref()
        .and_then(|db| db.severity.as_ref())
        .and_then(|s| s.as_str());

    let (severity, score) = SeverityClassifier::classify(score_text, label);

    VulnerabilityRecord {
        id: vuln.id.clone(),
        package_name: name.to_string(),
        version: version.to_string(),
        severity,
        score,
        summary: vuln.summary.clone(),
        aliases: vuln.aliases.clone(),
        fixed_version: fixed_version_for(name, vuln),
    }
}

/// First `fixed` event among the affected entries for this package
fn fixed_version_for(name: &PackageName, vuln: &OsvVulnerability) -> Option<String> {
    vuln.affected.as_ref()?.iter().find_map(|affected| {
        let matches_package = affected
            .package
            .as_ref()
            .map(|p| p.name == name.as_str())
            .unwrap_or(true);
        if !matches_package {
            return None;
        }
        affected
            .ranges
            .as_ref()?
            .iter()
            .find_map(|r| r.events.iter().find_map(|e| e.fixed.clone()))
    })
}

// OSV API request/response structures

#[derive(Debug, Serialize)]
struct OsvBatchQuery {
    queries: Vec<OsvQuery>,
}

#[derive(Debug, Serialize)]
struct OsvQuery {
    package: OsvPackage,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct OsvPackage {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvBatchResponse {
    #[serde(default)]
    results: Vec<OsvResult>,
}

#[derive(Debug, Deserialize)]
struct OsvResult {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    severity: Option<Vec<OsvSeverity>>,
    #[serde(default)]
    database_specific: Option<DatabaseSpecific>,
    #[serde(default)]
    affected: Option<Vec<OsvAffected>>,
}

impl OsvVulnerability {
    fn has_severity_data(&self) -> bool {
        self.severity.as_ref().is_some_and(|s| !s.is_empty())
            || self
                .database_specific
                .as_ref()
                .is_some_and(|db| db.severity.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsvSeverity {
    #[serde(rename = "type")]
    severity_type: String,
    /// Numeric score or CVSS vector, e.g. "CVSS:3.1/AV:N/AC:L/..."
    score: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatabaseSpecific {
    /// "CRITICAL", "HIGH", "MODERATE", "LOW" for GitHub advisories
    #[serde(default)]
    severity: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsvAffected {
    #[serde(default)]
    package: Option<OsvAffectedPackage>,
    #[serde(default)]
    ranges: Option<Vec<OsvRange>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsvAffectedPackage {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsvRange {
    #[serde(default)]
    events: Vec<OsvEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OsvEvent {
    #[serde(default)]
    fixed: Option<String>,
}
