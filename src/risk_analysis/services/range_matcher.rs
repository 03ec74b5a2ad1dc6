use crate::risk_analysis::domain::{ExactVersion, Packument};
use crate::shared::{RiskError, RiskResult};
use semver::{Version, VersionReq};
use tracing::debug;

/// Matches npm-style version ranges against published versions.
///
/// npm ranges are translated into `semver::VersionReq` alternatives:
/// - `a || b` becomes one requirement per alternative
/// - whitespace-separated comparator sets become comma-joined comparators
/// - `1.2.3 - 2.3.4` becomes `>=1.2.3, <=2.3.4`
/// - a bare full version means exactly that version (`=1.2.3`)
/// - `x`/`X` wildcards become `*`
pub struct RangeMatcher;

impl RangeMatcher {
    /// Parses an npm range into its alternatives. Returns `None` when no
    /// alternative can be understood (git URLs, file paths, aliases...).
    pub fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
        let alternatives: Vec<VersionReq> = range
            .split("||")
            .filter_map(|alternative| {
                let translated = Self::translate_comparator_set(alternative)?;
                VersionReq::parse(&translated).ok()
            })
            .collect();

        if alternatives.is_empty() {
            None
        } else {
            Some(alternatives)
        }
    }

    /// Highest version satisfying any alternative of `range`
    pub fn max_satisfying(versions: &[Version], range: &str) -> Option<Version> {
        let requirements = Self::parse_range(range)?;
        versions
            .iter()
            .filter(|v| requirements.iter().any(|req| req.matches(v)))
            .max()
            .cloned()
    }

    /// Resolves `range` against a packument.
    ///
    /// Dist-tag names resolve to the tagged version. Otherwise the highest
    /// satisfying published version wins; when none satisfies, the `latest`
    /// tag is used. Fails only if the packument has no usable `latest`.
    pub fn resolve(packument: &Packument, range: &str) -> RiskResult<ExactVersion> {
        let range = range.trim();

        if let Some(tagged) = packument.dist_tags.get(range) {
            return ExactVersion::new(tagged.clone());
        }

        if let Some(version) = Self::max_satisfying(&packument.published_versions(), range) {
            return ExactVersion::new(version.to_string());
        }

        debug!(
            package = %packument.name,
            range = range,
            "No published version satisfies range, falling back to latest"
        );

        let latest = packument.latest().ok_or_else(|| {
            RiskError::validation(format!(
                "No version of '{}' satisfies '{}' and no 'latest' dist-tag exists",
                packument.name, range
            ))
        })?;
        ExactVersion::new(latest.to_string())
    }

    fn translate_comparator_set(alternative: &str) -> Option<String> {
        let alternative = alternative.trim();
        if alternative.is_empty() || matches!(alternative, "*" | "x" | "X" | "latest") {
            return Some("*".to_string());
        }

        if let Some((low, high)) = alternative.split_once(" - ") {
            let low = Self::normalize_partial(low.trim())?;
            let high = Self::normalize_partial(high.trim())?;
            return Some(format!(">={}, <={}", low, high));
        }

        let mut comparators: Vec<String> = Vec::new();
        let mut pending_operator: Option<&str> = None;

        for token in alternative.split_whitespace() {
            if Self::is_operator(token) {
                pending_operator = Some(token);
                continue;
            }

            let token = match pending_operator.take() {
                Some(op) => format!("{}{}", op, token),
                None => token.to_string(),
            };
            comparators.push(Self::translate_comparator(&token)?);
        }

        if comparators.is_empty() {
            return None;
        }
        Some(comparators.join(", "))
    }

    fn translate_comparator(token: &str) -> Option<String> {
        let split_at = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
            .unwrap_or(token.len());
        let (operator, version) = token.split_at(split_at);
        let version = Self::normalize_partial(version)?;

        if version == "*" {
            return Some("*".to_string());
        }

        let operator = match operator {
            "" | "=" | "==" => {
                if version.contains('*') {
                    return Some(version);
                }
                "="
            }
            "~>" => "~",
            other => other,
        };

        Some(format!("{}{}", operator, version))
    }

    /// Strips a leading `v`, maps `x`/`X` parts to `*` and drops build metadata.
    fn normalize_partial(version: &str) -> Option<String> {
        let version = version.trim();
        let version = version.strip_prefix('v').unwrap_or(version);
        if version.is_empty() {
            return None;
        }

        let (core, pre) = match version.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (version, None),
        };
        let core = core.split('+').next().unwrap_or(core);

        let mut parts: Vec<String> = Vec::new();
        for part in core.split('.') {
            match part {
                "x" | "X" | "*" => {
                    parts.push("*".to_string());
                    break;
                }
                numeric if !numeric.is_empty() && numeric.chars().all(|c| c.is_ascii_digit()) => {
                    parts.push(numeric.to_string());
                }
                _ => return None,
            }
        }

        if parts.len() > 3 || parts.is_empty() {
            return None;
        }
        if parts == ["*"] {
            return Some("*".to_string());
        }

        let mut normalized = parts.join(".");
        if let Some(pre) = pre {
            if parts.len() != 3 || parts.iter().any(|p| p == "*") {
                return None;
            }
            normalized = format!("{}-{}", normalized, pre.split('+').next().unwrap_or(pre));
        }
        Some(normalized)
    }

    fn is_operator(token: &str) -> bool {
        matches!(token, "<" | ">" | "<=" | ">=" | "=" | "~" | "^" | "~>")
    }
}
