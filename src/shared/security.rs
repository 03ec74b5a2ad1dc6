use super::error::RiskError;
use super::result::RiskResult;

/// Maximum length of an npm package name (registry limit)
pub const MAX_PACKAGE_NAME_LENGTH: usize = 214;

/// Maximum length accepted for a version or range string
pub const MAX_VERSION_LENGTH: usize = 256;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

/// Validates an npm package name, including the scoped `@scope/name` form.
///
/// # Security
/// Names are interpolated into registry URLs, so path separators other than
/// the single scope separator, `..` sequences and URL-unsafe characters are
/// rejected before any request is made.
pub fn validate_package_name(name: &str) -> RiskResult<()> {
    if name.is_empty() {
        return Err(RiskError::validation("Package name cannot be empty"));
    }

    if name.len() > MAX_PACKAGE_NAME_LENGTH {
        return Err(RiskError::validation(format!(
            "Package name is too long ({} bytes). Maximum allowed: {} bytes",
            name.len(),
            MAX_PACKAGE_NAME_LENGTH
        )));
    }

    if name.contains("..") {
        return Err(RiskError::validation(format!(
            "Package name '{}' contains '..' which is not allowed",
            name
        )));
    }

    let bare = match name.strip_prefix('@') {
        Some(scoped) => {
            let (scope, rest) = scoped.split_once('/').ok_or_else(|| {
                RiskError::validation(format!(
                    "Scoped package name '{}' must have the form @scope/name",
                    name
                ))
            })?;
            if scope.is_empty() || !scope.chars().all(is_name_char) {
                return Err(RiskError::validation(format!(
                    "Package scope in '{}' contains invalid characters",
                    name
                )));
            }
            rest
        }
        None => name,
    };

    if bare.is_empty() || bare.starts_with('.') || bare.starts_with('_') {
        return Err(RiskError::validation(format!(
            "Package name '{}' must not be empty or start with '.' or '_'",
            name
        )));
    }

    if !bare.chars().all(is_name_char) {
        return Err(RiskError::validation(format!(
            "Package name '{}' contains invalid characters. Only alphanumeric, hyphens, underscores, dots and tildes are allowed.",
            name
        )));
    }

    Ok(())
}

/// Validates a version or range string before it is used in a request
pub fn validate_version_component(version: &str) -> RiskResult<()> {
    if version.trim().is_empty() {
        return Err(RiskError::validation("Version cannot be empty"));
    }

    if version.len() > MAX_VERSION_LENGTH {
        return Err(RiskError::validation(format!(
            "Version is too long ({} bytes). Maximum allowed: {} bytes",
            version.len(),
            MAX_VERSION_LENGTH
        )));
    }

    if version.contains('/') || version.contains('\\') || version.contains('#') || version.contains('?') {
        return Err(RiskError::validation(format!(
            "Version '{}' contains URL-unsafe characters",
            version
        )));
    }

    Ok(())
}

/// Hosts allowed to be reached over plain `http://`
const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

/// Rejects any base URL that is not HTTPS.
///
/// Plain `http://` is accepted only when the parsed host is exactly a
/// loopback host, so that local mock servers can stand in for the real
/// services.
pub fn validate_https_base_url(url: &str, service: &str) -> RiskResult<()> {
    let parsed = reqwest::Url::parse(url).map_err(|e| {
        RiskError::validation(format!(
            "Security: {} base URL '{}' is not a valid URL: {}",
            service, url, e
        ))
    })?;

    let allowed = match parsed.scheme() {
        "https" => parsed.host_str().is_some(),
        "http" => parsed
            .host_str()
            .is_some_and(|host| LOOPBACK_HOSTS.contains(&host)),
        _ => false,
    };
    if allowed {
        return Ok(());
    }

    Err(RiskError::validation(format!(
        "Security: {} base URL '{}' must use https",
        service, url
    )))
}
