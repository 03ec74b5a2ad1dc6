use crate::risk_analysis::domain::Severity;
use std::collections::HashMap;

/// Normalizes advisory severity data onto the five-level scale.
///
/// Precedence: numeric score, then CVSS vector, then textual label.
/// An advisory carrying none of those is treated as `Medium`.
pub struct SeverityClassifier;

impl SeverityClassifier {
    pub fn from_score(score: f32) -> Severity {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Maps free-text labels such as `"MODERATE"` or `"high"`.
    /// Unrecognized labels map to `Unknown`.
    pub fn from_label(label: &str) -> Severity {
        match label.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" | "important" => Severity::High,
            "moderate" | "medium" => Severity::Medium,
            "low" | "minor" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    /// Classifies from whatever the advisory provides.
    ///
    /// `score_text` may be a bare number (`"7.5"`) or a CVSS v3 vector.
    pub fn classify(score_text: Option<&str>, label: Option<&str>) -> (Severity, Option<f32>) {
        if let Some(score) = score_text.and_then(Self::parse_score) {
            return (Self::from_score(score), Some(score));
        }
        match label {
            Some(label) => (Self::from_label(label), None),
            None => (Severity::Medium, None),
        }
    }

    /// Parses either a numeric score or a CVSS v3 base vector
    pub fn parse_score(text: &str) -> Option<f32> {
        let text = text.trim();
        if let Ok(score) = text.parse::<f32>() {
            return (0.0..=10.0).contains(&score).then_some(score);
        }
        if text.starts_with("CVSS:3") {
            return cvss_v3_base_score(text);
        }
        None
    }
}

/// Computes the CVSS v3.x base score from a vector string.
///
/// Example: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H" -> Some(9.8)
fn cvss_v3_base_score(vector: &str) -> Option<f32> {
    let metrics: HashMap<&str, &str> = vector
        .split('/')
        .skip(1)
        .filter_map(|part| part.split_once(':'))
        .collect();

    let scope_changed = match *metrics.get("S")? {
        "U" => false,
        "C" => true,
        _ => return None,
    };

    let av = match *metrics.get("AV")? {
        "N" => 0.85,
        "A" => 0.62,
        "L" => 0.55,
        "P" => 0.2,
        _ => return None,
    };
    let ac = match *metrics.get("AC")? {
        "L" => 0.77,
        "H" => 0.44,
        _ => return None,
    };
    let pr = match (*metrics.get("PR")?, scope_changed) {
        ("N", _) => 0.85,
        ("L", false) => 0.62,
        ("L", true) => 0.68,
        ("H", false) => 0.27,
        ("H", true) => 0.5,
        _ => return None,
    };
    let ui = match *metrics.get("UI")? {
        "N" => 0.85,
        "R" => 0.62,
        _ => return None,
    };

    let impact_weight = |key: &str| -> Option<f64> {
        match *metrics.get(key)? {
            "N" => Some(0.0),
            "L" => Some(0.22),
            "H" => Some(0.56),
            _ => None,
        }
    };
    let c = impact_weight("C")?;
    let i = impact_weight("I")?;
    let a = impact_weight("A")?;

    let iss = 1.0_f64 - ((1.0 - c) * (1.0 - i) * (1.0 - a));
    let impact = if scope_changed {
        7.52 * (iss - 0.029) - 3.25 * (iss - 0.02_f64).powi(15)
    } else {
        6.42 * iss
    };
    let exploitability = 8.22 * av * ac * pr * ui;

    let base = if impact <= 0.0 {
        0.0
    } else if scope_changed {
        f64::min(1.08 * (impact + exploitability), 10.0)
    } else {
        f64::min(impact + exploitability, 10.0)
    };

    Some(round_up(base) as f32)
}

/// CVSS "round up" to one decimal, tolerant of float noise
fn round_up(value: f64) -> f64 {
    let scaled = (value * 100_000.0).round() as i64;
    if scaled % 10_000 == 0 {
        scaled as f64 / 100_000.0
    } else {
        ((scaled / 10_000) + 1) as f64 / 10.0
    }
}
