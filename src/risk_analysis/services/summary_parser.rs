use crate::risk_analysis::domain::AiSummary;
use crate::shared::{RiskError, RiskResult};

/// Parses and validates the accumulated AI response into an `AiSummary`.
///
/// The model may wrap its JSON in a markdown fence or add a sentence around
/// it, so extraction tries the whole text, then a fenced block, then the
/// first JSON object. Missing keys and out-of-set enum values are parse errors.
pub struct SummaryParser;

impl SummaryParser {
    pub fn parse(content: &str) -> RiskResult<AiSummary> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(RiskError::parse("AI response was empty"));
        }

        let candidates = [
            Some(trimmed.to_string()),
            Self::extract_fenced_block(trimmed),
            Self::extract_first_object(trimmed),
        ];

        let mut last_error: Option<serde_json::Error> = None;
        for candidate in candidates.into_iter().flatten() {
            match serde_json::from_str::<AiSummary>(&candidate) {
                Ok(summary) => return Self::validate(summary),
                Err(e) => last_error = Some(e),
            }
        }

        Err(RiskError::parse(match last_error {
            Some(e) => format!("AI response is not a valid summary object: {}", e),
            None => "AI response contained no JSON object".to_string(),
        }))
    }

    fn validate(summary: AiSummary) -> RiskResult<AiSummary> {
        if summary.summary.trim().is_empty() {
            return Err(RiskError::parse("AI summary text is empty"));
        }
        Ok(summary)
    }

    fn extract_fenced_block(content: &str) -> Option<String> {
        let fence = "```";
        let start = content.find(fence)?;
        let after_start = &content[start + fence.len()..];
        let line_end = after_start.find('\n')?;
        let rest = &after_start[line_end + 1..];
        let end = rest.find(fence)?;
        Some(rest[..end].trim().to_string())
    }

    fn extract_first_object(content: &str) -> Option<String> {
        let start = content.find('{')?;
        let candidate = &content[start..];
        let mut stream =
            serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
        match stream.next() {
            Some(Ok(_)) => Some(candidate[..stream.byte_offset()].to_string()),
            _ => None,
        }
    }
}
