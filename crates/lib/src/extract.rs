//! Vehicle / ETA extraction from free-text responder messages.
//!
//! `extract` is total: every failure (transport, bad status, non-JSON reply, missing key) becomes
//! `ExtractionResult::unknown()`. Callers never see an error.

use crate::llm::{ChatMessage, CompletionBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Value used for any field that could not be determined.
pub const UNKNOWN: &str = "Unknown";

const EXTRACTION_PROMPT: &str = r#"You read status messages from search and rescue responders and extract two fields.

Reply with a single JSON object with exactly these keys and nothing else:
{"vehicle": "<vehicle>", "eta": "<eta>"}

- vehicle: the unit or vehicle the responder is taking, e.g. "SAR78", "SAR12". If they are driving their own personal vehicle, use "POV". If no vehicle is mentioned, use "Unknown".
- eta: the estimated time of arrival as written, either a duration (e.g. "15 minutes", "1 hour") or a clock time (e.g. "23:30"). If no ETA is mentioned, use "Unknown".

Examples:
"Taking SAR78, ETA 15 minutes" -> {"vehicle": "SAR78", "eta": "15 minutes"}
"in my POV, eta 23:30" -> {"vehicle": "POV", "eta": "23:30"}
"Responding with my personal vehicle" -> {"vehicle": "POV", "eta": "Unknown"}
"eta 15" -> {"vehicle": "Unknown", "eta": "15 minutes"}"#;

/// Structured fields extracted from one message. Both fields are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub vehicle: String,
    pub eta: String,
}

impl ExtractionResult {
    pub fn unknown() -> Self {
        Self {
            vehicle: UNKNOWN.to_string(),
            eta: UNKNOWN.to_string(),
        }
    }
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Why a reply could not be turned into an `ExtractionResult`.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply is not a JSON object")]
    NotAnObject,
    #[error("reply is missing key {0:?}")]
    MissingKey(&'static str),
    #[error("key {0:?} has an unusable value")]
    InvalidValue(&'static str),
}

/// Turns message text into vehicle / ETA. Implementations must not fail.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, text: &str) -> ExtractionResult;
}

/// Extractor backed by one completion call per message.
pub struct LlmExtractor {
    backend: Arc<dyn CompletionBackend>,
    model: String,
}

impl LlmExtractor {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, text: &str) -> ExtractionResult {
        let messages = vec![
            ChatMessage::system(EXTRACTION_PROMPT),
            ChatMessage::user(text),
        ];
        let reply = match self.backend.complete_json(&self.model, messages).await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("extraction: {} call failed, using defaults: {}", self.backend.name(), e);
                return ExtractionResult::unknown();
            }
        };
        match parse_extraction(&reply) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("extraction: unusable reply from {}, using defaults: {}", self.backend.name(), e);
                log::debug!("extraction: raw reply was {:?}", reply);
                ExtractionResult::unknown()
            }
        }
    }
}

/// Decode a model reply. Both keys must be present; extra keys are ignored.
/// Strings are taken as-is (whitespace included), numbers and booleans as their JSON text.
/// Empty strings and anything else are rejected.
pub fn parse_extraction(reply: &str) -> Result<ExtractionResult, ExtractionError> {
    let value: serde_json::Value = serde_json::from_str(reply.trim())?;
    let obj = value.as_object().ok_or(ExtractionError::NotAnObject)?;
    Ok(ExtractionResult {
        vehicle: field_text(obj, "vehicle")?,
        eta: field_text(obj, "eta")?,
    })
}

fn field_text(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &'static str,
) -> Result<String, ExtractionError> {
    let text = match obj.get(key) {
        None => return Err(ExtractionError::MissingKey(key)),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v @ serde_json::Value::Number(_)) | Some(v @ serde_json::Value::Bool(_)) => v.to_string(),
        Some(_) => return Err(ExtractionError::InvalidValue(key)),
    };
    if text.is_empty() {
        return Err(ExtractionError::InvalidValue(key));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::sync::Mutex;

    /// Backend that returns a canned reply (or error) and records what it was sent.
    struct CannedBackend {
        reply: Result<String, String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl CannedBackend {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete_json(&self, _model: &str, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(messages);
            self.reply.clone().map_err(LlmError::Api)
        }
    }

    fn result(vehicle: &str, eta: &str) -> ExtractionResult {
        ExtractionResult {
            vehicle: vehicle.to_string(),
            eta: eta.to_string(),
        }
    }

    #[tokio::test]
    async fn extracts_vehicle_and_eta() {
        let backend = CannedBackend::ok(r#"{"vehicle": "SAR78", "eta": "15 minutes"}"#);
        let extractor = LlmExtractor::new(backend.clone(), "gpt-4o-mini");
        let got = extractor.extract("Taking SAR78, ETA 15 minutes").await;
        assert_eq!(got, result("SAR78", "15 minutes"));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "exactly one call, no retry");
        assert_eq!(seen[0][0].role, "system");
        assert!(seen[0][0].content.contains("\"vehicle\""));
        assert!(seen[0][0].content.contains("POV"));
        assert_eq!(seen[0][1], ChatMessage::user("Taking SAR78, ETA 15 minutes"));
    }

    #[tokio::test]
    async fn extracts_pov_with_clock_time() {
        let extractor = LlmExtractor::new(CannedBackend::ok(r#"{"vehicle": "POV", "eta": "23:30"}"#), "m");
        let got = extractor.extract("Taking my personal vehicle, ETA 23:30").await;
        assert_eq!(got, result("POV", "23:30"));
    }

    #[tokio::test]
    async fn backend_error_gives_unknown() {
        let backend = CannedBackend::failing("API Error");
        let extractor = LlmExtractor::new(backend.clone(), "m");
        let got = extractor.extract("Taking SAR78, ETA 15 minutes").await;
        assert_eq!(got, result("Unknown", "Unknown"));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_json_reply_gives_unknown() {
        let extractor = LlmExtractor::new(CannedBackend::ok("SAR78, 15 minutes"), "m");
        assert_eq!(extractor.extract("anything").await, ExtractionResult::unknown());
    }

    #[tokio::test]
    async fn reply_missing_eta_gives_unknown() {
        let extractor = LlmExtractor::new(CannedBackend::ok(r#"{"vehicle": "SAR78"}"#), "m");
        assert_eq!(extractor.extract("Taking SAR78").await, ExtractionResult::unknown());
    }

    #[test]
    fn parse_ignores_extra_keys() {
        let got = parse_extraction(r#"{"vehicle": "SAR12", "eta": "1 hour", "confidence": 0.4}"#).unwrap();
        assert_eq!(got, result("SAR12", "1 hour"));
    }

    #[test]
    fn parse_accepts_numbers_and_bools_verbatim() {
        let got = parse_extraction(r#"{"vehicle": 78, "eta": 15}"#).unwrap();
        assert_eq!(got, result("78", "15"));
        let got = parse_extraction(r#"{"vehicle": true, "eta": "Unknown"}"#).unwrap();
        assert_eq!(got, result("true", "Unknown"));
    }

    #[test]
    fn parse_rejects_schema_mismatches() {
        assert!(matches!(
            parse_extraction(r#"{"eta": "15 minutes"}"#),
            Err(ExtractionError::MissingKey("vehicle"))
        ));
        assert!(matches!(
            parse_extraction(r#"{"vehicle": null, "eta": "15 minutes"}"#),
            Err(ExtractionError::InvalidValue("vehicle"))
        ));
        assert!(matches!(
            parse_extraction(r#"{"vehicle": "SAR78", "eta": {"minutes": 15}}"#),
            Err(ExtractionError::InvalidValue("eta"))
        ));
        assert!(matches!(
            parse_extraction(r#"{"vehicle": "", "eta": "15 minutes"}"#),
            Err(ExtractionError::InvalidValue("vehicle"))
        ));
        assert!(matches!(
            parse_extraction(r#"["SAR78", "15 minutes"]"#),
            Err(ExtractionError::NotAnObject)
        ));
        assert!(matches!(parse_extraction("not json"), Err(ExtractionError::Json(_))));
        assert!(matches!(parse_extraction(""), Err(ExtractionError::Json(_))));
    }

    #[test]
    fn parse_keeps_whitespace_only_strings() {
        let got = parse_extraction(r#"{"vehicle": "  ", "eta": " 15 minutes "}"#).unwrap();
        assert_eq!(got, result("  ", " 15 minutes "));
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        let got = parse_extraction("\n  {\"vehicle\": \"SAR78\", \"eta\": \"15 minutes\"}\n").unwrap();
        assert_eq!(got, result("SAR78", "15 minutes"));
    }

    #[test]
    fn default_is_unknown_pair() {
        assert_eq!(ExtractionResult::default(), result("Unknown", "Unknown"));
    }
}
