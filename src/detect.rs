// Detection API client and the boundary adapter that turns its loosely
// shaped response into the one normalized view the UI renders.

use crate::config::ClientConfig;
use crate::models::{file_extension, SelectedFile};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde_json::Value;
use std::time::Duration;

pub const MAX_EVIDENCE_FRAMES: usize = 6;

const GENERIC_EXPLANATION: &str =
    "The detector processed the file successfully but did not provide additional explanation.";
const FRAMES_EXPLANATION: &str =
    "Highlighted frames show the areas the model found most indicative of manipulation.";

/// Which remote endpoint a file is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// mp4/mov/avi go to the video endpoint, everything else to audio.
    pub fn classify(file_name: &str) -> Self {
        match file_extension(file_name).as_deref() {
            Some("mp4") | Some("mov") | Some("avi") => MediaKind::Video,
            _ => MediaKind::Audio,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            MediaKind::Video => "/predict/video",
            MediaKind::Audio => "/predict/audio",
        }
    }
}

/// Remote detection service. Returns the raw response payload; callers
/// normalize it through [`Verdict::from_payload`] exactly once.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn analyze(&self, file: &SelectedFile) -> Result<Value>;
}

/// Detection client against the deployed backend: multipart POST with a
/// single `file` field, endpoint chosen by extension.
pub struct HttpDetector {
    client: Client,
    base_url: String,
}

impl HttpDetector {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn analyze(&self, file: &SelectedFile) -> Result<Value> {
        let endpoint = MediaKind::classify(&file.name).endpoint();
        let url = format!("{}{}", self.base_url, endpoint);

        let part = multipart::Part::bytes(file.raw_bytes.to_vec()).file_name(file.name.clone());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach the detection service")?;

        if !response.status().is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("error")?.as_str().map(str::to_string))
                .unwrap_or_else(|| "API error".to_string());
            return Err(anyhow!(message));
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse detection response")
    }
}

/// Numeric-or-numeric-string parsing. Strings are stripped of everything
/// outside `[0-9+-eE.]` before parsing, so "87%" reads as 87.
fn parse_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | 'e' | 'E' | '.'))
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

fn frames_of(payload: &Value) -> Vec<String> {
    payload
        .get("top_frames")
        .and_then(Value::as_array)
        .map(|frames| {
            frames
                .iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Accent the result view renders the verdict in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Affirmative,
    Warning,
}

/// The normalized detection result. Built once at the boundary; rendering
/// code never probes the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: String,
    pub confidence_percent: Option<i64>,
    pub explanation: String,
    pub frames: Vec<String>,
    pub accent: Accent,
}

impl Verdict {
    pub fn from_payload(payload: &Value) -> Self {
        let label = payload
            .get("label")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("UNKNOWN")
            .to_uppercase();

        let accent = if label == "REAL" {
            Accent::Affirmative
        } else {
            Accent::Warning
        };

        let mut frames = frames_of(payload);
        frames.truncate(MAX_EVIDENCE_FRAMES);

        Self {
            confidence_percent: derive_confidence(payload),
            explanation: derive_explanation(payload),
            label,
            frames,
            accent,
        }
    }

    pub fn confidence_text(&self) -> String {
        match self.confidence_percent {
            Some(percent) => format!("{percent}%"),
            None => "N/A".to_string(),
        }
    }

    pub fn confidence_heading(&self) -> &'static str {
        if self.confidence_percent.is_some() {
            "Confidence Level:"
        } else {
            "Confidence Not Available"
        }
    }
}

/// First usable value out of confidence > average_probability >
/// averageProbability > probability > score; anything ≤ 1 is treated as a
/// ratio and rescaled to a percentage.
fn derive_confidence(payload: &Value) -> Option<i64> {
    const SOURCES: [&str; 5] = [
        "confidence",
        "average_probability",
        "averageProbability",
        "probability",
        "score",
    ];
    SOURCES
        .iter()
        .filter_map(|key| payload.get(*key))
        .filter_map(parse_numeric)
        .map(|numeric| {
            let percent = if numeric <= 1.0 {
                numeric * 100.0
            } else {
                numeric
            };
            percent.round() as i64
        })
        .next()
}

fn derive_explanation(payload: &Value) -> String {
    if let Some(text) = payload.get("explanation").and_then(Value::as_str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if !frames_of(payload).is_empty() {
        return FRAMES_EXPLANATION.to_string();
    }
    let numeric = payload
        .get("average_probability")
        .and_then(parse_numeric)
        .or_else(|| payload.get("probability").and_then(parse_numeric));
    if let Some(numeric) = numeric {
        let percent = if numeric <= 1.0 {
            numeric * 100.0
        } else {
            numeric
        };
        return format!("Average model confidence: {percent:.1}%");
    }
    GENERIC_EXPLANATION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MediaKind::classify("clip.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::classify("Clip.MOV"), MediaKind::Video);
        assert_eq!(MediaKind::classify("old.avi"), MediaKind::Video);
        assert_eq!(MediaKind::classify("voice.wav"), MediaKind::Audio);
        assert_eq!(MediaKind::classify("mystery"), MediaKind::Audio);
    }

    #[test]
    fn ratio_confidence_rescales_to_percent() {
        let verdict = Verdict::from_payload(&json!({ "label": "FAKE", "confidence": 0.87 }));
        assert_eq!(verdict.confidence_percent, Some(87));
        assert_eq!(verdict.confidence_text(), "87%");
    }

    #[test]
    fn percent_confidence_passes_through() {
        let verdict = Verdict::from_payload(&json!({ "label": "FAKE", "confidence": 91.4 }));
        assert_eq!(verdict.confidence_percent, Some(91));
    }

    #[test]
    fn confidence_fields_are_tried_in_priority_order() {
        let verdict = Verdict::from_payload(&json!({
            "label": "FAKE",
            "score": 0.2,
            "average_probability": 0.6,
        }));
        assert_eq!(verdict.confidence_percent, Some(60));
    }

    #[test]
    fn numeric_string_confidence_is_cleaned() {
        let verdict = Verdict::from_payload(&json!({ "label": "FAKE", "confidence": "87%" }));
        assert_eq!(verdict.confidence_percent, Some(87));
    }

    #[test]
    fn missing_confidence_reads_not_available() {
        let verdict = Verdict::from_payload(&json!({ "label": "FAKE" }));
        assert_eq!(verdict.confidence_percent, None);
        assert_eq!(verdict.confidence_text(), "N/A");
        assert_eq!(verdict.confidence_heading(), "Confidence Not Available");
    }

    #[test]
    fn explanation_prefers_explicit_text() {
        let verdict = Verdict::from_payload(&json!({
            "label": "FAKE",
            "explanation": "  lip-sync drift detected  ",
            "top_frames": ["a"],
        }));
        assert_eq!(verdict.explanation, "lip-sync drift detected");
    }

    #[test]
    fn explanation_falls_back_through_frames_then_confidence() {
        let with_frames = Verdict::from_payload(&json!({ "label": "FAKE", "top_frames": ["a"] }));
        assert_eq!(with_frames.explanation, FRAMES_EXPLANATION);

        let with_probability =
            Verdict::from_payload(&json!({ "label": "FAKE", "probability": 0.876 }));
        assert_eq!(
            with_probability.explanation,
            "Average model confidence: 87.6%"
        );

        let bare = Verdict::from_payload(&json!({ "label": "FAKE" }));
        assert_eq!(bare.explanation, GENERIC_EXPLANATION);
    }

    #[test]
    fn frames_are_capped_at_six() {
        let frames: Vec<_> = (0..10).map(|i| format!("frame{i}")).collect();
        let verdict = Verdict::from_payload(&json!({ "label": "FAKE", "top_frames": frames }));
        assert_eq!(verdict.frames.len(), MAX_EVIDENCE_FRAMES);
        assert_eq!(verdict.frames[0], "frame0");
    }

    #[test]
    fn label_uppercased_and_accented() {
        let real = Verdict::from_payload(&json!({ "label": "real" }));
        assert_eq!(real.label, "REAL");
        assert_eq!(real.accent, Accent::Affirmative);

        let fake = Verdict::from_payload(&json!({ "label": "fake" }));
        assert_eq!(fake.accent, Accent::Warning);

        let unlabeled = Verdict::from_payload(&json!({}));
        assert_eq!(unlabeled.label, "UNKNOWN");
        assert_eq!(unlabeled.accent, Accent::Warning);
    }
}
