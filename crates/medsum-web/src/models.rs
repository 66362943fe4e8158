use axum::response::sse::Event;
use medsum_core::render::{entity_line, status_message};
use medsum_core::{Analysis, EntityAnnotation, Summary};
use serde::Serialize;

// ── Result JSON ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EntityJson {
    pub label: String,
    pub text: String,
    pub score: f32,
    /// Pre-rendered `- **label**: text (score: 0.00)` line.
    pub line: String,
}

impl From<&EntityAnnotation> for EntityJson {
    fn from(e: &EntityAnnotation) -> Self {
        EntityJson {
            label: e.label.clone(),
            text: e.text.clone(),
            score: e.score,
            line: entity_line(e),
        }
    }
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub disease_name: String,
    pub status: String,
    pub summary: Option<String>,
    pub entities: Vec<EntityJson>,
    pub warning: Option<String>,
}

impl AnalyzeResponse {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        AnalyzeResponse {
            disease_name: analysis.disease_name.clone(),
            status: status_message(&analysis.disease_name),
            summary: Some(analysis.summary.as_str().to_string()),
            entities: analysis.entities.iter().map(EntityJson::from).collect(),
            warning: None,
        }
    }

    /// Response for a document with no usable text.
    pub fn warning(disease_name: &str, message: String) -> Self {
        AnalyzeResponse {
            disease_name: disease_name.to_string(),
            status: status_message(disease_name),
            summary: None,
            entities: Vec::new(),
            warning: Some(message),
        }
    }
}

// ── SSE Event Structs ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusEvent {
    pub disease_name: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ExtractionCompleteEvent {
    pub text_chars: usize,
}

#[derive(Serialize)]
pub struct WarningEvent {
    pub message: String,
}

#[derive(Serialize)]
pub struct SummaryEvent {
    pub text: String,
    /// False when the input was too short and `text` is the placeholder.
    pub generated: bool,
}

impl From<&Summary> for SummaryEvent {
    fn from(s: &Summary) -> Self {
        SummaryEvent {
            text: s.as_str().to_string(),
            generated: !s.is_sentinel(),
        }
    }
}

#[derive(Serialize)]
pub struct EntitiesEvent {
    pub entities: Vec<EntityJson>,
}

#[derive(Serialize)]
pub struct CompleteEvent {
    pub result: AnalyzeResponse,
}

#[derive(Serialize)]
pub struct ErrorEvent {
    pub message: String,
}

// ── SSE Helper ──────────────────────────────────────────────────────────

pub fn sse_event<T: Serialize>(event_type: &str, data: &T) -> Event {
    Event::default()
        .event(event_type)
        .data(serde_json::to_string(data).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_rendered_entity_lines() {
        let analysis = Analysis {
            disease_name: "Malaria".into(),
            text_chars: 80,
            summary: Summary::Generated("Short summary.".into()),
            entities: vec![EntityAnnotation::new("Disease_disorder", "malaria", 0.876)],
        };
        let resp = AnalyzeResponse::from_analysis(&analysis);
        assert_eq!(resp.status, "Processing file for disease: Malaria");
        assert_eq!(resp.summary.as_deref(), Some("Short summary."));
        assert_eq!(
            resp.entities[0].line,
            "- **Disease_disorder**: malaria (score: 0.88)"
        );

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["entities"][0]["label"], "Disease_disorder");
        assert!(json["warning"].is_null());
    }

    #[test]
    fn sentinel_summary_is_not_generated() {
        let event = SummaryEvent::from(&Summary::NotEnoughText);
        assert_eq!(event.text, "Not enough text to summarize.");
        assert!(!event.generated);
    }
}
